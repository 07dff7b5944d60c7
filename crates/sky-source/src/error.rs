use sky_core::CoreError;

/// Convenience alias for results in this crate.
pub type SourceResult<T> = Result<T, SourceError>;

/// Failures while configuring or sampling a source.
///
/// Setup failures are fatal and abort run construction. Run-time "no data"
/// situations (empty event list, pending skip) are deliberately not errors;
/// they are reported as `Ok(None)` by the sampling entry points.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Core-type failure (malformed table, unknown particle, ...).
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A source that must have a positive flux did not.
    #[error("source '{0}': flux must be positive after normalization")]
    NonPositiveFlux(String),

    /// Energy bounds were empty or inverted.
    #[error("source '{name}': invalid energy range [{min}, {max}] keV")]
    InvalidEnergyRange {
        /// Source name.
        name: String,
        /// Configured minimum in keV.
        min: f64,
        /// Configured maximum in keV.
        max: f64,
    },

    /// A geometric parameter was degenerate (zero extent, zero axis, ...).
    #[error("source '{name}': degenerate beam geometry: {reason}")]
    DegenerateBeam {
        /// Source name.
        name: String,
        /// What was degenerate.
        reason: String,
    },

    /// A restricted point source sits inside the start sphere, so no cone
    /// upgrade exists.
    #[error(
        "source '{name}': restricted point at distance {distance} is inside the start sphere (radius {radius})"
    )]
    RestrictedPointInsideStartArea {
        /// Source name.
        name: String,
        /// Distance of the point from the sphere center.
        distance: f64,
        /// Start sphere radius.
        radius: f64,
    },

    /// The source's particle kind was used before run initialization
    /// resolved it.
    #[error("source '{0}': particle kind not resolved yet")]
    UnresolvedParticle(String),

    /// An isotope-count source was configured for a particle without a
    /// half-life.
    #[error("source '{name}': no half-life known for {kind}")]
    NoHalfLife {
        /// Source name.
        name: String,
        /// The kind lacking a half-life.
        kind: String,
    },

    /// A bounded rejection loop gave up. Indicates a pathological
    /// configuration (e.g. a spectrum that is almost everywhere zero).
    #[error("source '{name}': rejection sampling of {what} exhausted after {attempts} attempts")]
    SamplingExhausted {
        /// Source name.
        name: String,
        /// What was being sampled.
        what: String,
        /// How many attempts were made.
        attempts: usize,
    },

    /// An event-list file was not sorted by time.
    #[error("event list {file}: entries not time-sorted at line {line}")]
    UnsortedEventList {
        /// Path of the file.
        file: String,
        /// One-based line number.
        line: usize,
    },
}
