/// Convenience alias for results in this crate.
pub type OrientResult<T> = Result<T, OrientError>;

/// Setup-time failures while building an orientation track.
///
/// All of these abort run construction: a track with non-orthogonal axes or
/// unsorted samples would silently corrupt every transformed vertex.
#[derive(Debug, thiserror::Error)]
pub enum OrientError {
    /// The track had no samples at all.
    #[error("orientation track '{0}' has no samples")]
    Empty(String),

    /// Sample times were not strictly increasing.
    #[error("orientation track '{name}': time not strictly increasing at sample {index}")]
    NonMonotonicTime {
        /// Track name.
        name: String,
        /// Zero-based sample index.
        index: usize,
    },

    /// The two axis directions of a sample were not orthogonal within
    /// tolerance.
    #[error(
        "orientation track '{name}': axes not orthogonal at sample {index} (dot product {dot:e})"
    )]
    NonOrthogonalAxes {
        /// Track name.
        name: String,
        /// Zero-based sample index.
        index: usize,
        /// The offending dot product.
        dot: f64,
    },

    /// An axis direction was zero or not normalizable.
    #[error("orientation track '{name}': degenerate axis at sample {index}")]
    DegenerateAxis {
        /// Track name.
        name: String,
        /// Zero-based sample index.
        index: usize,
    },

    /// A line record could not be parsed.
    #[error("malformed orientation record in {file} line {line}: {reason}")]
    MalformedRecord {
        /// Path of the file being read.
        file: String,
        /// One-based line number.
        line: usize,
        /// What was wrong.
        reason: String,
    },

    /// A file mixed `OG` and `OL` record styles.
    #[error("orientation file {file} mixes OG and OL records (line {line})")]
    MixedRecordStyles {
        /// Path of the file being read.
        file: String,
        /// One-based line number of the first mismatching record.
        line: usize,
    },

    /// Underlying I/O failure.
    #[error("i/o error reading {file}: {source}")]
    Io {
        /// Path of the file being read.
        file: String,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
}
