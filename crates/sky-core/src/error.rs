/// Convenience alias for results in this crate.
pub type CoreResult<T> = Result<T, CoreError>;

/// Setup-time failures in core types.
///
/// Everything here is fatal: a malformed table or an unresolvable particle
/// means the run cannot produce meaningful statistics, so construction is
/// aborted rather than started partially.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A tabulated function had no usable rows.
    #[error("table '{0}' is empty")]
    EmptyTable(String),

    /// Table abscissa values were not strictly increasing.
    #[error("table '{name}' is not strictly increasing at row {row}")]
    NonMonotonicTable {
        /// Name of the offending table.
        name: String,
        /// Zero-based row at which monotonicity broke.
        row: usize,
    },

    /// A table ordinate or light-curve bin was negative.
    #[error("table '{name}' has a negative value at row {row}")]
    NegativeValue {
        /// Name of the offending table.
        name: String,
        /// Zero-based row holding the negative value.
        row: usize,
    },

    /// A table integrated to zero, so nothing can be sampled from it.
    #[error("table '{0}' integrates to zero")]
    ZeroIntegral(String),

    /// A line record could not be parsed.
    #[error("malformed record in {file} line {line}: {reason}")]
    MalformedRecord {
        /// Path or label of the file being read.
        file: String,
        /// One-based line number.
        line: usize,
        /// What was wrong with the record.
        reason: String,
    },

    /// A particle specification named something the physics collaborator
    /// does not know.
    #[error("unknown particle '{0}'")]
    UnknownParticle(String),

    /// A named geometry volume does not exist.
    #[error("unknown volume '{0}'")]
    UnknownVolume(String),

    /// Underlying I/O failure while reading a setup file.
    #[error("i/o error reading {file}: {source}")]
    Io {
        /// Path of the file being read.
        file: String,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
}
