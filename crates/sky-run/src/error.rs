use sky_core::CoreError;
use sky_orient::OrientError;
use sky_source::SourceError;

/// Convenience alias for results in this crate.
pub type RunResult<T> = Result<T, RunError>;

/// Failures while assembling or driving a run.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    /// Core-type failure surfaced through run setup.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Orientation-track failure surfaced through run setup.
    #[error(transparent)]
    Orient(#[from] OrientError),

    /// Source failure during setup or sampling.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// Two sources were registered under the same name.
    // A field named `source` would be picked up by thiserror as the error
    // cause; these variants carry source *names*, hence `source_name`.
    #[error("run '{run}': duplicate source name '{source_name}'")]
    DuplicateSource {
        /// Run name.
        run: String,
        /// The duplicated source name.
        source_name: String,
    },

    /// A successor link names a source that does not exist.
    #[error("run '{run}': source '{source_name}' names unknown successor '{successor}'")]
    UnknownSuccessor {
        /// Run name.
        run: String,
        /// The source carrying the link.
        source_name: String,
        /// The missing successor name.
        successor: String,
    },

    /// Successor links form a cycle, which would cascade forever.
    #[error("run '{run}': successor links starting at '{source_name}' form a cycle")]
    SuccessorCycle {
        /// Run name.
        run: String,
        /// A source on the cycle.
        source_name: String,
    },

    /// A scheduling operation was requested before initialization.
    #[error("run '{0}': not initialized")]
    NotInitialized(String),

    /// Setup was attempted on an already initialized run.
    #[error("run '{0}': already initialized")]
    AlreadyInitialized(String),
}
