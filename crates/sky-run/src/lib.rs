//! The Skylark run scheduler.
//!
//! A [`Run`] owns a catalog of sources, a pair of orientation tracks
//! (sky and detector), and a time-ordered schedule keyed by
//! `(next emission, id)`. The caller drives the run one cycle at a time
//! with [`Run::generate_primaries`], handing generated primaries to a
//! [`ParticleSink`]; delayed decays observed during transport come back in
//! through [`Run::register_delayed_decay`].

/// The source catalog with dense id assignment.
pub mod catalog;
/// Run configuration knobs.
pub mod config;
/// Error types for the run crate.
pub mod error;
/// The run scheduler itself.
pub mod run;
/// The primary consumer trait.
pub mod sink;
/// Run counters.
pub mod stats;

/// Re-export of [`catalog::SourceCatalog`].
pub use catalog::SourceCatalog;
/// Re-export of [`config::RunConfig`].
pub use config::RunConfig;
/// Re-exports of [`error::RunError`] and [`error::RunResult`].
pub use error::{RunError, RunResult};
/// Re-exports of [`run::Run`], [`run::CycleOutcome`] and [`run::StopCondition`].
pub use run::{CycleOutcome, Run, StopCondition};
/// Re-exports of [`sink::ParticleSink`] and [`sink::RecordingSink`].
pub use sink::{ParticleSink, RecordingSink};
/// Re-export of [`stats::RunStatistics`].
pub use stats::RunStatistics;
