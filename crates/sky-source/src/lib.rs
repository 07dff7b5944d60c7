//! Stochastic particle emitters for Skylark.
//!
//! A [`Source`] models one emitter: a spectral family for energy, a beam
//! family for start position and direction, a polarization model, and a
//! timing process (constant flux, light curve, isotope count, or a
//! predetermined event list). The run scheduler in `sky-run` asks each
//! source for its next emission time and, when its turn comes, for a full
//! primary particle.

/// Beam families: far-field and near-field start geometry.
pub mod beam;
/// Error types for the source crate.
pub mod error;
/// Time-ordered queues of predetermined emissions.
pub mod event_list;
/// Polarization models.
pub mod polarization;
/// The source model and next-emission sampling.
pub mod source;
/// Spectral families: energy sampling.
pub mod spectral;
/// The joint energy-beam-flux table.
pub mod table3;

/// Re-exports of [`beam::BeamModel`], [`beam::BeamSample`],
/// [`beam::ConeProfile`] and [`beam::ProfileMap`].
pub use beam::{BeamModel, BeamSample, ConeProfile, ProfileMap};
/// Re-exports of [`error::SourceError`] and [`error::SourceResult`].
pub use error::{SourceError, SourceResult};
/// Re-exports of [`event_list::EventList`] and [`event_list::EventListEntry`].
pub use event_list::{EventList, EventListEntry};
/// Re-export of [`polarization::Polarization`].
pub use polarization::Polarization;
/// Re-exports of the source model types.
pub use source::{Primary, SamplingLimits, Source, SourceId, SuccessorLink, TimingModel};
/// Re-export of [`spectral::SpectralModel`].
pub use spectral::SpectralModel;
/// Re-export of [`table3::EnergyBeamTable`].
pub use table3::EnergyBeamTable;
