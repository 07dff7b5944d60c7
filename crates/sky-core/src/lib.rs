//! Core types for the Skylark event-generation toolkit.
//!
//! Skylark is the event-generation core of a gamma-ray-telescope Monte Carlo
//! simulation: it schedules which of many configured particle emitters fires
//! next and synthesizes each primary particle's kinematics. This crate holds
//! the leaf types shared by the other `sky-*` crates: simulation time,
//! particle kinds, tabulated functions, and the traits through which the
//! external physics and geometry collaborators are consumed.

/// Error types shared across the workspace.
pub mod error;
/// Small vector-math helpers on top of glam.
pub mod math;
/// Particle kinds and the deferred particle specification.
pub mod particle;
/// Traits for the external physics and geometry collaborators.
pub mod provider;
/// Tabulated 1-D functions: spectra, zenith profiles, and light curves.
pub mod table;
/// Continuous simulation time.
pub mod time;

/// Re-exports of [`error::CoreError`] and [`error::CoreResult`].
pub use error::{CoreError, CoreResult};
/// Re-export of [`particle::ParticleKind`].
pub use particle::ParticleKind;
/// Re-export of [`particle::ParticleSpec`].
pub use particle::ParticleSpec;
/// Re-exports of [`provider::GeometryProvider`], [`provider::PhysicsProvider`], and [`provider::StartArea`].
pub use provider::{GeometryProvider, PhysicsProvider, StartArea};
/// Re-exports of [`table::LightCurve`] and [`table::Table1D`].
pub use table::{LightCurve, Table1D};
/// Re-export of [`time::SimTime`].
pub use time::SimTime;
