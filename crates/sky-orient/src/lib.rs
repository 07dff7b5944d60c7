//! Time-indexed attitude tracks for Skylark.
//!
//! An [`OrientationTrack`] maps simulated time to the attitude (and, for
//! local-frame tracks, position) of either the sky pointing or the detector.
//! Tracks are built once at setup, either as a single fixed pointing or from
//! an ordered sample file, and are queried every scheduling cycle to
//! transform start vertices between frames.

/// Error types for the orientation crate.
pub mod error;
/// Parsing of `OG`/`OL` orientation line records.
pub mod parse;
/// The attitude track and its transforms.
pub mod track;

/// Re-exports of [`error::OrientError`] and [`error::OrientResult`].
pub use error::{OrientError, OrientResult};
/// Re-export of [`parse::track_from_file`].
pub use parse::track_from_file;
/// Re-exports of [`track::CoordinateSystem`], [`track::OrientationSample`], and [`track::OrientationTrack`].
pub use track::{CoordinateSystem, OrientationSample, OrientationTrack};
