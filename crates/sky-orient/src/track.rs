use glam::{DMat3, DVec3};
use sky_core::SimTime;

use crate::error::{OrientError, OrientResult};

/// Allowed deviation from exact axis orthogonality.
pub const ORTHOGONALITY_TOLERANCE: f64 = 1e-6;

/// Which frame an orientation track describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinateSystem {
    /// Detector-local frame; samples carry a translation.
    Local,
    /// Galactic sky frame; rotation only.
    Galactic,
}

/// One attitude sample: a rotation (from two orthogonal axis directions)
/// plus an optional translation, valid from `time` until the next sample.
#[derive(Debug, Clone, Copy)]
pub struct OrientationSample {
    /// Time from which this sample is valid.
    pub time: SimTime,
    /// Rotation into the track's frame.
    pub rotation: DMat3,
    /// Exact matrix inverse of `rotation`, precomputed so that round trips
    /// are bit-faithful to the matrix inverse rather than to a transpose.
    pub inverse: DMat3,
    /// Translation applied after rotation (zero for galactic tracks).
    pub translation: DVec3,
}

impl OrientationSample {
    /// Build a sample from its two defining axis directions.
    ///
    /// `x_axis` and `z_axis` must be non-zero and orthogonal within
    /// [`ORTHOGONALITY_TOLERANCE`]; the y axis is their cross product.
    pub fn from_axes(
        name: &str,
        index: usize,
        time: SimTime,
        x_axis: DVec3,
        z_axis: DVec3,
        translation: DVec3,
    ) -> OrientResult<Self> {
        let degenerate = || OrientError::DegenerateAxis {
            name: name.to_string(),
            index,
        };
        if x_axis.length_squared() < f64::EPSILON || z_axis.length_squared() < f64::EPSILON {
            return Err(degenerate());
        }
        let x = x_axis.normalize();
        let z = z_axis.normalize();
        let dot = x.dot(z);
        if dot.abs() > ORTHOGONALITY_TOLERANCE {
            return Err(OrientError::NonOrthogonalAxes {
                name: name.to_string(),
                index,
                dot,
            });
        }
        let y = z.cross(x);
        let rotation = DMat3::from_cols(x, y, z);
        if rotation.determinant().abs() < f64::EPSILON {
            return Err(degenerate());
        }
        Ok(Self {
            time,
            rotation,
            inverse: rotation.inverse(),
            translation,
        })
    }
}

/// A time-indexed attitude model.
///
/// Built once at setup, either fixed (one sample valid for all time) or from
/// an ordered file of samples. A looping track phase-wraps queries past its
/// end; a bounded track reports out-of-range instead.
#[derive(Debug, Clone)]
pub struct OrientationTrack {
    name: String,
    system: CoordinateSystem,
    samples: Vec<OrientationSample>,
    looping: bool,
}

impl OrientationTrack {
    /// The local default: identity attitude at the origin, for all time.
    pub fn fixed_local() -> Self {
        Self {
            name: "local".into(),
            system: CoordinateSystem::Local,
            samples: vec![OrientationSample {
                time: SimTime::ZERO,
                rotation: DMat3::IDENTITY,
                inverse: DMat3::IDENTITY,
                translation: DVec3::ZERO,
            }],
            looping: false,
        }
    }

    /// A fixed galactic pointing given by the latitudes and longitudes of
    /// the x and z axes, in degrees.
    pub fn fixed_galactic(
        x_lat: f64,
        x_long: f64,
        z_lat: f64,
        z_long: f64,
    ) -> OrientResult<Self> {
        let sample = OrientationSample::from_axes(
            "galactic",
            0,
            SimTime::ZERO,
            galactic_direction(x_lat, x_long),
            galactic_direction(z_lat, z_long),
            DVec3::ZERO,
        )?;
        Ok(Self {
            name: "galactic".into(),
            system: CoordinateSystem::Galactic,
            samples: vec![sample],
            looping: false,
        })
    }

    /// A fixed pointing from two explicit axis directions.
    pub fn fixed_axes(
        system: CoordinateSystem,
        x_axis: DVec3,
        z_axis: DVec3,
    ) -> OrientResult<Self> {
        let sample = OrientationSample::from_axes(
            "fixed",
            0,
            SimTime::ZERO,
            x_axis,
            z_axis,
            DVec3::ZERO,
        )?;
        Ok(Self {
            name: "fixed".into(),
            system,
            samples: vec![sample],
            looping: false,
        })
    }

    /// Build a track from pre-validated samples, checking time ordering.
    pub fn from_samples(
        name: impl Into<String>,
        system: CoordinateSystem,
        samples: Vec<OrientationSample>,
        looping: bool,
    ) -> OrientResult<Self> {
        let name = name.into();
        if samples.is_empty() {
            return Err(OrientError::Empty(name));
        }
        for (index, pair) in samples.windows(2).enumerate() {
            if pair[0].time >= pair[1].time {
                return Err(OrientError::NonMonotonicTime {
                    name,
                    index: index + 1,
                });
            }
        }
        Ok(Self {
            name,
            system,
            samples,
            looping,
        })
    }

    /// Track name (file path for file-driven tracks).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Which frame this track describes.
    pub const fn system(&self) -> CoordinateSystem {
        self.system
    }

    /// True for single-sample tracks valid at every time.
    pub fn is_fixed(&self) -> bool {
        self.samples.len() == 1
    }

    /// True if queries past the end phase-wrap.
    pub const fn is_looping(&self) -> bool {
        self.looping
    }

    /// First declared sample time, for bounded multi-sample tracks.
    pub fn start_time(&self) -> Option<SimTime> {
        (!self.looping && !self.is_fixed()).then(|| self.samples[0].time)
    }

    /// Last declared sample time, for bounded multi-sample tracks.
    pub fn stop_time(&self) -> Option<SimTime> {
        (!self.looping && !self.is_fixed()).then(|| self.samples[self.samples.len() - 1].time)
    }

    /// Whether `time` falls inside the track's validity range.
    pub fn in_range(&self, time: SimTime) -> bool {
        self.lookup(time).is_some()
    }

    /// Index of the closest sample at/after `time`.
    ///
    /// Fixed tracks always answer sample 0. Looping tracks first phase-wrap
    /// `time` into `[t0, tN)`. Bounded tracks answer `None` outside
    /// `[t0, tN]`.
    pub fn lookup(&self, time: SimTime) -> Option<usize> {
        if self.is_fixed() {
            return Some(0);
        }
        let t0 = self.samples[0].time;
        let tn = self.samples[self.samples.len() - 1].time;
        let t = if self.looping {
            let span = tn - t0;
            SimTime::from_secs((time - t0).rem_euclid(span) + t0.as_secs())
        } else {
            if time < t0 || time > tn {
                return None;
            }
            time
        };
        let i = self.samples.partition_point(|s| s.time < t);
        Some(i.min(self.samples.len() - 1))
    }

    /// Transform a position and direction into this track's frame at `time`.
    ///
    /// Local tracks also translate the position; directions are rotated
    /// only. Returns `None` when `time` is out of range.
    pub fn transform(&self, time: SimTime, position: DVec3, direction: DVec3) -> Option<(DVec3, DVec3)> {
        let sample = &self.samples[self.lookup(time)?];
        let mut pos = sample.rotation * position;
        if self.system == CoordinateSystem::Local {
            pos += sample.translation;
        }
        Some((pos, sample.rotation * direction))
    }

    /// Invert [`Self::transform`] at the same `time`, using the exact matrix
    /// inverse of that sample's rotation.
    pub fn inverse_transform(
        &self,
        time: SimTime,
        position: DVec3,
        direction: DVec3,
    ) -> Option<(DVec3, DVec3)> {
        let sample = &self.samples[self.lookup(time)?];
        let mut pos = position;
        if self.system == CoordinateSystem::Local {
            pos -= sample.translation;
        }
        Some((sample.inverse * pos, sample.inverse * direction))
    }
}

/// Unit direction for a galactic latitude/longitude pair in degrees.
fn galactic_direction(lat_deg: f64, long_deg: f64) -> DVec3 {
    let b = lat_deg.to_radians();
    let l = long_deg.to_radians();
    DVec3::new(b.cos() * l.cos(), b.cos() * l.sin(), b.sin())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn tilted_track(looping: bool) -> OrientationTrack {
        let mk = |i: usize, t: f64, phi: f64| {
            OrientationSample::from_axes(
                "test",
                i,
                SimTime::from_secs(t),
                DVec3::new(phi.cos(), phi.sin(), 0.0),
                DVec3::Z,
                DVec3::new(1.0, 2.0, 3.0),
            )
            .unwrap()
        };
        OrientationTrack::from_samples(
            "test",
            CoordinateSystem::Local,
            vec![mk(0, 10.0, 0.0), mk(1, 20.0, 0.5), mk(2, 30.0, 1.0)],
            looping,
        )
        .unwrap()
    }

    #[test]
    fn fixed_track_answers_all_times() {
        let track = OrientationTrack::fixed_local();
        assert!(track.is_fixed());
        assert_eq!(track.lookup(SimTime::from_secs(-1e9)), Some(0));
        assert_eq!(track.lookup(SimTime::from_secs(1e9)), Some(0));
        assert!(track.start_time().is_none());
        assert!(track.stop_time().is_none());
    }

    #[test]
    fn lookup_exact_sample_time_returns_that_sample() {
        let track = tilted_track(false);
        assert_eq!(track.lookup(SimTime::from_secs(10.0)), Some(0));
        assert_eq!(track.lookup(SimTime::from_secs(20.0)), Some(1));
        assert_eq!(track.lookup(SimTime::from_secs(30.0)), Some(2));
    }

    #[test]
    fn bounded_track_out_of_range() {
        let track = tilted_track(false);
        assert!(!track.in_range(SimTime::from_secs(9.999)));
        assert!(!track.in_range(SimTime::from_secs(30.001)));
        assert!(track.in_range(SimTime::from_secs(15.0)));
        assert_eq!(track.start_time(), Some(SimTime::from_secs(10.0)));
        assert_eq!(track.stop_time(), Some(SimTime::from_secs(30.0)));
    }

    #[test]
    fn looping_track_phase_wraps() {
        let track = tilted_track(true);
        // 35s wraps to 15s: the sample at/after is index 1.
        assert_eq!(
            track.lookup(SimTime::from_secs(35.0)),
            track.lookup(SimTime::from_secs(15.0))
        );
        assert!(track.in_range(SimTime::from_secs(1e6)));
        assert!(track.start_time().is_none());
    }

    #[test]
    fn non_monotonic_times_rejected() {
        let mk = |t: f64| {
            OrientationSample::from_axes(
                "bad",
                0,
                SimTime::from_secs(t),
                DVec3::X,
                DVec3::Z,
                DVec3::ZERO,
            )
            .unwrap()
        };
        let err = OrientationTrack::from_samples(
            "bad",
            CoordinateSystem::Galactic,
            vec![mk(1.0), mk(1.0)],
            false,
        )
        .unwrap_err();
        assert!(matches!(err, OrientError::NonMonotonicTime { index: 1, .. }));
    }

    #[test]
    fn non_orthogonal_axes_rejected() {
        let err = OrientationSample::from_axes(
            "bad",
            3,
            SimTime::ZERO,
            DVec3::X,
            DVec3::new(1.0, 0.0, 1.0),
            DVec3::ZERO,
        )
        .unwrap_err();
        assert!(matches!(err, OrientError::NonOrthogonalAxes { index: 3, .. }));
    }

    #[test]
    fn galactic_pointing_axes() {
        let track = OrientationTrack::fixed_galactic(0.0, 0.0, 90.0, 0.0).unwrap();
        let (_, dir) = track
            .transform(SimTime::ZERO, DVec3::ZERO, DVec3::X)
            .unwrap();
        assert!((dir - DVec3::X).length() < 1e-12);
    }

    #[test]
    fn local_transform_translates_position_only() {
        let track = tilted_track(false);
        let t = SimTime::from_secs(10.0);
        let (pos, dir) = track.transform(t, DVec3::ZERO, DVec3::X).unwrap();
        assert!((pos - DVec3::new(1.0, 2.0, 3.0)).length() < 1e-12);
        assert!((dir.length() - 1.0).abs() < 1e-12);
    }

    proptest! {
        #[test]
        fn transform_roundtrip(
            t in 10.0..30.0f64,
            px in -100.0..100.0f64,
            py in -100.0..100.0f64,
            pz in -100.0..100.0f64,
            dphi in 0.0..std::f64::consts::TAU,
        ) {
            let track = tilted_track(false);
            let time = SimTime::from_secs(t);
            let pos = DVec3::new(px, py, pz);
            let dir = DVec3::new(dphi.cos(), dphi.sin(), 0.3).normalize();
            let (tp, td) = track.transform(time, pos, dir).unwrap();
            let (bp, bd) = track.inverse_transform(time, tp, td).unwrap();
            prop_assert!((bp - pos).length() < 1e-9);
            prop_assert!((bd - dir).length() < 1e-12);
        }
    }
}
