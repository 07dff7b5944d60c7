use std::path::Path;

use glam::DVec3;
use sky_core::SimTime;
use tracing::debug;

use crate::error::{OrientError, OrientResult};
use crate::track::{CoordinateSystem, OrientationSample, OrientationTrack};

/// Load an orientation track from a line-record file.
///
/// Two record styles are supported, one per file:
///
/// ```text
/// OG <time> <xLat> <xLong> <zLat> <zLong>
/// OL <time> <tx> <ty> <tz> <xTheta> <xPhi> <zTheta> <zPhi>
/// ```
///
/// `OG` records are galactic pointings (latitude/longitude in degrees, no
/// translation); `OL` records are local attitudes with a translation and
/// axes given as spherical angles in degrees. Lines starting with `#` and
/// blank lines are skipped.
pub fn track_from_file(path: impl AsRef<Path>, looping: bool) -> OrientResult<OrientationTrack> {
    let path = path.as_ref();
    let label = path.display().to_string();
    let text = std::fs::read_to_string(path).map_err(|source| OrientError::Io {
        file: label.clone(),
        source,
    })?;

    let mut system: Option<CoordinateSystem> = None;
    let mut samples = Vec::new();
    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        let style = match fields.first().copied() {
            Some("OG") => CoordinateSystem::Galactic,
            Some("OL") => CoordinateSystem::Local,
            other => {
                return Err(OrientError::MalformedRecord {
                    file: label,
                    line: idx + 1,
                    reason: format!("unknown record tag {other:?}"),
                });
            }
        };
        match system {
            None => system = Some(style),
            Some(s) if s != style => {
                return Err(OrientError::MixedRecordStyles {
                    file: label,
                    line: idx + 1,
                });
            }
            Some(_) => {}
        }

        let expected = match style {
            CoordinateSystem::Galactic => 6,
            CoordinateSystem::Local => 9,
        };
        if fields.len() != expected {
            return Err(OrientError::MalformedRecord {
                file: label,
                line: idx + 1,
                reason: format!("expected {expected} fields, got {}", fields.len()),
            });
        }
        let mut numbers = Vec::with_capacity(expected - 1);
        for field in &fields[1..] {
            let value: f64 = field.parse().map_err(|_| OrientError::MalformedRecord {
                file: label.clone(),
                line: idx + 1,
                reason: format!("not a number: '{field}'"),
            })?;
            numbers.push(value);
        }

        let sample = match style {
            CoordinateSystem::Galactic => OrientationSample::from_axes(
                &label,
                samples.len(),
                SimTime::from_secs(numbers[0]),
                galactic_axis(numbers[1], numbers[2]),
                galactic_axis(numbers[3], numbers[4]),
                DVec3::ZERO,
            )?,
            CoordinateSystem::Local => OrientationSample::from_axes(
                &label,
                samples.len(),
                SimTime::from_secs(numbers[0]),
                spherical_axis(numbers[4], numbers[5]),
                spherical_axis(numbers[6], numbers[7]),
                DVec3::new(numbers[1], numbers[2], numbers[3]),
            )?,
        };
        samples.push(sample);
    }

    let Some(system) = system else {
        return Err(OrientError::Empty(label));
    };
    debug!(file = %label, samples = samples.len(), looping, "loaded orientation track");
    OrientationTrack::from_samples(label, system, samples, looping)
}

/// Unit vector for a galactic latitude/longitude pair in degrees.
fn galactic_axis(lat_deg: f64, long_deg: f64) -> DVec3 {
    let b = lat_deg.to_radians();
    let l = long_deg.to_radians();
    DVec3::new(b.cos() * l.cos(), b.cos() * l.sin(), b.sin())
}

/// Unit vector for spherical angles theta/phi in degrees.
fn spherical_axis(theta_deg: f64, phi_deg: f64) -> DVec3 {
    let theta = theta_deg.to_radians();
    let phi = phi_deg.to_radians();
    DVec3::new(
        theta.sin() * phi.cos(),
        theta.sin() * phi.sin(),
        theta.cos(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(lines: &[&str]) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(f, "{line}").unwrap();
        }
        f
    }

    #[test]
    fn galactic_file_parses() {
        let f = write_file(&[
            "# pointing history",
            "OG 0.0 0.0 0.0 90.0 0.0",
            "OG 10.0 0.0 45.0 90.0 0.0",
        ]);
        let track = track_from_file(f.path(), false).unwrap();
        assert_eq!(track.system(), CoordinateSystem::Galactic);
        assert_eq!(track.start_time(), Some(SimTime::ZERO));
        assert_eq!(track.stop_time(), Some(SimTime::from_secs(10.0)));
    }

    #[test]
    fn local_file_parses_with_translation() {
        let f = write_file(&["OL 0.0 1.0 2.0 3.0 90.0 0.0 0.0 0.0"]);
        let track = track_from_file(f.path(), false).unwrap();
        assert_eq!(track.system(), CoordinateSystem::Local);
        let (pos, _) = track
            .transform(SimTime::ZERO, DVec3::ZERO, DVec3::Z)
            .unwrap();
        assert!((pos - DVec3::new(1.0, 2.0, 3.0)).length() < 1e-12);
    }

    #[test]
    fn mixed_styles_rejected() {
        let f = write_file(&["OG 0.0 0.0 0.0 90.0 0.0", "OL 1.0 0 0 0 90 0 0 0"]);
        let err = track_from_file(f.path(), false).unwrap_err();
        assert!(matches!(err, OrientError::MixedRecordStyles { line: 2, .. }));
    }

    #[test]
    fn wrong_field_count_rejected() {
        let f = write_file(&["OG 0.0 0.0 0.0"]);
        let err = track_from_file(f.path(), false).unwrap_err();
        assert!(matches!(err, OrientError::MalformedRecord { line: 1, .. }));
    }

    #[test]
    fn unsorted_times_rejected() {
        let f = write_file(&["OG 5.0 0.0 0.0 90.0 0.0", "OG 1.0 0.0 0.0 90.0 0.0"]);
        let err = track_from_file(f.path(), false).unwrap_err();
        assert!(matches!(err, OrientError::NonMonotonicTime { .. }));
    }

    #[test]
    fn empty_file_rejected() {
        let f = write_file(&["# nothing here"]);
        let err = track_from_file(f.path(), false).unwrap_err();
        assert!(matches!(err, OrientError::Empty(_)));
    }
}
