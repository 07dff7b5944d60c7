use std::io::BufRead;
use std::path::Path;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// A tabulated non-negative function given as ordered `(x, y)` pairs.
///
/// Used for tabulated spectra, zenith profiles, and radial beam profiles.
/// Values between samples are linearly interpolated; sampling inverts the
/// trapezoid-integrated CDF, so draws are exact for the piecewise-linear
/// model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table1D {
    name: String,
    x: Vec<f64>,
    y: Vec<f64>,
    /// Cumulative trapezoid integral up to each sample; same length as `x`.
    cdf: Vec<f64>,
}

impl Table1D {
    /// Build a table from `(x, y)` pairs, validating monotonic x and
    /// non-negative y.
    pub fn new(name: impl Into<String>, pairs: &[(f64, f64)]) -> CoreResult<Self> {
        let name = name.into();
        if pairs.len() < 2 {
            return Err(CoreError::EmptyTable(name));
        }
        for (row, pair) in pairs.iter().enumerate() {
            if pair.1 < 0.0 {
                return Err(CoreError::NegativeValue { name: name.clone(), row });
            }
            if row > 0 && pairs[row - 1].0 >= pair.0 {
                return Err(CoreError::NonMonotonicTable { name: name.clone(), row });
            }
        }
        let x: Vec<f64> = pairs.iter().map(|p| p.0).collect();
        let y: Vec<f64> = pairs.iter().map(|p| p.1).collect();
        let mut cdf = Vec::with_capacity(x.len());
        let mut acc = 0.0;
        cdf.push(0.0);
        for i in 1..x.len() {
            acc += 0.5 * (y[i] + y[i - 1]) * (x[i] - x[i - 1]);
            cdf.push(acc);
        }
        if acc <= 0.0 {
            return Err(CoreError::ZeroIntegral(name));
        }
        Ok(Self { name, x, y, cdf })
    }

    /// Load a table from a whitespace-separated two-column file.
    /// Lines starting with `#` and blank lines are skipped.
    pub fn from_file(path: impl AsRef<Path>) -> CoreResult<Self> {
        let path = path.as_ref();
        let label = path.display().to_string();
        let file = std::fs::File::open(path).map_err(|source| CoreError::Io {
            file: label.clone(),
            source,
        })?;
        let mut pairs = Vec::new();
        for (idx, line) in std::io::BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|source| CoreError::Io {
                file: label.clone(),
                source,
            })?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let mut fields = trimmed.split_whitespace();
            let record = (fields.next(), fields.next());
            let (Some(xs), Some(ys)) = record else {
                return Err(CoreError::MalformedRecord {
                    file: label.clone(),
                    line: idx + 1,
                    reason: "expected two columns".into(),
                });
            };
            let parse = |s: &str| -> CoreResult<f64> {
                s.parse().map_err(|_| CoreError::MalformedRecord {
                    file: label.clone(),
                    line: idx + 1,
                    reason: format!("not a number: '{s}'"),
                })
            };
            pairs.push((parse(xs)?, parse(ys)?));
        }
        Self::new(label, &pairs)
    }

    /// Name of the table (file path or configured label).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Smallest tabulated x.
    pub fn x_min(&self) -> f64 {
        self.x[0]
    }

    /// Largest tabulated x.
    pub fn x_max(&self) -> f64 {
        self.x[self.x.len() - 1]
    }

    /// Linearly interpolated value at `x`; zero outside the tabulated range.
    pub fn value(&self, x: f64) -> f64 {
        if x < self.x_min() || x > self.x_max() {
            return 0.0;
        }
        let i = match self.x.binary_search_by(|v| v.total_cmp(&x)) {
            Ok(i) => return self.y[i],
            Err(i) => i,
        };
        let frac = (x - self.x[i - 1]) / (self.x[i] - self.x[i - 1]);
        self.y[i - 1] + frac * (self.y[i] - self.y[i - 1])
    }

    /// Largest tabulated ordinate.
    pub fn max_value(&self) -> f64 {
        self.y.iter().copied().fold(0.0, f64::max)
    }

    /// Total trapezoid integral over the tabulated range.
    pub fn integral(&self) -> f64 {
        self.cdf[self.cdf.len() - 1]
    }

    /// Draw an x distributed according to the tabulated function.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let target = rng.random::<f64>() * self.integral();
        let i = match self.cdf.binary_search_by(|v| v.total_cmp(&target)) {
            Ok(i) => return self.x[i],
            Err(i) => i.clamp(1, self.x.len() - 1),
        };
        // Invert the quadratic CDF segment between samples i-1 and i.
        let x0 = self.x[i - 1];
        let dx = self.x[i] - x0;
        let y0 = self.y[i - 1];
        let slope = (self.y[i] - y0) / dx;
        let rest = target - self.cdf[i - 1];
        if slope.abs() < 1e-300 {
            if y0 <= 0.0 {
                return x0;
            }
            return x0 + rest / y0;
        }
        let disc = (y0 * y0 + 2.0 * slope * rest).max(0.0);
        x0 + (disc.sqrt() - y0) / slope
    }
}

/// A time-variable flux profile with uniform bins.
///
/// Bin `i` covers `[offset + i*bin_width, offset + (i+1)*bin_width)` and
/// holds the relative emission rate in that interval. A looping curve
/// phase-wraps; a bounded one is exhausted past its last bin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LightCurve {
    name: String,
    bin_width: f64,
    offset: f64,
    contents: Vec<f64>,
    looping: bool,
}

impl LightCurve {
    /// Build a light curve from per-bin contents.
    pub fn new(
        name: impl Into<String>,
        bin_width: f64,
        offset: f64,
        contents: Vec<f64>,
        looping: bool,
    ) -> CoreResult<Self> {
        let name = name.into();
        if contents.is_empty() || bin_width <= 0.0 {
            return Err(CoreError::EmptyTable(name));
        }
        if let Some(row) = contents.iter().position(|c| *c < 0.0) {
            return Err(CoreError::NegativeValue { name, row });
        }
        if contents.iter().sum::<f64>() <= 0.0 {
            return Err(CoreError::ZeroIntegral(name));
        }
        Ok(Self {
            name,
            bin_width,
            offset,
            contents,
            looping,
        })
    }

    /// Load a light curve from a file of the form: first non-comment line
    /// `<binWidth> <offset>`, remaining lines one bin content each.
    pub fn from_file(path: impl AsRef<Path>, looping: bool) -> CoreResult<Self> {
        let path = path.as_ref();
        let label = path.display().to_string();
        let text = std::fs::read_to_string(path).map_err(|source| CoreError::Io {
            file: label.clone(),
            source,
        })?;
        let mut header: Option<(f64, f64)> = None;
        let mut contents = Vec::new();
        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let record = || CoreError::MalformedRecord {
                file: label.clone(),
                line: idx + 1,
                reason: "expected numeric fields".into(),
            };
            if header.is_none() {
                let mut fields = line.split_whitespace();
                let (Some(w), Some(o)) = (fields.next(), fields.next()) else {
                    return Err(record());
                };
                let w: f64 = w.parse().map_err(|_| record())?;
                let o: f64 = o.parse().map_err(|_| record())?;
                header = Some((w, o));
            } else {
                contents.push(line.parse().map_err(|_| record())?);
            }
        }
        let Some((bin_width, offset)) = header else {
            return Err(CoreError::EmptyTable(label));
        };
        Self::new(label, bin_width, offset, contents, looping)
    }

    /// Name of the curve.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Start time of the first bin.
    pub const fn start(&self) -> f64 {
        self.offset
    }

    /// End time of the last bin (one full period when looping).
    pub fn end(&self) -> f64 {
        self.offset + self.bin_width * self.contents.len() as f64
    }

    /// Whether the curve repeats past its end.
    pub const fn is_looping(&self) -> bool {
        self.looping
    }

    /// Relative rate at time `t`; zero outside a bounded curve.
    pub fn rate(&self, t: f64) -> f64 {
        let span = self.end() - self.offset;
        let local = if self.looping {
            (t - self.offset).rem_euclid(span) + self.offset
        } else {
            t
        };
        if local < self.offset || local >= self.end() {
            return 0.0;
        }
        let bin = ((local - self.offset) / self.bin_width) as usize;
        self.contents[bin.min(self.contents.len() - 1)]
    }

    /// Largest per-bin rate, used as the thinning envelope.
    pub fn max_rate(&self) -> f64 {
        self.contents.iter().copied().fold(0.0, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::io::Write;

    #[test]
    fn table_rejects_bad_input() {
        assert!(matches!(
            Table1D::new("t", &[(0.0, 1.0)]),
            Err(CoreError::EmptyTable(_))
        ));
        assert!(matches!(
            Table1D::new("t", &[(0.0, 1.0), (0.0, 2.0)]),
            Err(CoreError::NonMonotonicTable { row: 1, .. })
        ));
        assert!(matches!(
            Table1D::new("t", &[(0.0, 1.0), (1.0, -2.0)]),
            Err(CoreError::NegativeValue { row: 1, .. })
        ));
        assert!(matches!(
            Table1D::new("t", &[(0.0, 0.0), (1.0, 0.0)]),
            Err(CoreError::ZeroIntegral(_))
        ));
    }

    #[test]
    fn table_interpolates() {
        let t = Table1D::new("t", &[(0.0, 0.0), (2.0, 4.0)]).unwrap();
        assert!((t.value(1.0) - 2.0).abs() < 1e-12);
        assert!((t.value(2.0) - 4.0).abs() < 1e-12);
        assert_eq!(t.value(-0.1), 0.0);
        assert_eq!(t.value(2.1), 0.0);
        assert!((t.integral() - 4.0).abs() < 1e-12);
    }

    #[test]
    fn table_sampling_matches_distribution() {
        // Linearly rising density on [0, 1]: mean of x ~ 2/3.
        let t = Table1D::new("t", &[(0.0, 0.0), (1.0, 1.0)]).unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        let n = 100_000;
        let mean: f64 = (0..n).map(|_| t.sample(&mut rng)).sum::<f64>() / f64::from(n);
        assert!(
            (mean - 2.0 / 3.0).abs() < 0.005,
            "sample mean {mean} far from 2/3"
        );
    }

    #[test]
    fn table_from_file_skips_comments() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "# spectrum").unwrap();
        writeln!(f, "100 1.0").unwrap();
        writeln!(f).unwrap();
        writeln!(f, "200 2.0").unwrap();
        let t = Table1D::from_file(f.path()).unwrap();
        assert!((t.x_min() - 100.0).abs() < 1e-12);
        assert!((t.x_max() - 200.0).abs() < 1e-12);
    }

    #[test]
    fn table_from_file_reports_line() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "100 1.0").unwrap();
        writeln!(f, "oops").unwrap();
        let err = Table1D::from_file(f.path()).unwrap_err();
        assert!(matches!(err, CoreError::MalformedRecord { line: 2, .. }));
    }

    #[test]
    fn light_curve_rate_and_wrap() {
        let lc = LightCurve::new("lc", 1.0, 10.0, vec![1.0, 3.0], true).unwrap();
        assert!((lc.rate(10.5) - 1.0).abs() < 1e-12);
        assert!((lc.rate(11.5) - 3.0).abs() < 1e-12);
        // One full period later.
        assert!((lc.rate(12.5) - 1.0).abs() < 1e-12);
        assert!((lc.max_rate() - 3.0).abs() < 1e-12);
    }

    #[test]
    fn bounded_light_curve_is_zero_outside() {
        let lc = LightCurve::new("lc", 1.0, 0.0, vec![2.0], false).unwrap();
        assert_eq!(lc.rate(-0.1), 0.0);
        assert_eq!(lc.rate(1.0), 0.0);
        assert!((lc.rate(0.5) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn light_curve_from_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "# binWidth offset").unwrap();
        writeln!(f, "0.5 2.0").unwrap();
        writeln!(f, "1.0").unwrap();
        writeln!(f, "4.0").unwrap();
        let lc = LightCurve::from_file(f.path(), false).unwrap();
        assert!((lc.start() - 2.0).abs() < 1e-12);
        assert!((lc.end() - 3.0).abs() < 1e-12);
        assert!((lc.rate(2.7) - 4.0).abs() < 1e-12);
    }
}
