use rand::Rng;
use rand_distr::{Distribution, Normal};
use sky_core::Table1D;

use crate::error::{SourceError, SourceResult};

/// Reference energy of the Band function's power-law terms, in keV.
const BAND_PIVOT_KEV: f64 = 100.0;

/// Position of the black-body peak in units of kT: the maximum of
/// `E^2 / (exp(E/kT) - 1)`.
const BLACK_BODY_PEAK_X: f64 = 1.593_624_260_04;

/// The spectral family of a source: how emitted energies are distributed.
///
/// Continuous families are sampled by inverse CDF where a closed form
/// exists and by acceptance-rejection against a precomputed envelope
/// otherwise. All rejection loops are bounded; exhaustion is an error
/// rather than a hang.
#[derive(Debug, Clone)]
pub enum SpectralModel {
    /// A single line energy.
    Mono {
        /// Line energy in keV.
        energy_kev: f64,
    },
    /// Flat between two bounds.
    Uniform {
        /// Lower bound in keV.
        min_kev: f64,
        /// Upper bound in keV.
        max_kev: f64,
    },
    /// `E^-index` between two bounds, sampled by inverse CDF.
    PowerLaw {
        /// Lower bound in keV.
        min_kev: f64,
        /// Upper bound in keV.
        max_kev: f64,
        /// Photon index.
        index: f64,
    },
    /// Two power laws continuous at the break energy.
    BrokenPowerLaw {
        /// Lower bound in keV.
        min_kev: f64,
        /// Upper bound in keV.
        max_kev: f64,
        /// Break energy in keV.
        break_kev: f64,
        /// Photon index below the break.
        index_low: f64,
        /// Photon index above the break.
        index_high: f64,
    },
    /// A Gaussian line.
    Gaussian {
        /// Line center in keV.
        mean_kev: f64,
        /// Line width in keV.
        sigma_kev: f64,
    },
    /// Thermal bremsstrahlung: `exp(-E/kT) / E`.
    ThermalBremsstrahlung {
        /// Lower bound in keV.
        min_kev: f64,
        /// Upper bound in keV.
        max_kev: f64,
        /// Plasma temperature kT in keV.
        temperature_kev: f64,
    },
    /// Black body: `E^2 / (exp(E/kT) - 1)`.
    BlackBody {
        /// Lower bound in keV.
        min_kev: f64,
        /// Upper bound in keV.
        max_kev: f64,
        /// Temperature kT in keV.
        temperature_kev: f64,
    },
    /// The Band function: two power laws with an exponential joint at
    /// `(alpha - beta) * e0`.
    Band {
        /// Lower bound in keV.
        min_kev: f64,
        /// Upper bound in keV.
        max_kev: f64,
        /// Low-energy index.
        alpha: f64,
        /// High-energy index.
        beta: f64,
        /// Cutoff energy in keV.
        e0_kev: f64,
    },
    /// A tabulated differential spectrum, CDF-inverted.
    Tabulated(Table1D),
    /// Energy is sampled jointly with the direction by the beam's
    /// energy-beam table (see `BeamModel::FarFieldTable`).
    JointWithBeam,
}

impl SpectralModel {
    /// Validate the configuration at setup time.
    pub fn validate(&self, name: &str) -> SourceResult<()> {
        let range_err = |min: f64, max: f64| SourceError::InvalidEnergyRange {
            name: name.to_string(),
            min,
            max,
        };
        match *self {
            Self::Mono { energy_kev } => {
                if energy_kev <= 0.0 {
                    return Err(range_err(energy_kev, energy_kev));
                }
            }
            Self::Uniform { min_kev, max_kev }
            | Self::PowerLaw {
                min_kev, max_kev, ..
            }
            | Self::ThermalBremsstrahlung {
                min_kev, max_kev, ..
            }
            | Self::BlackBody {
                min_kev, max_kev, ..
            }
            | Self::Band {
                min_kev, max_kev, ..
            } => {
                if min_kev <= 0.0 || max_kev <= min_kev {
                    return Err(range_err(min_kev, max_kev));
                }
            }
            Self::BrokenPowerLaw {
                min_kev,
                max_kev,
                break_kev,
                ..
            } => {
                if min_kev <= 0.0 || max_kev <= min_kev {
                    return Err(range_err(min_kev, max_kev));
                }
                if break_kev <= min_kev || break_kev >= max_kev {
                    return Err(range_err(min_kev, max_kev));
                }
            }
            Self::Gaussian {
                mean_kev,
                sigma_kev,
            } => {
                if mean_kev <= 0.0 || sigma_kev <= 0.0 {
                    return Err(range_err(mean_kev, sigma_kev));
                }
            }
            Self::Tabulated(_) | Self::JointWithBeam => {}
        }
        Ok(())
    }

    /// Draw one energy in keV.
    pub fn sample<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        name: &str,
        max_attempts: usize,
    ) -> SourceResult<f64> {
        match *self {
            Self::Mono { energy_kev } => Ok(energy_kev),
            Self::Uniform { min_kev, max_kev } => Ok(rng.random_range(min_kev..max_kev)),
            Self::PowerLaw {
                min_kev,
                max_kev,
                index,
            } => Ok(sample_power_law(rng, min_kev, max_kev, index)),
            Self::BrokenPowerLaw {
                min_kev,
                max_kev,
                break_kev,
                index_low,
                index_high,
            } => {
                // Continuous at the break by construction: both branches
                // evaluate to 1 at E = break.
                let f = |e: f64| {
                    if e < break_kev {
                        (e / break_kev).powf(-index_low)
                    } else {
                        (e / break_kev).powf(-index_high)
                    }
                };
                let envelope = f(min_kev).max(f(break_kev)).max(f(max_kev));
                rejection_sample(
                    rng,
                    name,
                    "broken power-law energy",
                    min_kev,
                    max_kev,
                    envelope,
                    f,
                    max_attempts,
                )
            }
            Self::Gaussian {
                mean_kev,
                sigma_kev,
            } => {
                // Redraw the rare non-physical negative tail.
                let normal = Normal::new(mean_kev, sigma_kev)
                    .map_err(|_| SourceError::InvalidEnergyRange {
                        name: name.to_string(),
                        min: mean_kev,
                        max: sigma_kev,
                    })?;
                for _ in 0..max_attempts {
                    let e = normal.sample(rng);
                    if e > 0.0 {
                        return Ok(e);
                    }
                }
                Err(SourceError::SamplingExhausted {
                    name: name.to_string(),
                    what: "gaussian energy".into(),
                    attempts: max_attempts,
                })
            }
            Self::ThermalBremsstrahlung {
                min_kev,
                max_kev,
                temperature_kev,
            } => {
                let f = |e: f64| (-e / temperature_kev).exp() / e;
                rejection_sample(
                    rng,
                    name,
                    "thermal bremsstrahlung energy",
                    min_kev,
                    max_kev,
                    f(min_kev),
                    f,
                    max_attempts,
                )
            }
            Self::BlackBody {
                min_kev,
                max_kev,
                temperature_kev,
            } => {
                let f = |e: f64| e * e / (e / temperature_kev).exp_m1();
                let peak = (BLACK_BODY_PEAK_X * temperature_kev).clamp(min_kev, max_kev);
                rejection_sample(
                    rng,
                    name,
                    "black-body energy",
                    min_kev,
                    max_kev,
                    f(peak),
                    f,
                    max_attempts,
                )
            }
            Self::Band {
                min_kev,
                max_kev,
                alpha,
                beta,
                e0_kev,
            } => {
                let break_kev = (alpha - beta) * e0_kev;
                let f = |e: f64| {
                    if e < break_kev {
                        (e / BAND_PIVOT_KEV).powf(alpha) * (-e / e0_kev).exp()
                    } else {
                        (break_kev / BAND_PIVOT_KEV).powf(alpha - beta)
                            * (beta - alpha).exp()
                            * (e / BAND_PIVOT_KEV).powf(beta)
                    }
                };
                let mut envelope = f(min_kev).max(f(max_kev));
                if break_kev > min_kev && break_kev < max_kev {
                    envelope = envelope.max(f(break_kev));
                }
                rejection_sample(
                    rng,
                    name,
                    "band-function energy",
                    min_kev,
                    max_kev,
                    envelope,
                    f,
                    max_attempts,
                )
            }
            Self::Tabulated(ref table) => Ok(table.sample(rng)),
            // The joint table draws energy together with the direction; the
            // source never routes a standalone energy draw here.
            Self::JointWithBeam => Err(SourceError::DegenerateBeam {
                name: name.to_string(),
                reason: "energy is sampled jointly with the beam table".into(),
            }),
        }
    }
}

/// Inverse-CDF draw from `E^-index` on `[min, max]`, including the
/// logarithmic `index == 1` case.
fn sample_power_law<R: Rng + ?Sized>(rng: &mut R, min: f64, max: f64, index: f64) -> f64 {
    let u = rng.random::<f64>();
    if (index - 1.0).abs() < 1e-12 {
        min * (max / min).powf(u)
    } else {
        let g = 1.0 - index;
        (min.powf(g) + u * (max.powf(g) - min.powf(g))).powf(1.0 / g)
    }
}

#[allow(clippy::too_many_arguments)]
fn rejection_sample<R: Rng + ?Sized>(
    rng: &mut R,
    name: &str,
    what: &str,
    min: f64,
    max: f64,
    envelope: f64,
    f: impl Fn(f64) -> f64,
    max_attempts: usize,
) -> SourceResult<f64> {
    for _ in 0..max_attempts {
        let e = rng.random_range(min..max);
        if rng.random::<f64>() * envelope <= f(e) {
            return Ok(e);
        }
    }
    Err(SourceError::SamplingExhausted {
        name: name.to_string(),
        what: what.to_string(),
        attempts: max_attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    const ATTEMPTS: usize = 1_000_000;

    fn draw_many(model: &SpectralModel, n: usize) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(99);
        (0..n)
            .map(|_| model.sample(&mut rng, "test", ATTEMPTS).unwrap())
            .collect()
    }

    #[test]
    fn mono_returns_line_energy() {
        let model = SpectralModel::Mono { energy_kev: 661.7 };
        assert_eq!(model.sample(&mut StdRng::seed_from_u64(0), "t", 1).unwrap(), 661.7);
    }

    #[test]
    fn uniform_stays_in_range_with_flat_mean() {
        let model = SpectralModel::Uniform {
            min_kev: 100.0,
            max_kev: 300.0,
        };
        let draws = draw_many(&model, 50_000);
        let mean: f64 = draws.iter().sum::<f64>() / draws.len() as f64;
        assert!(draws.iter().all(|&e| (100.0..300.0).contains(&e)));
        assert!((mean - 200.0).abs() < 1.5, "mean {mean}");
    }

    #[test]
    fn power_law_matches_analytic_mean() {
        // index 2 on [100, 1000]: mean = ln(10) / (1/100 - 1/1000)
        let model = SpectralModel::PowerLaw {
            min_kev: 100.0,
            max_kev: 1000.0,
            index: 2.0,
        };
        let draws = draw_many(&model, 200_000);
        let mean: f64 = draws.iter().sum::<f64>() / draws.len() as f64;
        let expected = 10f64.ln() / (1.0 / 100.0 - 1.0 / 1000.0);
        assert!(
            (mean - expected).abs() / expected < 0.01,
            "mean {mean}, expected {expected}"
        );
    }

    #[test]
    fn power_law_index_one_log_case() {
        let model = SpectralModel::PowerLaw {
            min_kev: 10.0,
            max_kev: 1000.0,
            index: 1.0,
        };
        let draws = draw_many(&model, 100_000);
        assert!(draws.iter().all(|&e| (10.0..=1000.0).contains(&e)));
        // For 1/E the median is the geometric mean of the bounds.
        let mut sorted = draws;
        sorted.sort_by(f64::total_cmp);
        let median = sorted[sorted.len() / 2];
        assert!((median - 100.0).abs() < 3.0, "median {median}");
    }

    #[test]
    fn broken_power_law_is_continuous_at_break() {
        let model = SpectralModel::BrokenPowerLaw {
            min_kev: 10.0,
            max_kev: 1000.0,
            break_kev: 100.0,
            index_low: 1.0,
            index_high: 2.5,
        };
        // Counts in equal-width windows on either side of the break should
        // be close, since the density is continuous there.
        let draws = draw_many(&model, 300_000);
        let below = draws.iter().filter(|&&e| (90.0..100.0).contains(&e)).count();
        let above = draws.iter().filter(|&&e| (100.0..110.0).contains(&e)).count();
        let ratio = below as f64 / above as f64;
        assert!((0.85..1.35).contains(&ratio), "ratio {ratio}");
    }

    #[test]
    fn gaussian_positive_and_centered() {
        let model = SpectralModel::Gaussian {
            mean_kev: 511.0,
            sigma_kev: 5.0,
        };
        let draws = draw_many(&model, 50_000);
        let mean: f64 = draws.iter().sum::<f64>() / draws.len() as f64;
        assert!((mean - 511.0).abs() < 0.2, "mean {mean}");
        assert!(draws.iter().all(|&e| e > 0.0));
    }

    #[test]
    fn black_body_peak_near_wien_maximum() {
        let kt = 30.0;
        let model = SpectralModel::BlackBody {
            min_kev: 1.0,
            max_kev: 500.0,
            temperature_kev: kt,
        };
        let draws = draw_many(&model, 200_000);
        // Histogram in 5 keV bins; the mode should sit near 1.594 kT.
        let mut bins = [0usize; 100];
        for e in draws {
            bins[(e / 5.0) as usize] += 1;
        }
        let mode_bin = bins.iter().enumerate().max_by_key(|(_, c)| **c).unwrap().0;
        let mode = mode_bin as f64 * 5.0 + 2.5;
        assert!(
            (mode - BLACK_BODY_PEAK_X * kt).abs() < 10.0,
            "mode {mode}, expected {}",
            BLACK_BODY_PEAK_X * kt
        );
    }

    #[test]
    fn band_break_position() {
        let model = SpectralModel::Band {
            min_kev: 10.0,
            max_kev: 10_000.0,
            alpha: -1.0,
            beta: -2.5,
            e0_kev: 300.0,
        };
        model.validate("grb").unwrap();
        let draws = draw_many(&model, 50_000);
        assert!(draws.iter().all(|&e| (10.0..=10_000.0).contains(&e)));
    }

    #[test]
    fn tabulated_spectrum_sampled_from_table() {
        let table = Table1D::new("flat", &[(100.0, 1.0), (200.0, 1.0)]).unwrap();
        let model = SpectralModel::Tabulated(table);
        let draws = draw_many(&model, 20_000);
        let mean: f64 = draws.iter().sum::<f64>() / draws.len() as f64;
        assert!((mean - 150.0).abs() < 1.0, "mean {mean}");
    }

    #[test]
    fn validation_rejects_bad_ranges() {
        assert!(
            SpectralModel::Uniform {
                min_kev: 10.0,
                max_kev: 5.0
            }
            .validate("bad")
            .is_err()
        );
        assert!(
            SpectralModel::BrokenPowerLaw {
                min_kev: 10.0,
                max_kev: 100.0,
                break_kev: 200.0,
                index_low: 1.0,
                index_high: 2.0,
            }
            .validate("bad")
            .is_err()
        );
        assert!(SpectralModel::Mono { energy_kev: -1.0 }.validate("bad").is_err());
    }
}
