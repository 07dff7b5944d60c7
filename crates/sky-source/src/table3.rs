use glam::DVec3;
use rand::Rng;
use sky_core::{CoreError, math};

use crate::error::SourceResult;

/// A fully normalized energy x zenith x azimuth flux table.
///
/// Cell `(i, j, k)` spans `[energies[i], energies[i+1])` keV,
/// `[thetas[j], thetas[j+1])` and `[phis[k], phis[k+1])` radians, and holds
/// a differential flux. Sampling draws a cell from the CDF of per-cell
/// integrals (including the solid-angle factor) and then a point uniformly
/// inside the cell, so energy and direction come out jointly distributed.
#[derive(Debug, Clone)]
pub struct EnergyBeamTable {
    name: String,
    energies: Vec<f64>,
    thetas: Vec<f64>,
    phis: Vec<f64>,
    cdf: Vec<f64>,
    total: f64,
}

impl EnergyBeamTable {
    /// Build a table from its cell edges and per-cell differential fluxes
    /// (`values` in energy-major, then theta, then phi order).
    pub fn new(
        name: impl Into<String>,
        energies: Vec<f64>,
        thetas: Vec<f64>,
        phis: Vec<f64>,
        values: &[f64],
    ) -> SourceResult<Self> {
        let name = name.into();
        let ne = energies.len().saturating_sub(1);
        let nt = thetas.len().saturating_sub(1);
        let np = phis.len().saturating_sub(1);
        if ne == 0 || nt == 0 || np == 0 || values.len() != ne * nt * np {
            return Err(CoreError::EmptyTable(name).into());
        }
        for (edges, label) in [(&energies, "energy"), (&thetas, "theta"), (&phis, "phi")] {
            for (row, pair) in edges.windows(2).enumerate() {
                if pair[0] >= pair[1] {
                    return Err(CoreError::NonMonotonicTable {
                        name: format!("{name}:{label}"),
                        row: row + 1,
                    }
                    .into());
                }
            }
        }
        if let Some(row) = values.iter().position(|v| *v < 0.0) {
            return Err(CoreError::NegativeValue { name, row }.into());
        }

        let mut cdf = Vec::with_capacity(values.len());
        let mut total = 0.0;
        for i in 0..ne {
            let de = energies[i + 1] - energies[i];
            for j in 0..nt {
                // Solid-angle factor of the zenith band.
                let dcos = thetas[j].cos() - thetas[j + 1].cos();
                for k in 0..np {
                    let dphi = phis[k + 1] - phis[k];
                    total += values[i * nt * np + j * np + k] * de * dcos * dphi;
                    cdf.push(total);
                }
            }
        }
        if total <= 0.0 {
            return Err(CoreError::ZeroIntegral(name).into());
        }
        Ok(Self {
            name,
            energies,
            thetas,
            phis,
            cdf,
            total,
        })
    }

    /// Name of the table.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Integral flux over the whole table (per cm^2 s, before the start-area
    /// factor is applied).
    pub const fn total(&self) -> f64 {
        self.total
    }

    /// Draw a jointly distributed `(energy_kev, direction)` pair. The
    /// direction points from the sky position toward the detector, i.e. it
    /// is the propagation direction.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> (f64, DVec3) {
        let target = rng.random::<f64>() * self.total;
        let cell = self
            .cdf
            .partition_point(|c| *c < target)
            .min(self.cdf.len() - 1);
        let nt = self.thetas.len() - 1;
        let np = self.phis.len() - 1;
        let i = cell / (nt * np);
        let j = (cell / np) % nt;
        let k = cell % np;

        let energy = rng.random_range(self.energies[i]..self.energies[i + 1]);
        // Uniform on the sphere within the zenith band.
        let cos_theta = rng.random_range(self.thetas[j + 1].cos()..=self.thetas[j].cos());
        let phi = rng.random_range(self.phis[k]..self.phis[k + 1]);
        let sky = math::direction_from_angles(cos_theta.acos(), phi);
        (energy, -sky)
    }
}
