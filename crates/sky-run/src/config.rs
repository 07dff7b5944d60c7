use serde::{Deserialize, Serialize};
use sky_source::SamplingLimits;

/// Tunable knobs of a run, separate from its sources and tracks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Seed of the run's single random stream. Two runs with identical
    /// setup and seed produce identical primaries.
    pub seed: u64,
    /// Attempts granted to energy acceptance-rejection loops.
    pub max_energy_attempts: usize,
    /// Candidate steps granted to light-curve thinning.
    pub max_thinning_steps: usize,
    /// Attempts granted to geometric rejection loops.
    pub max_beam_attempts: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        let limits = SamplingLimits::default();
        Self {
            seed: 0,
            max_energy_attempts: limits.max_energy_attempts,
            max_thinning_steps: limits.max_thinning_steps,
            max_beam_attempts: limits.max_beam_attempts,
        }
    }
}

impl RunConfig {
    /// Set the random seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the energy rejection bound.
    #[must_use]
    pub fn with_max_energy_attempts(mut self, attempts: usize) -> Self {
        self.max_energy_attempts = attempts;
        self
    }

    /// Set the thinning step bound.
    #[must_use]
    pub fn with_max_thinning_steps(mut self, steps: usize) -> Self {
        self.max_thinning_steps = steps;
        self
    }

    /// The per-source sampling bounds this configuration implies.
    pub fn limits(&self) -> SamplingLimits {
        SamplingLimits {
            max_energy_attempts: self.max_energy_attempts,
            max_thinning_steps: self.max_thinning_steps,
            max_beam_attempts: self.max_beam_attempts,
        }
    }
}
