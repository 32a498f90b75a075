use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

use super::error::{Result, SimulationError};
use super::types::ModelConstants;

/// Monthly return source for one trial.
pub struct ReturnSampler {
    rng: ChaCha8Rng,
    distribution: Normal<f64>,
}

impl ReturnSampler {
    pub fn new(constants: ModelConstants, seed: u64) -> Result<Self> {
        let distribution = Normal::new(
            constants.mean_monthly_return,
            constants.monthly_return_volatility,
        )
        .map_err(|e| SimulationError::invalid("monthly_return_volatility", e.to_string()))?;

        Ok(Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            distribution,
        })
    }

    pub fn sample_returns(&mut self, months: u32) -> Vec<f64> {
        (0..months)
            .map(|_| self.distribution.sample(&mut self.rng))
            .collect()
    }
}

pub(crate) fn derive_seed(base_seed: u64, trial: u32) -> u64 {
    splitmix64(base_seed ^ ((trial as u64) << 17) ^ trial as u64)
}

fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}
