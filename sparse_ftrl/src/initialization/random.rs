use rand::Rng;
use rand_distr::{Distribution, Normal, NormalError, Uniform};

use super::{ParamGen, Result};

/// Fills a table with independent draws from a distribution.
///
/// Owns its rng, so two generators built from equally seeded rngs write the same table.
pub struct RandParamGen<R: Rng, D: Distribution<f32>> {
    rng: R,
    distribution: D,
    remaining: usize,
}

impl<R: Rng, D: Distribution<f32>> RandParamGen<R, D> {
    /// Creates a new `RandParamGen`.
    ///
    /// # Arguments
    /// * `rng` - The source of randomness.
    /// * `distribution` - The distribution every element is drawn from.
    /// * `limit` - How many elements the generator may write in total.
    pub fn new(rng: R, distribution: D, limit: usize) -> Self {
        Self {
            rng,
            distribution,
            remaining: limit,
        }
    }
}

impl<R: Rng> RandParamGen<R, Uniform<f32>> {
    /// Draws from `[low, high)`.
    ///
    /// # Returns
    /// An error unless `low < high`, both finite.
    pub fn uniform(rng: R, limit: usize, low: f32, high: f32) -> Result<Self> {
        Ok(Self::new(rng, Uniform::new(low, high)?, limit))
    }

    /// Draws from `[low, high]`.
    ///
    /// # Returns
    /// An error unless `low <= high`, both finite.
    pub fn uniform_inclusive(rng: R, limit: usize, low: f32, high: f32) -> Result<Self> {
        Ok(Self::new(rng, Uniform::new_inclusive(low, high)?, limit))
    }
}

impl<R: Rng> RandParamGen<R, Normal<f32>> {
    /// Draws from a normal distribution.
    ///
    /// # Returns
    /// An error if `std_dev` is negative or not finite.
    pub fn normal(rng: R, limit: usize, mean: f32, std_dev: f32) -> Result<Self> {
        // `Normal::new` only rejects a non-finite deviation.
        if !(std_dev >= 0.) {
            return Err(NormalError::BadVariance.into());
        }

        Ok(Self::new(rng, Normal::new(mean, std_dev)?, limit))
    }
}

impl<R: Rng, D: Distribution<f32>> ParamGen for RandParamGen<R, D> {
    fn remaining(&self) -> usize {
        self.remaining
    }

    fn fill(&mut self, out: &mut [f32]) -> usize {
        let n = out.len().min(self.remaining);

        for value in &mut out[..n] {
            *value = self.distribution.sample(&mut self.rng);
        }

        self.remaining -= n;
        n
    }
}
