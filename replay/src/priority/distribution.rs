use log::warn;
use rand::{
    Rng,
    distr::{Distribution, weighted::WeightedIndex},
};

use crate::{
    config::WeightNormalization,
    error::{ArgumentErr, ReplayErr, Result, check_exponent, check_priority},
};

/// A categorical distribution over example indices derived from their priorities.
///
/// `P(i) = p_i^alpha / sum_j p_j^alpha`. When every `p_i^alpha` is zero the distribution falls
/// back to exactly `1 / N` for every example instead of dividing by zero.
#[derive(Debug, Clone)]
pub struct SamplingDistribution {
    probs: Vec<f64>,
    index: WeightedIndex<f64>,
    uniform_fallback: bool,
}

impl SamplingDistribution {
    /// Builds the distribution for the given priorities.
    ///
    /// Priorities are scaled by their maximum before raising them to `alpha`, which leaves `P`
    /// unchanged but keeps huge priorities from overflowing.
    ///
    /// # Arguments
    /// * `priorities` - One non-negative priority per example.
    /// * `alpha` - The priority exponent.
    ///
    /// # Returns
    /// `EmptyDataset` for no priorities and `InvalidArgument` for a bad `alpha` or priority.
    pub fn build(priorities: &[f64], alpha: f64) -> Result<Self> {
        check_exponent("alpha", alpha)?;

        if priorities.is_empty() {
            return Err(ReplayErr::EmptyDataset);
        }

        let mut max = 0.0_f64;
        for (i, &p) in priorities.iter().enumerate() {
            max = max.max(check_priority(i, p)?);
        }

        let n = priorities.len();
        let uniform_fallback = max == 0.0 && alpha > 0.0;

        let probs = if alpha == 0.0 || uniform_fallback {
            if uniform_fallback {
                warn!(examples = n; "every priority is zero, sampling uniformly");
            }

            vec![1.0 / n as f64; n]
        } else {
            let scaled: Vec<f64> = priorities.iter().map(|&p| (p / max).powf(alpha)).collect();

            // the maximum maps to exactly 1 so the sum never drops below it
            let sum: f64 = scaled.iter().sum();
            scaled.into_iter().map(|s| s / sum).collect()
        };

        let index = WeightedIndex::new(&probs).map_err(|_| ReplayErr::EmptyDataset)?;

        Ok(Self {
            probs,
            index,
            uniform_fallback,
        })
    }

    /// Returns `P(i)` for every example.
    #[inline]
    pub fn probabilities(&self) -> &[f64] {
        &self.probs
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.probs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.probs.is_empty()
    }

    /// Whether the all-zero fallback kicked in.
    #[inline]
    pub fn is_uniform_fallback(&self) -> bool {
        self.uniform_fallback
    }

    /// Draws `size` indices independently, with replacement.
    ///
    /// Examples with a zero probability are never drawn. The order of the draws is reproducible
    /// given a seeded rng.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R, size: usize) -> Vec<usize> {
        (0..size).map(|_| self.index.sample(rng)).collect()
    }

    /// Computes the importance sampling weights `(1 / (N * P(i)))^beta` of the given indices,
    /// scaled so that the reference weight is one.
    ///
    /// The reference is the largest weight of the batch for `WeightNormalization::Batch` and the
    /// largest weight of any example for `WeightNormalization::Global`. Since the `N` factor
    /// cancels out, each weight is computed as `(P_ref / P(i))^beta` where `P_ref` is the smallest
    /// non-zero probability of the reference set.
    ///
    /// Indices with a zero probability can't come out of `sample`; if passed anyway their weight
    /// is capped at one. Weights never underflow to zero, they are floored at `f64::MIN_POSITIVE`.
    ///
    /// # Returns
    /// `InvalidArgument` for a bad `beta` or an out of range index.
    pub fn importance_weights(
        &self,
        indices: &[usize],
        beta: f64,
        normalization: WeightNormalization,
    ) -> Result<Vec<f64>> {
        check_exponent("beta", beta)?;

        let len = self.len();
        if let Some(&index) = indices.iter().find(|&&i| i >= len) {
            return Err(ArgumentErr::IndexOutOfBounds { index, len }.into());
        }

        if beta == 0.0 {
            return Ok(vec![1.0; indices.len()]);
        }

        let reference = match normalization {
            WeightNormalization::Batch => min_nonzero(indices.iter().map(|&i| self.probs[i])),
            WeightNormalization::Global => min_nonzero(self.probs.iter().copied()),
        };

        let Some(p_ref) = reference else {
            return Ok(vec![1.0; indices.len()]);
        };

        let weights = indices
            .iter()
            .map(|&i| {
                let p = self.probs[i];
                if p > 0.0 {
                    (p_ref / p).powf(beta).max(f64::MIN_POSITIVE)
                } else {
                    1.0
                }
            })
            .collect();

        Ok(weights)
    }
}

fn min_nonzero<I: Iterator<Item = f64>>(probs: I) -> Option<f64> {
    probs.filter(|&p| p > 0.0).min_by(f64::total_cmp)
}
