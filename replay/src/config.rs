use serde::{Deserialize, Serialize};

use crate::error::{Result, check_exponent};

/// How the importance weights of a batch are scaled so that they never exceed one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightNormalization {
    /// Divide by the largest weight inside the batch.
    #[default]
    Batch,
    /// Divide by the largest weight any example of the dataset could get.
    Global,
}

/// Which batch source a run trains with, chosen once at construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetKind {
    #[default]
    Uniform,
    ClassWeighted,
    Prioritized,
}

/// Prioritization parameters of a `PrioritizedDataset`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    /// Priority exponent, `0` is uniform sampling and `1` is fully proportional.
    pub alpha: f64,
    /// Importance sampling exponent, `0` disables the correction.
    pub beta: f64,
    pub normalization: WeightNormalization,
    /// Seed of the sampling rng, `None` seeds from the os.
    pub seed: Option<u64>,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            alpha: 0.25,
            beta: 1.0,
            normalization: WeightNormalization::Batch,
            seed: None,
        }
    }
}

impl ReplayConfig {
    /// Creates a new `ReplayConfig` with the given exponents.
    ///
    /// # Arguments
    /// * `alpha` - The priority exponent.
    /// * `beta` - The importance sampling exponent.
    ///
    /// # Returns
    /// An error if either exponent is negative or not finite. Values above one are kept as is.
    pub fn new(alpha: f64, beta: f64) -> Result<Self> {
        let config = Self {
            alpha,
            beta,
            ..Self::default()
        };

        config.validate()
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_normalization(mut self, normalization: WeightNormalization) -> Self {
        self.normalization = normalization;
        self
    }

    /// Checks the exponents, returning the config back when they are usable.
    pub fn validate(self) -> Result<Self> {
        check_exponent("alpha", self.alpha)?;
        check_exponent("beta", self.beta)?;
        Ok(self)
    }
}
