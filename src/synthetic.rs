use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, ensure};
use ndarray::{Array1, Array2, Axis};
use rand::{Rng, SeedableRng, rngs::StdRng};
use rand_distr::{Distribution, Normal, StandardNormal};
use replay::{ArgumentErr, Collected, Collector};
use serde::{Deserialize, Serialize};

/// The shape of the simulated driving scenarios.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticConfig {
    /// Vehicle features per timestep.
    pub features: usize,
    /// Risk events tracked per timestep (collision, hard brake, ...).
    pub events: usize,
    /// Timesteps recorded per scenario, one example each.
    pub timesteps: usize,
    /// Standard deviation of the noise added to every event's logit.
    pub noise: f64,
    /// Intercept of every event's logit, negative values make events rare.
    pub base_logit: f64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            features: 8,
            events: 5,
            timesteps: 20,
            noise: 1.0,
            base_logit: -3.0,
        }
    }
}

/// Simulates driving scenarios whose events follow a fixed logistic model of the features.
///
/// Every worker draws from its own rng stream, advanced once per `collect` call, so a seeded run
/// collects the same rows no matter how the workers are scheduled.
#[derive(Debug)]
pub struct SyntheticScenarios {
    config: SyntheticConfig,
    weights: Array2<f64>,
    noise: Normal<f64>,
    seed: u64,
    streams: Vec<AtomicU64>,
}

impl SyntheticScenarios {
    /// Creates a new `SyntheticScenarios` collector.
    ///
    /// # Arguments
    /// * `config` - The shape of the scenarios.
    /// * `num_workers` - The amount of workers that will collect in parallel.
    /// * `seed` - Seeds the event model and every worker's stream.
    ///
    /// # Returns
    /// An error if the noise is not a valid standard deviation.
    pub fn new(config: SyntheticConfig, num_workers: usize, seed: u64) -> anyhow::Result<Self> {
        ensure!(
            config.noise.is_finite() && config.noise >= 0.0,
            "invalid scenario noise {}",
            config.noise
        );
        let noise = Normal::new(0.0, config.noise).context("invalid scenario noise")?;

        let mut rng = StdRng::seed_from_u64(seed);
        let weights: Array2<f64> = Array2::from_shape_fn((config.features, config.events), |_| {
            StandardNormal.sample(&mut rng)
        });

        Ok(Self {
            config,
            weights,
            noise,
            seed,
            streams: (0..num_workers).map(|_| AtomicU64::new(0)).collect(),
        })
    }

    #[inline]
    pub fn config(&self) -> &SyntheticConfig {
        &self.config
    }

    /// Simulates `scenarios` scenarios with the given rng.
    pub fn simulate<R: Rng>(&self, rng: &mut R, scenarios: usize) -> Collected {
        let rows = scenarios * self.config.timesteps;
        let SyntheticConfig {
            features,
            base_logit,
            ..
        } = self.config;

        let x: Array2<f64> =
            Array2::from_shape_fn((rows, features), |_| StandardNormal.sample(rng));

        let mut logits = x.dot(&self.weights) + base_logit;
        logits.mapv_inplace(|l| l + self.noise.sample(rng));

        let y = logits.mapv(|l| f64::from(rng.random_bool(sigmoid(l))));
        Collected { x, y }
    }

    /// Returns the share of rows in which each event happened.
    pub fn event_rates(collected: &Collected) -> Option<Array1<f64>> {
        collected.y.mean_axis(Axis(0))
    }
}

fn sigmoid(logit: f64) -> f64 {
    1.0 / (1.0 + (-logit).exp())
}

impl Collector for SyntheticScenarios {
    fn collect(&self, worker_id: usize, scenarios: usize) -> replay::Result<Collected> {
        let Some(stream) = self.streams.get(worker_id) else {
            return Err(ArgumentErr::IndexOutOfBounds {
                index: worker_id,
                len: self.streams.len(),
            }
            .into());
        };

        let draw = stream.fetch_add(1, Ordering::Relaxed);
        let stream_seed = self
            .seed
            .wrapping_add((worker_id as u64 + 1) << 32)
            .wrapping_add(draw);

        let mut rng = StdRng::seed_from_u64(stream_seed);
        Ok(self.simulate(&mut rng, scenarios))
    }
}
