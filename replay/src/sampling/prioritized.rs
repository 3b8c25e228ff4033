use std::ops::Range;

use log::{debug, info};
use ndarray::{Array1, ArrayView2};
use rand::rngs::StdRng;

use super::{BatchSource, check_request, generate_rng};
use crate::{
    config::ReplayConfig,
    data::{Batch, Dataset, Partition},
    error::Result,
    priority::{PriorityStore, SamplingDistribution},
};

/// Serves train batches drawn proportionally to `priority^alpha`, each example weighted by its
/// importance sampling correction.
///
/// The sampling distribution is built from the priority store when first needed and cached
/// until the next priority refresh or absorb, so consecutive batches without updates in between
/// don't pay for a rebuild.
#[derive(Debug, Clone)]
pub struct PrioritizedDataset {
    dataset: Dataset,
    store: PriorityStore,
    config: ReplayConfig,
    rng: StdRng,
    cached: Option<SamplingDistribution>,
}

impl PrioritizedDataset {
    /// Creates a new `PrioritizedDataset`, every train example starting at the default priority.
    ///
    /// # Arguments
    /// * `dataset` - The dataset to sample from.
    /// * `config` - The exponents, normalization policy and rng seed.
    ///
    /// # Returns
    /// An error if the config exponents are invalid.
    pub fn new(dataset: Dataset, config: ReplayConfig) -> Result<Self> {
        let config = config.validate()?;
        let store = PriorityStore::new(dataset.train_len());

        Ok(Self {
            dataset,
            store,
            rng: generate_rng(config.seed),
            config,
            cached: None,
        })
    }

    #[inline]
    pub fn priorities(&self) -> &PriorityStore {
        &self.store
    }

    #[inline]
    pub fn config(&self) -> &ReplayConfig {
        &self.config
    }

    /// Returns the current sampling distribution, building it if stale.
    pub fn distribution(&mut self) -> Result<&SamplingDistribution> {
        let dist = fresh_distribution(&mut self.cached, &self.store, self.config.alpha)?;
        Ok(dist)
    }

    fn invalidate(&mut self) {
        self.cached = None;
    }
}

fn fresh_distribution<'a>(
    cached: &'a mut Option<SamplingDistribution>,
    store: &PriorityStore,
    alpha: f64,
) -> Result<&'a SamplingDistribution> {
    let dist = match cached.take() {
        Some(dist) => dist,
        None => SamplingDistribution::build(store.get_all(), alpha)?,
    };

    Ok(cached.insert(dist))
}

impl BatchSource for PrioritizedDataset {
    fn next_batch(&mut self, size: usize) -> Result<Batch> {
        check_request(size, self.dataset.train_len())?;

        let ReplayConfig {
            alpha,
            beta,
            normalization,
            ..
        } = self.config;

        let dist = fresh_distribution(&mut self.cached, &self.store, alpha)?;
        let indices = dist.sample(&mut self.rng, size);
        let weights = dist.importance_weights(&indices, beta, normalization)?;
        let (x, y) = self.dataset.gather(Partition::Train, &indices)?;

        debug!(size = size, alpha = alpha, beta = beta; "drew prioritized batch");
        Ok(Batch::new(indices, x, y, Array1::from(weights)))
    }

    fn update_priorities(&mut self, indices: &[usize], priorities: &[f64]) -> Result<()> {
        self.store.update_many(indices, priorities)?;
        self.invalidate();

        debug!(updated = indices.len(); "refreshed priorities");
        Ok(())
    }

    fn absorb_new_examples(
        &mut self,
        x_new: ArrayView2<f64>,
        y_new: ArrayView2<f64>,
    ) -> Result<Range<usize>> {
        let seed = self.store.max_priority();
        let range = self.dataset.append_train(x_new, y_new)?;
        let assigned = self.store.extend(range.len());
        debug_assert_eq!(range, assigned, "dataset and priority store out of step");
        self.invalidate();

        info!(
            "absorbed {} new examples at indices {range:?} with priority {seed}",
            range.len()
        );
        Ok(range)
    }

    fn replace_dataset(&mut self, dataset: Dataset) {
        self.store.initialize(dataset.train_len());
        self.dataset = dataset;
        self.invalidate();
    }

    fn dataset(&self) -> &Dataset {
        &self.dataset
    }
}
