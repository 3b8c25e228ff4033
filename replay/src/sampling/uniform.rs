use std::ops::Range;

use ndarray::{Array1, ArrayView2};
use rand::rngs::StdRng;

use super::{BatchSource, check_refresh, check_request, draw_uniform, generate_rng};
use crate::{
    data::{Batch, Dataset, Partition},
    error::Result,
};

/// Draws every train example with the same probability and unit weight.
#[derive(Debug, Clone)]
pub struct UniformDataset {
    dataset: Dataset,
    rng: StdRng,
}

impl UniformDataset {
    /// Creates a new `UniformDataset`.
    ///
    /// # Arguments
    /// * `dataset` - The dataset to sample from.
    /// * `seed` - The rng seed, `None` seeds from the os.
    pub fn new(dataset: Dataset, seed: Option<u64>) -> Self {
        Self {
            dataset,
            rng: generate_rng(seed),
        }
    }
}

impl BatchSource for UniformDataset {
    fn next_batch(&mut self, size: usize) -> Result<Batch> {
        let len = self.dataset.train_len();
        check_request(size, len)?;

        let indices = draw_uniform(&mut self.rng, len, size);
        let (x, y) = self.dataset.gather(Partition::Train, &indices)?;
        Ok(Batch::new(indices, x, y, Array1::ones(size)))
    }

    fn update_priorities(&mut self, indices: &[usize], priorities: &[f64]) -> Result<()> {
        check_refresh(indices, priorities, self.dataset.train_len())
    }

    fn absorb_new_examples(
        &mut self,
        x_new: ArrayView2<f64>,
        y_new: ArrayView2<f64>,
    ) -> Result<Range<usize>> {
        self.dataset.append_train(x_new, y_new)
    }

    fn replace_dataset(&mut self, dataset: Dataset) {
        self.dataset = dataset;
    }

    fn dataset(&self) -> &Dataset {
        &self.dataset
    }
}
