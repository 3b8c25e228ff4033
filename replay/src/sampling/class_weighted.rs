use std::ops::Range;

use ndarray::{Array1, ArrayView2};
use rand::rngs::StdRng;

use super::{BatchSource, check_refresh, check_request, draw_uniform, generate_rng};
use crate::{
    data::{Batch, Dataset, Partition},
    error::Result,
};

/// Targets at or above this value count as the positive class.
const POSITIVE_THRESHOLD: f64 = 0.5;

/// Draws examples uniformly but weights them so that both classes of every target contribute
/// equally to the loss.
#[derive(Debug, Clone)]
pub struct ClassWeightedDataset {
    dataset: Dataset,
    weights: Vec<f64>,
    rng: StdRng,
}

impl ClassWeightedDataset {
    /// Creates a new `ClassWeightedDataset`.
    ///
    /// # Arguments
    /// * `dataset` - The dataset to sample from.
    /// * `seed` - The rng seed, `None` seeds from the os.
    pub fn new(dataset: Dataset, seed: Option<u64>) -> Self {
        let weights = class_weights(dataset.y(Partition::Train));

        Self {
            dataset,
            weights,
            rng: generate_rng(seed),
        }
    }

    /// Returns the loss weight of every train example.
    #[inline]
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }
}

/// Computes balanced class weights.
///
/// For each target column the weight of an example is `n / (2 * n_c)`, `n_c` being the size of
/// its class in that column. An example's weight is the mean over columns, scaled so that the
/// largest one is one.
pub fn class_weights(y: ArrayView2<f64>) -> Vec<f64> {
    let n = y.nrows();
    if n == 0 || y.ncols() == 0 {
        return vec![1.0; n];
    }

    let mut weights = vec![0.0; n];

    for column in y.columns() {
        let positives = column.iter().filter(|&&v| v >= POSITIVE_THRESHOLD).count();
        let negatives = n - positives;
        let balanced = |count: usize| n as f64 / (2 * count) as f64;

        for (w, &v) in weights.iter_mut().zip(column.iter()) {
            // the example itself is in its class, so the count is never zero here
            *w += if v >= POSITIVE_THRESHOLD {
                balanced(positives)
            } else {
                balanced(negatives)
            };
        }
    }

    let max = weights.iter().copied().fold(0.0, f64::max);
    weights.iter_mut().for_each(|w| *w /= max);
    weights
}

impl BatchSource for ClassWeightedDataset {
    fn next_batch(&mut self, size: usize) -> Result<Batch> {
        let len = self.dataset.train_len();
        check_request(size, len)?;

        let indices = draw_uniform(&mut self.rng, len, size);
        let (x, y) = self.dataset.gather(Partition::Train, &indices)?;
        let weights: Array1<f64> = indices.iter().map(|&i| self.weights[i]).collect();

        Ok(Batch::new(indices, x, y, weights))
    }

    fn update_priorities(&mut self, indices: &[usize], priorities: &[f64]) -> Result<()> {
        check_refresh(indices, priorities, self.dataset.train_len())
    }

    fn absorb_new_examples(
        &mut self,
        x_new: ArrayView2<f64>,
        y_new: ArrayView2<f64>,
    ) -> Result<Range<usize>> {
        let range = self.dataset.append_train(x_new, y_new)?;
        self.weights = class_weights(self.dataset.y(Partition::Train));
        Ok(range)
    }

    fn replace_dataset(&mut self, dataset: Dataset) {
        self.weights = class_weights(dataset.y(Partition::Train));
        self.dataset = dataset;
    }

    fn dataset(&self) -> &Dataset {
        &self.dataset
    }
}
