use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use replay::Batch;

use crate::{
    error::{Result, TrainErr},
    loss::LossFn,
};

/// The boundary between the training loop and whatever predicts risk probabilities.
pub trait Model: Send {
    /// Returns the amount of targets the model predicts per example.
    fn output_dim(&self) -> usize;

    /// Fits the model to a single batch, honoring its importance weights.
    ///
    /// # Returns
    /// The loss of every example of the batch, in batch order.
    fn fit_batch(&mut self, batch: &Batch, loss_fn: &dyn LossFn) -> Result<Vec<f64>>;

    /// Predicts the targets of every row of `x`.
    fn predict(&self, x: ArrayView2<f64>) -> Array2<f64>;
}

/// A baseline that always outputs the importance weighted mean of the targets it has seen.
#[derive(Debug, Clone)]
pub struct MeanBaseline {
    weighted_sum: Array1<f64>,
    total_weight: f64,
    mean: Array1<f64>,
}

impl MeanBaseline {
    /// Creates a new `MeanBaseline` predicting `prior` until it sees its first batch.
    pub fn new(prior: Array1<f64>) -> Self {
        Self {
            weighted_sum: Array1::zeros(prior.len()),
            total_weight: 0.0,
            mean: prior,
        }
    }

    /// Creates a new `MeanBaseline` predicting zero for every target.
    pub fn zeros(output_dim: usize) -> Self {
        Self::new(Array1::zeros(output_dim))
    }

    #[inline]
    pub fn mean(&self) -> ArrayView1<'_, f64> {
        self.mean.view()
    }
}

impl Model for MeanBaseline {
    fn output_dim(&self) -> usize {
        self.mean.len()
    }

    fn fit_batch(&mut self, batch: &Batch, loss_fn: &dyn LossFn) -> Result<Vec<f64>> {
        if batch.y.ncols() != self.output_dim() {
            return Err(TrainErr::SizeMismatch {
                a: "batch targets",
                b: "model outputs",
                got: batch.y.ncols(),
                expected: self.output_dim(),
            });
        }

        // losses are measured before the batch moves the mean
        let y_pred = self.predict(batch.x.view());
        let losses = loss_fn.per_example(y_pred.view(), batch.y.view())?;

        let weights = batch.weights.view().insert_axis(Axis(1));
        self.weighted_sum += &(&batch.y * &weights).sum_axis(Axis(0));
        self.total_weight += batch.weights.sum();

        if self.total_weight > 0.0 {
            self.mean = &self.weighted_sum / self.total_weight;
        }

        Ok(losses)
    }

    fn predict(&self, x: ArrayView2<f64>) -> Array2<f64> {
        Array2::from_shape_fn((x.nrows(), self.output_dim()), |(_, j)| self.mean[j])
    }
}
