mod cross_entropy;
mod mse;

use ndarray::{Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

pub use cross_entropy::{CrossEntropy, binary_cross_entropy};
pub use mse::Mse;

use crate::error::{Result, TrainErr};

/// Offset that keeps predictions away from 0 and 1 before taking logarithms.
pub const DEFAULT_EPS: f64 = 1e-8;

/// A loss function evaluated per example.
pub trait LossFn: Send + Sync {
    /// Returns the elementwise loss between predictions and targets.
    fn elementwise(&self, y_pred: ArrayView2<f64>, y: ArrayView2<f64>) -> Array2<f64>;

    /// Returns the loss of every row, averaged over its target columns.
    ///
    /// # Returns
    /// A `SizeMismatch` error if the shapes differ.
    fn per_example(&self, y_pred: ArrayView2<f64>, y: ArrayView2<f64>) -> Result<Vec<f64>> {
        check_shapes(y_pred, y)?;

        let rows = y.nrows();
        let losses = self
            .elementwise(y_pred, y)
            .mean_axis(Axis(1))
            .map(|m| m.to_vec())
            .unwrap_or_else(|| vec![0.0; rows]);

        Ok(losses)
    }

    /// Returns the loss averaged over rows with the given weights, zero for no weight at all.
    fn weighted_mean(
        &self,
        y_pred: ArrayView2<f64>,
        y: ArrayView2<f64>,
        weights: ArrayView1<f64>,
    ) -> Result<f64> {
        let losses = self.per_example(y_pred, y)?;
        if weights.len() != losses.len() {
            return Err(TrainErr::SizeMismatch {
                a: "weights",
                b: "targets",
                got: weights.len(),
                expected: losses.len(),
            });
        }

        let total = weights.sum();
        if total == 0.0 {
            return Ok(0.0);
        }

        let weighted: f64 = losses.iter().zip(weights).map(|(l, w)| l * w).sum();
        Ok(weighted / total)
    }
}

/// The specification for the `LossFn` trait.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossSpec {
    #[default]
    CrossEntropy,
    Mse,
}

impl LossSpec {
    /// Builds the loss this spec names, `eps` clamping cross entropy predictions.
    pub fn build(self, eps: f64) -> Box<dyn LossFn> {
        match self {
            LossSpec::CrossEntropy => Box::new(CrossEntropy::new(eps)),
            LossSpec::Mse => Box::new(Mse::new()),
        }
    }
}

fn check_shapes(y_pred: ArrayView2<f64>, y: ArrayView2<f64>) -> Result<()> {
    let checks = [
        ("prediction rows", y_pred.nrows(), y.nrows()),
        ("prediction columns", y_pred.ncols(), y.ncols()),
    ];

    for (a, got, expected) in checks {
        if got != expected {
            return Err(TrainErr::SizeMismatch {
                a,
                b: "targets",
                got,
                expected,
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn per_example_averages_columns() {
        let losses = Mse::new()
            .per_example(
                array![[0.0, 1.0], [0.5, 0.5]].view(),
                array![[1.0, 1.0], [0.5, 0.0]].view(),
            )
            .unwrap();

        assert_eq!(losses, vec![0.5, 0.125]);
    }

    #[test]
    fn mismatched_shapes_are_rejected() {
        let err = Mse::new()
            .per_example(array![[0.0, 1.0]].view(), array![[1.0]].view())
            .unwrap_err();

        assert!(matches!(
            err,
            TrainErr::SizeMismatch {
                a: "prediction columns",
                ..
            }
        ));
    }

    #[test]
    fn weighted_mean_uses_the_weights() {
        let loss = Mse::new();
        let y_pred = array![[0.0], [0.0]];
        let y = array![[1.0], [2.0]];

        let mean = loss
            .weighted_mean(y_pred.view(), y.view(), array![1.0, 0.0].view())
            .unwrap();
        assert_eq!(mean, 1.0);

        let mean = loss
            .weighted_mean(y_pred.view(), y.view(), array![1.0, 1.0].view())
            .unwrap();
        assert_eq!(mean, 2.5);

        let mean = loss
            .weighted_mean(y_pred.view(), y.view(), array![0.0, 0.0].view())
            .unwrap();
        assert_eq!(mean, 0.0);
    }

    #[test]
    fn specs_deserialize_from_snake_case() {
        let spec: LossSpec = serde_json::from_str("\"cross_entropy\"").unwrap();
        assert_eq!(spec, LossSpec::CrossEntropy);

        let spec: LossSpec = serde_json::from_str("\"mse\"").unwrap();
        assert_eq!(spec, LossSpec::Mse);
    }
}
