use ndarray::{Array2, ArrayView2};

use super::LossFn;

/// Mean squared error loss function.
#[derive(Debug, Default, Clone, Copy)]
pub struct Mse;

impl Mse {
    /// Returns a new `Mse`.
    pub fn new() -> Self {
        Self
    }
}

impl LossFn for Mse {
    fn elementwise(&self, y_pred: ArrayView2<f64>, y: ArrayView2<f64>) -> Array2<f64> {
        (&y_pred - &y).mapv(|x| x.powi(2))
    }
}
