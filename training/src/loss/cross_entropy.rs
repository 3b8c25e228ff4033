use ndarray::{Array2, ArrayView2, Zip};

use super::{DEFAULT_EPS, LossFn};

/// Binary cross entropy, every target column being an independent event probability.
#[derive(Debug, Clone, Copy)]
pub struct CrossEntropy {
    eps: f64,
}

impl Default for CrossEntropy {
    fn default() -> Self {
        Self::new(DEFAULT_EPS)
    }
}

impl CrossEntropy {
    /// Returns a new `CrossEntropy`.
    ///
    /// # Arguments
    /// * `eps` - Predictions are clamped to `[eps, 1 - eps]`.
    pub fn new(eps: f64) -> Self {
        Self { eps }
    }

    #[inline]
    pub fn eps(&self) -> f64 {
        self.eps
    }
}

/// Returns `-(y ln p + (1 - y) ln(1 - p))` with `p` clamped to `[eps, 1 - eps]`.
pub fn binary_cross_entropy(p: f64, y: f64, eps: f64) -> f64 {
    let p = p.clamp(eps, 1.0 - eps);
    -(y * p.ln() + (1.0 - y) * (1.0 - p).ln())
}

impl LossFn for CrossEntropy {
    fn elementwise(&self, y_pred: ArrayView2<f64>, y: ArrayView2<f64>) -> Array2<f64> {
        Zip::from(y_pred)
            .and(y)
            .map_collect(|&p, &t| binary_cross_entropy(p, t, self.eps))
    }
}
