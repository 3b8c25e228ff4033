use serde::{Deserialize, Serialize};

/// Maps a per-example loss to the priority reported to the batch source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityTransform {
    #[default]
    Identity,
    Abs,
    Sqrt,
}

impl PriorityTransform {
    /// Returns the priority for `loss`, offset by `eps` so that no example reaches zero.
    pub fn apply(self, loss: f64, eps: f64) -> f64 {
        let priority = match self {
            PriorityTransform::Identity => loss,
            PriorityTransform::Abs => loss.abs(),
            PriorityTransform::Sqrt => loss.abs().sqrt(),
        };

        priority + eps
    }

    /// Applies the transform to every loss.
    pub fn apply_all(self, losses: &[f64], eps: f64) -> Vec<f64> {
        losses.iter().map(|&l| self.apply(l, eps)).collect()
    }
}
