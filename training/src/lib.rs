//! Training side of prioritized replay: the model boundary, per example losses, scoring and the
//! fit and bootstrap loops that report losses back to a `replay::BatchSource`.

pub mod bootstrap;
pub mod error;
pub mod loss;
pub mod model;
pub mod priority;
pub mod score;
pub mod trainer;

pub use bootstrap::{Bootstrap, BootstrapConfig, RoundReport};
pub use error::{Result, TrainErr};
pub use loss::{CrossEntropy, DEFAULT_EPS, LossFn, LossSpec, Mse};
pub use model::{MeanBaseline, Model};
pub use priority::PriorityTransform;
pub use score::{ClassificationScore, Score, regression_score};
pub use trainer::{EpochReport, FitReport, Trainer, TrainingConfig};
