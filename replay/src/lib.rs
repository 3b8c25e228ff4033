//! Prioritized replay over a driving-risk dataset.
//!
//! A [`PrioritizedDataset`] keeps one priority per train example, samples mini-batches
//! proportionally to `priority^alpha` and corrects the resulting bias with importance weights
//! `(1 / (N * P(i)))^beta`. The uniform and class-weighted sources implement the same
//! [`BatchSource`] interface so a training loop can swap them without changes.

pub mod collect;
pub mod config;
pub mod data;
pub mod error;
pub mod priority;
pub mod sampling;

pub use collect::{Collected, Collector, collect_into, collect_parallel};
pub use config::{DatasetKind, ReplayConfig, WeightNormalization};
pub use data::{Batch, Dataset, EvalBatches, Partition};
pub use error::{ArgumentErr, ReplayErr, Result};
pub use priority::{PriorityStore, SamplingDistribution};
pub use sampling::{
    BatchSource, ClassWeightedDataset, PrioritizedDataset, UniformDataset, build_source,
};
