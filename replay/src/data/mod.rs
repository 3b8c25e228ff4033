pub mod batch;
pub mod dataset;

pub use batch::{Batch, EvalBatches};
pub use dataset::{Dataset, Normalization, Partition};
