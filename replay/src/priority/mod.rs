mod distribution;
mod store;

pub use distribution::SamplingDistribution;
pub use store::{DEFAULT_PRIORITY, PriorityStore};
