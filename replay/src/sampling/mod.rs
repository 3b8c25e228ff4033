mod class_weighted;
mod prioritized;
mod uniform;

use std::ops::Range;

use log::info;
use ndarray::ArrayView2;
use rand::{Rng, SeedableRng, rngs::StdRng};

pub use class_weighted::ClassWeightedDataset;
pub use prioritized::PrioritizedDataset;
pub use uniform::UniformDataset;

use crate::{
    config::{DatasetKind, ReplayConfig},
    data::{Batch, Dataset, EvalBatches, Partition},
    error::{ArgumentErr, ReplayErr, Result, check_priority},
};

/// The single entry point a training loop draws its batches from.
///
/// Implementations decide how train batches are sampled and weighted, the caller stays agnostic
/// to whether prioritization is active.
pub trait BatchSource: Send {
    /// Draws a train batch of `size` examples, with replacement.
    ///
    /// # Returns
    /// `EmptyDataset` if the train partition is empty and `InvalidArgument` if `size` is zero.
    fn next_batch(&mut self, size: usize) -> Result<Batch>;

    /// Reports fresh priorities (usually per-example losses) for the given examples.
    ///
    /// # Returns
    /// `InvalidArgument` if the lengths differ, an index is out of range or a priority is
    /// negative or not finite. A failed call changes nothing.
    fn update_priorities(&mut self, indices: &[usize], priorities: &[f64]) -> Result<()>;

    /// Appends newly collected rows to the train partition.
    ///
    /// # Returns
    /// The index range assigned to the new rows.
    fn absorb_new_examples(
        &mut self,
        x_new: ArrayView2<f64>,
        y_new: ArrayView2<f64>,
    ) -> Result<Range<usize>>;

    /// Swaps the whole dataset, resetting any per-example state.
    fn replace_dataset(&mut self, dataset: Dataset);

    fn dataset(&self) -> &Dataset;

    /// Returns the amount of train examples.
    fn len(&self) -> usize {
        self.dataset().train_len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Walks a partition uniformly, without replacement and in index order, with unit weights.
    /// Used for validation and scoring, where importance correction doesn't apply.
    fn eval_batches(&self, partition: Partition, size: usize) -> Result<EvalBatches<'_>> {
        if size == 0 {
            return Err(ArgumentErr::ZeroBatchSize.into());
        }

        Ok(EvalBatches::new(self.dataset(), partition, size))
    }
}

/// Builds the batch source for `kind`.
///
/// # Arguments
/// * `kind` - Which sampling strategy to use.
/// * `dataset` - The dataset to sample from.
/// * `config` - The prioritization parameters and rng seed.
pub fn build_source(
    kind: DatasetKind,
    dataset: Dataset,
    config: ReplayConfig,
) -> Result<Box<dyn BatchSource>> {
    info!(
        "building {kind:?} batch source over {} train examples",
        dataset.train_len()
    );

    let source: Box<dyn BatchSource> = match kind {
        DatasetKind::Uniform => Box::new(UniformDataset::new(dataset, config.seed)),
        DatasetKind::ClassWeighted => Box::new(ClassWeightedDataset::new(dataset, config.seed)),
        DatasetKind::Prioritized => Box::new(PrioritizedDataset::new(dataset, config)?),
    };

    Ok(source)
}

pub(crate) fn generate_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

/// Validates the arguments of a batch request against a train partition of `len` examples.
pub(crate) fn check_request(size: usize, len: usize) -> Result<()> {
    if len == 0 {
        return Err(ReplayErr::EmptyDataset);
    }

    if size == 0 {
        return Err(ArgumentErr::ZeroBatchSize.into());
    }

    Ok(())
}

/// Validates a priority refresh for sources that don't keep priorities.
pub(crate) fn check_refresh(indices: &[usize], priorities: &[f64], len: usize) -> Result<()> {
    if indices.len() != priorities.len() {
        return Err(ArgumentErr::LengthMismatch {
            got: priorities.len(),
            expected: indices.len(),
        }
        .into());
    }

    for (&index, &priority) in indices.iter().zip(priorities) {
        if index >= len {
            return Err(ArgumentErr::IndexOutOfBounds { index, len }.into());
        }

        check_priority(index, priority)?;
    }

    Ok(())
}

pub(crate) fn draw_uniform<R: Rng>(rng: &mut R, len: usize, size: usize) -> Vec<usize> {
    (0..size).map(|_| rng.random_range(0..len)).collect()
}
