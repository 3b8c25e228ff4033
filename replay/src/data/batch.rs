use ndarray::{Array1, Array2, s};

use super::{Dataset, Partition};

/// An owned mini-batch: the drawn example indices, their rows and their importance weights.
///
/// Rows are aligned, the `k`-th row of `x`, `y` and `weights` belongs to `indices[k]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub indices: Vec<usize>,
    pub x: Array2<f64>,
    pub y: Array2<f64>,
    pub weights: Array1<f64>,
}

impl Batch {
    /// # Panics
    /// - if the rows of `x`, `y` or `weights` don't match the amount of indices
    pub fn new(indices: Vec<usize>, x: Array2<f64>, y: Array2<f64>, weights: Array1<f64>) -> Self {
        let n = indices.len();
        assert_eq!(x.nrows(), n, "x must have one row per index");
        assert_eq!(y.nrows(), n, "y must have one row per index");
        assert_eq!(weights.len(), n, "weights must have one entry per index");

        Self {
            indices,
            x,
            y,
            weights,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Walks a partition in index order, without replacement, yielding unweighted batches.
///
/// The last batch is smaller when the partition size isn't a multiple of the batch size.
#[derive(Debug, Clone)]
pub struct EvalBatches<'a> {
    dataset: &'a Dataset,
    partition: Partition,
    batch_size: usize,
    cursor: usize,
}

impl<'a> EvalBatches<'a> {
    /// # Panics
    /// - if `batch_size` is zero
    pub fn new(dataset: &'a Dataset, partition: Partition, batch_size: usize) -> Self {
        assert!(batch_size > 0, "batch_size must be > 0");

        Self {
            dataset,
            partition,
            batch_size,
            cursor: 0,
        }
    }
}

impl Iterator for EvalBatches<'_> {
    type Item = Batch;

    fn next(&mut self) -> Option<Self::Item> {
        let len = self.dataset.len(self.partition);
        if self.cursor >= len {
            return None;
        }

        let end = (self.cursor + self.batch_size).min(len);
        let range = self.cursor..end;
        self.cursor = end;

        let x = self.dataset.x(self.partition).slice(s![range.clone(), ..]).to_owned();
        let y = self.dataset.y(self.partition).slice(s![range.clone(), ..]).to_owned();
        let weights = Array1::ones(range.len());

        Some(Batch::new(range.collect(), x, y, weights))
    }
}
