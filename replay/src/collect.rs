use std::ops::Range;

use log::info;
use ndarray::{Array2, ArrayView2, Axis, concatenate};
use rayon::prelude::*;

use crate::{
    error::{ArgumentErr, ReplayErr, Result},
    sampling::BatchSource,
};

/// Raw rows produced by one collection worker.
#[derive(Debug, Clone, PartialEq)]
pub struct Collected {
    pub x: Array2<f64>,
    pub y: Array2<f64>,
}

impl Collected {
    #[inline]
    pub fn len(&self) -> usize {
        self.x.nrows()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.x.nrows() == 0
    }
}

/// Produces new examples for a bootstrap round, for instance by simulating driving scenarios.
///
/// Workers only read shared state; their output reaches the dataset after every one of them
/// finished.
pub trait Collector: Sync {
    /// Collects the rows of `scenarios` scenarios for the given worker.
    fn collect(&self, worker_id: usize, scenarios: usize) -> Result<Collected>;
}

impl<F> Collector for F
where
    F: Fn(usize, usize) -> Result<Collected> + Sync,
{
    fn collect(&self, worker_id: usize, scenarios: usize) -> Result<Collected> {
        self(worker_id, scenarios)
    }
}

/// The rows of every worker concatenated in worker order.
#[derive(Debug, Clone, PartialEq)]
pub struct Merged {
    pub rows: Collected,
    /// The rows of worker `k` are `offsets[k]` inside `rows`.
    pub offsets: Vec<Range<usize>>,
}

/// Runs `num_workers` collectors in parallel, joins them and merges their rows.
///
/// Each worker gets `scenarios` scenarios. The merge happens on the calling thread once every
/// worker is done, so worker `k`'s rows always land right after worker `k - 1`'s.
///
/// # Returns
/// `InvalidArgument` for zero workers, the first worker error, or `ShapeMismatch` if the
/// workers disagree on the row width.
pub fn collect_parallel<C: Collector + ?Sized>(
    collector: &C,
    num_workers: usize,
    scenarios: usize,
) -> Result<Merged> {
    if num_workers == 0 {
        return Err(ArgumentErr::ZeroWorkers.into());
    }

    let parts: Vec<Collected> = (0..num_workers)
        .into_par_iter()
        .map(|worker_id| collector.collect(worker_id, scenarios))
        .collect::<Result<_>>()?;

    merge(parts)
}

/// Concatenates worker outputs, assigning each a contiguous and disjoint offset range.
pub fn merge(parts: Vec<Collected>) -> Result<Merged> {
    let mut offsets = Vec::with_capacity(parts.len());
    let mut start = 0;

    for part in &parts {
        if part.x.nrows() != part.y.nrows() {
            return Err(ReplayErr::ShapeMismatch {
                what: "collected targets",
                got: part.y.nrows(),
                expected: part.x.nrows(),
            });
        }

        offsets.push(start..start + part.len());
        start += part.len();
    }

    let stack = |views: Vec<ArrayView2<f64>>, what| {
        concatenate(Axis(0), &views).map_err(|_| ReplayErr::ShapeMismatch {
            what,
            got: views.iter().map(|v| v.ncols()).max().unwrap_or_default(),
            expected: views.iter().map(|v| v.ncols()).min().unwrap_or_default(),
        })
    };

    let rows = match parts.as_slice() {
        [] => Collected {
            x: Array2::zeros((0, 0)),
            y: Array2::zeros((0, 0)),
        },
        _ => Collected {
            x: stack(parts.iter().map(|p| p.x.view()).collect(), "collected features")?,
            y: stack(parts.iter().map(|p| p.y.view()).collect(), "collected targets")?,
        },
    };

    Ok(Merged { rows, offsets })
}

/// Collects a bootstrap round in parallel and absorbs the merged rows into `source` in a single
/// call.
///
/// # Returns
/// The dataset indices assigned to each worker's rows.
pub fn collect_into<C: Collector + ?Sized>(
    source: &mut dyn BatchSource,
    collector: &C,
    num_workers: usize,
    scenarios: usize,
) -> Result<Vec<Range<usize>>> {
    let merged = collect_parallel(collector, num_workers, scenarios)?;
    if merged.rows.is_empty() {
        info!("collection round produced no examples");
        return Ok(merged.offsets);
    }

    let range = source.absorb_new_examples(merged.rows.x.view(), merged.rows.y.view())?;
    let ranges = merged
        .offsets
        .into_iter()
        .map(|r| r.start + range.start..r.end + range.start)
        .collect();

    Ok(ranges)
}
