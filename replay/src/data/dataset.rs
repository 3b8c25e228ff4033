use std::ops::Range;

use ndarray::{Array1, Array2, ArrayBase, ArrayView2, Axis, Data, Ix2, s};
use rand::{Rng, seq::SliceRandom};

use crate::error::{ArgumentErr, ReplayErr, Result};

/// The two partitions of a `Dataset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Partition {
    Train,
    Validation,
}

/// An immutable, already split table of feature and target rows.
///
/// Only the train partition can grow, through `append_train`, when a bootstrap
/// round collects new examples.
#[derive(Debug, Clone)]
pub struct Dataset {
    x_train: Array2<f64>,
    y_train: Array2<f64>,
    x_val: Array2<f64>,
    y_val: Array2<f64>,
}

/// Feature statistics used to normalize a dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalization {
    pub mean: Array1<f64>,
    pub std: Array1<f64>,
}

impl Normalization {
    /// Normalizes `x` in place with these statistics.
    pub fn apply(&self, x: &mut Array2<f64>) {
        *x -= &self.mean;
        *x /= &self.std;
    }

    /// Undoes `apply` on `x` in place.
    pub fn invert(&self, x: &mut Array2<f64>) {
        *x *= &self.std;
        *x += &self.mean;
    }
}

impl Dataset {
    /// Creates a new `Dataset` from its four matrices.
    ///
    /// # Arguments
    /// * `x_train` - The train features, one example per row.
    /// * `y_train` - The train targets, one example per row.
    /// * `x_val` - The validation features.
    /// * `y_val` - The validation targets.
    ///
    /// # Returns
    /// A `ShapeMismatch` error if the row counts of a partition or the column counts across
    /// partitions differ.
    pub fn new(
        x_train: Array2<f64>,
        y_train: Array2<f64>,
        x_val: Array2<f64>,
        y_val: Array2<f64>,
    ) -> Result<Self> {
        check_rows("train targets", &x_train, &y_train)?;
        check_rows("validation targets", &x_val, &y_val)?;
        check_cols("validation features", x_val.ncols(), x_train.ncols())?;
        check_cols("validation targets", y_val.ncols(), y_train.ncols())?;

        Ok(Self {
            x_train,
            y_train,
            x_val,
            y_val,
        })
    }

    /// Splits a single table into train and validation partitions.
    ///
    /// # Arguments
    /// * `x` - All the features.
    /// * `y` - All the targets.
    /// * `train_split` - The fraction of rows that go to the train partition.
    /// * `rng` - When given, the rows are shuffled before splitting.
    pub fn split<R: Rng>(
        x: Array2<f64>,
        y: Array2<f64>,
        train_split: f64,
        rng: Option<&mut R>,
    ) -> Result<Self> {
        if !(0.0..=1.0).contains(&train_split) {
            return Err(ArgumentErr::InvalidSplit(train_split).into());
        }

        check_rows("targets", &x, &y)?;

        let n = x.nrows();
        let (x, y) = match rng {
            Some(rng) => {
                let mut order: Vec<usize> = (0..n).collect();
                order.shuffle(rng);
                (x.select(Axis(0), &order), y.select(Axis(0), &order))
            }
            None => (x, y),
        };

        let n_train = (n as f64 * train_split) as usize;

        Self::new(
            x.slice(s![..n_train, ..]).to_owned(),
            y.slice(s![..n_train, ..]).to_owned(),
            x.slice(s![n_train.., ..]).to_owned(),
            y.slice(s![n_train.., ..]).to_owned(),
        )
    }

    /// Normalizes the features of both partitions with the train mean and standard deviation.
    ///
    /// Constant features keep a standard deviation of one so they map to zero.
    ///
    /// # Returns
    /// The statistics used, or `None` if the train partition is empty.
    pub fn normalize(&mut self) -> Option<Normalization> {
        let mean = self.x_train.mean_axis(Axis(0))?;
        let std = self
            .x_train
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s > f64::EPSILON { s } else { 1.0 });

        let normalization = Normalization { mean, std };
        normalization.apply(&mut self.x_train);
        normalization.apply(&mut self.x_val);

        Some(normalization)
    }

    /// Keeps a single target column, dropping the others.
    pub fn select_target(self, index: usize) -> Result<Self> {
        let len = self.output_dim();
        if index >= len {
            return Err(ArgumentErr::IndexOutOfBounds { index, len }.into());
        }

        Ok(Self {
            y_train: self.y_train.slice(s![.., index..index + 1]).to_owned(),
            y_val: self.y_val.slice(s![.., index..index + 1]).to_owned(),
            ..self
        })
    }

    /// Keeps at most `size` rows of each partition, for quick debugging runs.
    pub fn truncate(self, size: usize) -> Self {
        let train = size.min(self.train_len());
        let val = size.min(self.val_len());

        Self {
            x_train: self.x_train.slice(s![..train, ..]).to_owned(),
            y_train: self.y_train.slice(s![..train, ..]).to_owned(),
            x_val: self.x_val.slice(s![..val, ..]).to_owned(),
            y_val: self.y_val.slice(s![..val, ..]).to_owned(),
        }
    }

    #[inline]
    pub fn train_len(&self) -> usize {
        self.x_train.nrows()
    }

    #[inline]
    pub fn val_len(&self) -> usize {
        self.x_val.nrows()
    }

    #[inline]
    pub fn len(&self, partition: Partition) -> usize {
        match partition {
            Partition::Train => self.train_len(),
            Partition::Validation => self.val_len(),
        }
    }

    #[inline]
    pub fn input_dim(&self) -> usize {
        self.x_train.ncols()
    }

    #[inline]
    pub fn output_dim(&self) -> usize {
        self.y_train.ncols()
    }

    #[inline]
    pub fn x(&self, partition: Partition) -> ArrayView2<'_, f64> {
        match partition {
            Partition::Train => self.x_train.view(),
            Partition::Validation => self.x_val.view(),
        }
    }

    #[inline]
    pub fn y(&self, partition: Partition) -> ArrayView2<'_, f64> {
        match partition {
            Partition::Train => self.y_train.view(),
            Partition::Validation => self.y_val.view(),
        }
    }

    /// Returns the mean of every target column of a partition, `None` if it is empty.
    pub fn target_means(&self, partition: Partition) -> Option<Array1<f64>> {
        self.y(partition).mean_axis(Axis(0))
    }

    /// Gathers the rows at `indices`, repetitions included.
    ///
    /// # Returns
    /// An error if any index is out of bounds.
    pub fn gather(
        &self,
        partition: Partition,
        indices: &[usize],
    ) -> Result<(Array2<f64>, Array2<f64>)> {
        let len = self.len(partition);
        if let Some(&index) = indices.iter().find(|&&i| i >= len) {
            return Err(ArgumentErr::IndexOutOfBounds { index, len }.into());
        }

        let x = self.x(partition).select(Axis(0), indices);
        let y = self.y(partition).select(Axis(0), indices);
        Ok((x, y))
    }

    /// Appends new rows to the train partition.
    ///
    /// Both matrices are checked before anything is appended, a failed call leaves the dataset
    /// untouched.
    ///
    /// # Returns
    /// The index range the new rows were assigned.
    pub fn append_train(
        &mut self,
        x_new: ArrayView2<f64>,
        y_new: ArrayView2<f64>,
    ) -> Result<Range<usize>> {
        check_rows("new targets", &x_new, &y_new)?;
        check_cols("new features", x_new.ncols(), self.input_dim())?;
        check_cols("new targets", y_new.ncols(), self.output_dim())?;

        let start = self.train_len();
        let shape_err = |what| ReplayErr::ShapeMismatch {
            what,
            got: x_new.nrows(),
            expected: y_new.nrows(),
        };

        self.x_train
            .append(Axis(0), x_new)
            .map_err(|_| shape_err("train features"))?;
        self.y_train
            .append(Axis(0), y_new)
            .map_err(|_| shape_err("train targets"))?;

        Ok(start..self.train_len())
    }
}

fn check_rows<A, B>(what: &'static str, x: &ArrayBase<A, Ix2>, y: &ArrayBase<B, Ix2>) -> Result<()>
where
    A: Data<Elem = f64>,
    B: Data<Elem = f64>,
{
    if x.nrows() != y.nrows() {
        return Err(ReplayErr::ShapeMismatch {
            what,
            got: y.nrows(),
            expected: x.nrows(),
        });
    }

    Ok(())
}

fn check_cols(what: &'static str, got: usize, expected: usize) -> Result<()> {
    if got != expected {
        return Err(ReplayErr::ShapeMismatch {
            what,
            got,
            expected,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::{SeedableRng, rngs::StdRng};

    fn small() -> Dataset {
        Dataset::new(
            array![[1.0, 10.0], [2.0, 20.0], [3.0, 30.0]],
            array![[0.0, 1.0], [1.0, 0.0], [0.0, 0.0]],
            array![[4.0, 40.0]],
            array![[1.0, 1.0]],
        )
        .unwrap()
    }

    #[test]
    fn mismatched_rows_are_rejected() {
        let err = Dataset::new(
            array![[1.0], [2.0]],
            array![[0.0]],
            Array2::zeros((0, 1)),
            Array2::zeros((0, 1)),
        )
        .unwrap_err();

        assert_eq!(
            err,
            ReplayErr::ShapeMismatch {
                what: "train targets",
                got: 1,
                expected: 2
            }
        );
    }

    #[test]
    fn mismatched_validation_columns_are_rejected() {
        let err = Dataset::new(
            array![[1.0, 2.0]],
            array![[0.0]],
            array![[1.0]],
            array![[0.0]],
        )
        .unwrap_err();

        assert!(matches!(err, ReplayErr::ShapeMismatch { what: "validation features", .. }));
    }

    #[test]
    fn gather_keeps_order_and_repetitions() {
        let ds = small();
        let (x, y) = ds.gather(Partition::Train, &[2, 0, 2]).unwrap();

        assert_eq!(x, array![[3.0, 30.0], [1.0, 10.0], [3.0, 30.0]]);
        assert_eq!(y, array![[0.0, 0.0], [0.0, 1.0], [0.0, 0.0]]);
        assert!(ds.gather(Partition::Validation, &[1]).is_err());
    }

    #[test]
    fn append_train_assigns_the_next_indices() {
        let mut ds = small();
        let range = ds
            .append_train(
                array![[5.0, 50.0], [6.0, 60.0]].view(),
                array![[1.0, 1.0], [0.0, 1.0]].view(),
            )
            .unwrap();

        assert_eq!(range, 3..5);
        assert_eq!(ds.train_len(), 5);
        assert_eq!(ds.x(Partition::Train).row(4).to_vec(), vec![6.0, 60.0]);
        assert_eq!(ds.val_len(), 1);
    }

    #[test]
    fn append_train_with_wrong_width_changes_nothing() {
        let mut ds = small();
        let res = ds.append_train(array![[5.0]].view(), array![[1.0, 1.0]].view());

        assert!(res.is_err());
        assert_eq!(ds.train_len(), 3);
    }

    #[test]
    fn split_respects_the_ratio() {
        let x = Array2::from_shape_fn((10, 2), |(i, j)| (i * 2 + j) as f64);
        let y = Array2::from_shape_fn((10, 1), |(i, _)| i as f64);

        let ds = Dataset::split(x.clone(), y.clone(), 0.9, None::<&mut StdRng>).unwrap();
        assert_eq!(ds.train_len(), 9);
        assert_eq!(ds.val_len(), 1);
        assert_eq!(ds.y(Partition::Validation)[[0, 0]], 9.0);

        let mut rng = StdRng::seed_from_u64(7);
        let shuffled = Dataset::split(x, y, 0.5, Some(&mut rng)).unwrap();
        assert_eq!(shuffled.train_len(), 5);

        let mut seen: Vec<f64> = shuffled
            .y(Partition::Train)
            .iter()
            .chain(shuffled.y(Partition::Validation).iter())
            .copied()
            .collect();
        seen.sort_by(f64::total_cmp);
        assert_eq!(seen, (0..10).map(|i| i as f64).collect::<Vec<_>>());

        let bad_split = Dataset::split(
            Array2::zeros((1, 1)),
            Array2::zeros((1, 1)),
            1.5,
            None::<&mut StdRng>,
        );
        assert!(bad_split.is_err());
    }

    #[test]
    fn normalize_uses_train_statistics() {
        let mut ds = small();
        let norm = ds.normalize().unwrap();

        assert_eq!(norm.mean, array![2.0, 20.0]);
        let col = ds.x(Partition::Train).column(0).to_owned();
        assert!((col.sum()).abs() < 1e-12);

        let mut x_val = ds.x(Partition::Validation).to_owned();
        norm.invert(&mut x_val);
        assert!((x_val[[0, 0]] - 4.0).abs() < 1e-12);
        assert!((x_val[[0, 1]] - 40.0).abs() < 1e-9);
    }

    #[test]
    fn select_target_and_truncate() {
        let ds = small().select_target(1).unwrap();
        assert_eq!(ds.output_dim(), 1);
        assert_eq!(ds.y(Partition::Train).column(0).to_vec(), vec![1.0, 0.0, 0.0]);

        let ds = ds.truncate(2);
        assert_eq!(ds.train_len(), 2);
        assert_eq!(ds.val_len(), 1);

        assert!(small().select_target(2).is_err());
    }

    #[test]
    fn target_means_per_partition() {
        let ds = small();
        let means = ds.target_means(Partition::Train).unwrap();
        assert!((means[0] - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(ds.target_means(Partition::Validation).unwrap(), array![1.0, 1.0]);
    }
}
