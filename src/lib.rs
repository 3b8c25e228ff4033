//! Trains driving-risk event predictors with prioritized replay and iterative bootstrapping.
//!
//! The sampling machinery lives in the `replay` crate and the fit loops in `training`; this crate
//! reads a run configuration, prepares the dataset, simulates scenarios and wires them together.

pub mod config;
pub mod synthetic;

use log::info;
use ndarray::{Array1, Array2, s};
use rand::{SeedableRng, rngs::StdRng};
use replay::{
    ArgumentErr, Collected, Collector, Dataset, Partition, ReplayErr, build_source,
    data::Normalization,
};
use training::{Bootstrap, MeanBaseline, Model, RoundReport, Score, Trainer, regression_score};

pub use config::{DataSource, DatasetConfig, RunConfig};
pub use synthetic::{SyntheticConfig, SyntheticScenarios};

/// The outcome of a whole run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub rounds: Vec<RoundReport>,
    /// Final scores per partition, `None` for an empty partition.
    pub train: Option<Score>,
    pub validation: Option<Score>,
    pub train_len: usize,
}

/// The transformations applied to the initial dataset, replayed on every collected row.
#[derive(Debug, Clone, Default)]
pub struct Preparation {
    pub target_index: Option<usize>,
    pub normalization: Option<Normalization>,
}

impl Preparation {
    /// Applies the target selection and the feature normalization to collected rows.
    pub fn apply(&self, mut rows: Collected) -> replay::Result<Collected> {
        if let Some(index) = self.target_index {
            let len = rows.y.ncols();
            if index >= len {
                return Err(ArgumentErr::IndexOutOfBounds { index, len }.into());
            }

            rows.y = rows.y.slice(s![.., index..index + 1]).to_owned();
        }

        if let Some(normalization) = &self.normalization {
            let expected = normalization.mean.len();
            if rows.x.ncols() != expected {
                return Err(ReplayErr::ShapeMismatch {
                    what: "collected features",
                    got: rows.x.ncols(),
                    expected,
                });
            }

            normalization.apply(&mut rows.x);
        }

        Ok(rows)
    }
}

/// A collector whose rows go through a `Preparation` before they are merged.
pub struct Prepared<'a, C: ?Sized> {
    inner: &'a C,
    preparation: &'a Preparation,
}

impl<'a, C: Collector + ?Sized> Prepared<'a, C> {
    pub fn new(inner: &'a C, preparation: &'a Preparation) -> Self {
        Self { inner, preparation }
    }
}

impl<C: Collector + ?Sized> Collector for Prepared<'_, C> {
    fn collect(&self, worker_id: usize, scenarios: usize) -> replay::Result<Collected> {
        let rows = self.inner.collect(worker_id, scenarios)?;
        self.preparation.apply(rows)
    }
}

/// Builds the initial dataset of a run.
///
/// The rows are split (after an optional seeded shuffle), reduced to the selected target,
/// truncated for debugging and finally normalized with the train statistics.
pub fn prepare_dataset(
    config: &DatasetConfig,
    x: Array2<f64>,
    y: Array2<f64>,
    rng: &mut StdRng,
) -> anyhow::Result<(Dataset, Preparation)> {
    let mut dataset = Dataset::split(x, y, config.train_split, config.shuffle.then_some(rng))?;

    if let Some(index) = config.target_index {
        dataset = dataset.select_target(index)?;
    }

    if let Some(size) = config.debug_size {
        dataset = dataset.truncate(size);
    }

    let normalization = if config.normalize {
        dataset.normalize()
    } else {
        None
    };

    let preparation = Preparation {
        target_index: config.target_index,
        normalization,
    };

    Ok((dataset, preparation))
}

/// Runs a whole training session: builds the dataset and batch source, fits a mean baseline
/// through every bootstrap round and scores it on both partitions.
pub fn run(config: &RunConfig) -> anyhow::Result<RunReport> {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let scenarios =
        SyntheticScenarios::new(config.collector, config.bootstrap.num_proc, config.seed)?;

    let (x, y) = match &config.dataset.source {
        DataSource::Synthetic { scenarios: n } => {
            let rows = scenarios.simulate(&mut rng, *n);
            (rows.x, rows.y)
        }
        DataSource::Inline {
            data,
            x_size,
            y_size,
        } => DataSource::inline_rows(data, *x_size, *y_size)?,
    };

    let (dataset, preparation) = prepare_dataset(&config.dataset, x, y, &mut rng)?;
    info!(
        "loaded {} train and {} validation examples with {} features and {} targets",
        dataset.train_len(),
        dataset.val_len(),
        dataset.input_dim(),
        dataset.output_dim()
    );

    let y_null = dataset
        .target_means(Partition::Train)
        .unwrap_or_else(|| Array1::zeros(dataset.output_dim()));

    let trainer = Trainer::new(config.training)?;
    let mut model = MeanBaseline::new(y_null.clone());
    let mut source = build_source(config.kind, dataset, config.replay_config())?;

    let rounds = if config.bootstrap.iterations == 0 {
        let fit = trainer.fit(&mut model, source.as_mut())?;
        vec![RoundReport {
            iteration: 0,
            fit,
            absorbed: 0,
            train_len: source.len(),
        }]
    } else {
        let collector = Prepared::new(&scenarios, &preparation);
        Bootstrap::new(config.bootstrap).run(&trainer, &mut model, source.as_mut(), &collector)?
    };

    let score = |partition: Partition| -> anyhow::Result<Option<Score>> {
        let dataset = source.dataset();
        if dataset.len(partition) == 0 {
            return Ok(None);
        }

        let y_pred = model.predict(dataset.x(partition));
        let score = regression_score(
            dataset.y(partition),
            y_pred.view(),
            Some(y_null.view()),
            config.training.eps,
        )?;

        info!(
            "{partition:?} cross entropy {:.6}, mse {:.6}, r2 {:?}, worst examples {} and {}",
            score.cross_entropy, score.mse, score.r2, score.worst_cross_entropy, score.worst_mse
        );
        Ok(Some(score))
    };

    let train = score(Partition::Train)?;
    let validation = score(Partition::Validation)?;

    Ok(RunReport {
        rounds,
        train,
        validation,
        train_len: source.len(),
    })
}
