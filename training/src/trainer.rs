use log::{debug, info};
use replay::{ArgumentErr, BatchSource, Partition, ReplayErr};
use serde::{Deserialize, Serialize};

use crate::{
    error::{Result, TrainErr, check_non_negative},
    loss::{DEFAULT_EPS, LossFn, LossSpec},
    model::Model,
    priority::PriorityTransform,
};

/// The parameters of a `Trainer`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub epochs: usize,
    pub batch_size: usize,
    pub loss: LossSpec,
    /// Predictions are clamped to `[eps, 1 - eps]` by the cross entropy loss.
    pub eps: f64,
    pub priority_transform: PriorityTransform,
    /// Added to every transformed loss before it is reported as a priority.
    pub priority_eps: f64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: 100,
            batch_size: 32,
            loss: LossSpec::CrossEntropy,
            eps: DEFAULT_EPS,
            priority_transform: PriorityTransform::Identity,
            priority_eps: 0.0,
        }
    }
}

/// The losses of a single epoch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochReport {
    pub epoch: usize,
    /// Mean per example loss over the sampled train batches, before each batch's update.
    pub train_loss: f64,
    /// Mean per example loss over the validation partition, `None` if it is empty.
    pub val_loss: Option<f64>,
}

/// What a `Trainer::fit` call went through.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FitReport {
    pub epochs: Vec<EpochReport>,
}

impl FitReport {
    pub fn last(&self) -> Option<&EpochReport> {
        self.epochs.last()
    }

    /// Returns the lowest validation loss seen, if any epoch had one.
    pub fn best_val_loss(&self) -> Option<f64> {
        self.epochs
            .iter()
            .filter_map(|e| e.val_loss)
            .min_by(f64::total_cmp)
    }
}

/// Drives a `Model` over the batches of a `BatchSource`, feeding its per example losses back as
/// priorities.
pub struct Trainer {
    config: TrainingConfig,
    loss_fn: Box<dyn LossFn>,
}

impl Trainer {
    /// Creates a new `Trainer`.
    ///
    /// # Returns
    /// `InvalidConfig` if `eps` or `priority_eps` are negative or not finite, and
    /// `InvalidArgument` for a zero batch size.
    pub fn new(config: TrainingConfig) -> Result<Self> {
        check_non_negative("eps", config.eps)?;
        check_non_negative("priority_eps", config.priority_eps)?;

        if config.batch_size == 0 {
            return Err(ReplayErr::from(ArgumentErr::ZeroBatchSize).into());
        }

        Ok(Self {
            loss_fn: config.loss.build(config.eps),
            config,
        })
    }

    #[inline]
    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    #[inline]
    pub fn loss_fn(&self) -> &dyn LossFn {
        self.loss_fn.as_ref()
    }

    /// Fits `model` for the configured amount of epochs.
    ///
    /// Every epoch draws `ceil(N / batch_size)` batches from `source`, `N` being its train size
    /// when the epoch starts. After each batch the per example losses are transformed into
    /// priorities and reported back to `source`.
    ///
    /// # Returns
    /// The train and validation loss of every epoch, or the first error.
    pub fn fit<M>(&self, model: &mut M, source: &mut dyn BatchSource) -> Result<FitReport>
    where
        M: Model + ?Sized,
    {
        let TrainingConfig {
            epochs,
            batch_size,
            priority_transform,
            priority_eps,
            ..
        } = self.config;

        let mut report = FitReport::default();

        for epoch in 0..epochs {
            let n = source.len();
            if n == 0 {
                return Err(ReplayErr::EmptyDataset.into());
            }

            let batches = n.div_ceil(batch_size);
            let mut loss_sum = 0.0;
            let mut seen = 0;

            for _ in 0..batches {
                let batch = source.next_batch(batch_size)?;
                let losses = model.fit_batch(&batch, self.loss_fn())?;

                if losses.len() != batch.len() {
                    return Err(TrainErr::SizeMismatch {
                        a: "losses",
                        b: "batch",
                        got: losses.len(),
                        expected: batch.len(),
                    });
                }

                let priorities = priority_transform.apply_all(&losses, priority_eps);
                source.update_priorities(&batch.indices, &priorities)?;

                loss_sum += losses.iter().sum::<f64>();
                seen += losses.len();
            }

            let train_loss = loss_sum / seen as f64;
            let val_loss = self.evaluate(model, source, Partition::Validation)?;

            debug!(epoch = epoch, batches = batches, train_loss = train_loss; "finished epoch");
            report.epochs.push(EpochReport {
                epoch,
                train_loss,
                val_loss,
            });
        }

        if let Some(last) = report.last() {
            info!(
                "fit {} epochs, final train loss {:.6}, validation loss {:?}",
                epochs, last.train_loss, last.val_loss
            );
        }

        Ok(report)
    }

    /// Computes the mean per example loss of `model` over a whole partition, walking it in order
    /// without importance weights.
    ///
    /// # Returns
    /// `None` if the partition is empty.
    pub fn evaluate<M>(
        &self,
        model: &M,
        source: &dyn BatchSource,
        partition: Partition,
    ) -> Result<Option<f64>>
    where
        M: Model + ?Sized,
    {
        let mut loss_sum = 0.0;
        let mut seen = 0;

        for batch in source.eval_batches(partition, self.config.batch_size)? {
            let y_pred = model.predict(batch.x.view());
            let losses = self.loss_fn.per_example(y_pred.view(), batch.y.view())?;

            loss_sum += losses.iter().sum::<f64>();
            seen += losses.len();
        }

        Ok((seen > 0).then(|| loss_sum / seen as f64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MeanBaseline;
    use ndarray::{Array2, array};
    use replay::{Dataset, DatasetKind, ReplayConfig, build_source};

    fn dataset() -> Dataset {
        Dataset::new(
            Array2::zeros((6, 1)),
            array![[1.0], [0.0], [0.0], [0.0], [0.0], [0.0]],
            Array2::zeros((2, 1)),
            array![[1.0], [0.0]],
        )
        .unwrap()
    }

    fn config(epochs: usize) -> TrainingConfig {
        TrainingConfig {
            epochs,
            batch_size: 4,
            loss: LossSpec::Mse,
            ..TrainingConfig::default()
        }
    }

    #[test]
    fn invalid_configs_are_rejected() {
        let bad_eps = TrainingConfig {
            eps: -1.0,
            ..TrainingConfig::default()
        };
        assert!(matches!(
            Trainer::new(bad_eps),
            Err(TrainErr::InvalidConfig { field: "eps", .. })
        ));

        let zero_batch = TrainingConfig {
            batch_size: 0,
            ..TrainingConfig::default()
        };
        assert!(matches!(
            Trainer::new(zero_batch),
            Err(TrainErr::Replay(ReplayErr::InvalidArgument(
                ArgumentErr::ZeroBatchSize
            )))
        ));
    }

    #[test]
    fn every_epoch_is_reported() {
        let trainer = Trainer::new(config(3)).unwrap();
        let mut model = MeanBaseline::zeros(1);
        let mut source =
            build_source(DatasetKind::Prioritized, dataset(), ReplayConfig::default().with_seed(2))
                .unwrap();

        let report = trainer.fit(&mut model, source.as_mut()).unwrap();

        assert_eq!(report.epochs.len(), 3);
        assert_eq!(report.epochs[2].epoch, 2);
        assert!(report.epochs.iter().all(|e| e.val_loss.is_some()));
        assert!(report.best_val_loss().is_some());
    }

    #[test]
    fn losses_become_priorities() {
        let trainer = Trainer::new(TrainingConfig {
            priority_eps: 0.5,
            ..config(1)
        })
        .unwrap();

        let mut model = MeanBaseline::zeros(1);
        let mut source = replay::PrioritizedDataset::new(
            dataset(),
            ReplayConfig::default().with_seed(11),
        )
        .unwrap();

        trainer.fit(&mut model, &mut source).unwrap();

        // every refreshed priority is a squared error plus the offset
        assert!(source.priorities().get_all().iter().all(|&p| p >= 0.5));
        assert!(source.priorities().get_all().iter().any(|&p| p != 1.0));
    }

    #[test]
    fn evaluation_is_unweighted_over_the_partition() {
        let trainer = Trainer::new(config(1)).unwrap();
        let model = MeanBaseline::new(array![0.5]);
        let source =
            build_source(DatasetKind::Uniform, dataset(), ReplayConfig::default()).unwrap();

        let val = trainer
            .evaluate(&model, source.as_ref(), Partition::Validation)
            .unwrap();
        assert_eq!(val, Some(0.25));

        let empty = Dataset::new(
            Array2::zeros((1, 1)),
            Array2::zeros((1, 1)),
            Array2::zeros((0, 1)),
            Array2::zeros((0, 1)),
        )
        .unwrap();
        let source = build_source(DatasetKind::Uniform, empty, ReplayConfig::default()).unwrap();
        assert_eq!(
            trainer
                .evaluate(&model, source.as_ref(), Partition::Validation)
                .unwrap(),
            None
        );
    }

    #[test]
    fn an_empty_train_partition_fails_the_fit() {
        let trainer = Trainer::new(config(1)).unwrap();
        let empty = Dataset::new(
            Array2::zeros((0, 1)),
            Array2::zeros((0, 1)),
            Array2::zeros((0, 1)),
            Array2::zeros((0, 1)),
        )
        .unwrap();
        let mut source = build_source(DatasetKind::Uniform, empty, ReplayConfig::default()).unwrap();

        assert_eq!(
            trainer.fit(&mut MeanBaseline::zeros(1), source.as_mut()),
            Err(TrainErr::Replay(ReplayErr::EmptyDataset))
        );
    }
}
