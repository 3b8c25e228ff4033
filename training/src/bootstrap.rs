use log::info;
use replay::{BatchSource, Collector, collect_into};
use serde::{Deserialize, Serialize};

use crate::{
    error::Result,
    model::Model,
    trainer::{FitReport, Trainer},
};

/// The parameters of a `Bootstrap`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    /// Rounds of fitting and then collecting new examples.
    pub iterations: usize,
    /// Collection workers per round.
    pub num_proc: usize,
    /// Scenarios every worker collects per round.
    pub num_scenarios: usize,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            iterations: 10,
            num_proc: 1,
            num_scenarios: 1,
        }
    }
}

/// The outcome of a single bootstrap round.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundReport {
    pub iteration: usize,
    pub fit: FitReport,
    /// Examples absorbed after the fit.
    pub absorbed: usize,
    /// Train examples once the round finished.
    pub train_len: usize,
}

/// Alternates fitting a model with collecting fresh examples into its batch source.
#[derive(Debug, Clone, Copy, Default)]
pub struct Bootstrap {
    config: BootstrapConfig,
}

impl Bootstrap {
    /// Creates a new `Bootstrap`.
    pub fn new(config: BootstrapConfig) -> Self {
        Self { config }
    }

    /// Runs every round: fit `model` on `source`, then collect in parallel and absorb the merged
    /// rows in a single call.
    ///
    /// # Returns
    /// One report per round, or the first error.
    pub fn run<M, C>(
        &self,
        trainer: &Trainer,
        model: &mut M,
        source: &mut dyn BatchSource,
        collector: &C,
    ) -> Result<Vec<RoundReport>>
    where
        M: Model + ?Sized,
        C: Collector + ?Sized,
    {
        let BootstrapConfig {
            iterations,
            num_proc,
            num_scenarios,
        } = self.config;

        let mut reports = Vec::with_capacity(iterations);

        for iteration in 0..iterations {
            let fit = trainer.fit(model, source)?;
            let ranges = collect_into(source, collector, num_proc, num_scenarios)?;
            let absorbed = ranges.iter().map(|r| r.len()).sum();

            info!(
                "bootstrap round {}/{iterations} absorbed {absorbed} examples, {} in total",
                iteration + 1,
                source.len()
            );

            reports.push(RoundReport {
                iteration,
                fit,
                absorbed,
                train_len: source.len(),
            });
        }

        Ok(reports)
    }
}
