use std::{fs, path::Path};

use anyhow::{Context, bail};
use ndarray::{Array2, s};
use replay::{DatasetKind, ReplayConfig};
use serde::{Deserialize, Serialize};
use training::{BootstrapConfig, TrainingConfig};

use crate::synthetic::SyntheticConfig;

/// Where the initial examples of a run come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    /// Simulated scenarios drawn from the run's collector.
    Synthetic { scenarios: usize },
    /// Row major rows of `x_size` features followed by `y_size` targets.
    Inline {
        data: Vec<f64>,
        x_size: usize,
        y_size: usize,
    },
}

impl Default for DataSource {
    fn default() -> Self {
        Self::Synthetic { scenarios: 50 }
    }
}

impl DataSource {
    /// Splits inline data into its feature and target matrices.
    pub fn inline_rows(
        data: &[f64],
        x_size: usize,
        y_size: usize,
    ) -> anyhow::Result<(Array2<f64>, Array2<f64>)> {
        let row_size = x_size + y_size;
        if x_size == 0 || y_size == 0 {
            bail!("x_size and y_size must be greater than 0");
        }

        if data.len() % row_size != 0 {
            bail!(
                "dataset length ({}) is not divisible by x_size + y_size ({row_size})",
                data.len()
            );
        }

        let rows = Array2::from_shape_vec((data.len() / row_size, row_size), data.to_vec())
            .context("inline dataset has an invalid shape")?;

        Ok((
            rows.slice(s![.., ..x_size]).to_owned(),
            rows.slice(s![.., x_size..]).to_owned(),
        ))
    }
}

/// How the initial dataset is loaded and prepared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    pub source: DataSource,
    pub train_split: f64,
    pub shuffle: bool,
    /// Z-score features with the train statistics, collected rows included.
    pub normalize: bool,
    /// Train on a single target column.
    pub target_index: Option<usize>,
    /// Keep at most this many rows per partition.
    pub debug_size: Option<usize>,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            source: DataSource::default(),
            train_split: 0.9,
            shuffle: true,
            normalize: true,
            target_index: None,
            debug_size: None,
        }
    }
}

/// Everything a run needs, read from a JSON file. Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub kind: DatasetKind,
    pub dataset: DatasetConfig,
    pub replay: ReplayConfig,
    pub training: TrainingConfig,
    pub bootstrap: BootstrapConfig,
    pub collector: SyntheticConfig,
    /// Seeds every rng of the run that has no seed of its own.
    pub seed: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            kind: DatasetKind::Prioritized,
            dataset: DatasetConfig::default(),
            replay: ReplayConfig::default(),
            training: TrainingConfig::default(),
            bootstrap: BootstrapConfig::default(),
            collector: SyntheticConfig::default(),
            seed: 1,
        }
    }
}

impl RunConfig {
    /// Parses a run configuration from JSON.
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        serde_json::from_str(json).context("invalid run configuration")
    }

    /// Reads and parses a run configuration file.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content =
            fs::read_to_string(path).with_context(|| format!("cannot read '{}'", path.display()))?;

        Self::from_json(&content)
    }

    /// Returns the replay config, seeded from the run seed unless it has its own.
    pub fn replay_config(&self) -> ReplayConfig {
        ReplayConfig {
            seed: self.replay.seed.or(Some(self.seed)),
            ..self.replay
        }
    }
}
