//! Pipeline configuration.
//!
//! Every field has a default, so running without a config file reproduces the
//! stock behaviour: read `training_data.csv`, hold out 20% with seed 42, write
//! artifacts to the current directory. A TOML file can override any subset:
//!
//! ```toml
//! data_path = "data/training_data.csv"
//! output_dir = "artifacts"
//!
//! [split]
//! seed = 7
//!
//! [network]
//! epochs = 10
//! ```

mod defaults;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::logging::LogSettings;
use crate::ml::{forest, network};

use defaults::{
    default_batch_size, default_beta1, default_beta2, default_data_path, default_epochs,
    default_epsilon, default_hidden_layers, default_learning_rate, default_min_samples_leaf,
    default_min_samples_split, default_output_dir, default_seed, default_test_fraction,
    default_tree_count, default_true,
};

/// Errors that may occur while loading pipeline configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the config file.
    #[error("Failed to read {path}: {source}")]
    Read {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },
    /// Failed to parse TOML config.
    #[error("Invalid config at {path}: {source}")]
    ParseToml {
        /// TOML file path.
        path: PathBuf,
        /// TOML parse error.
        source: toml::de::Error,
    },
    /// A value parsed but is out of range.
    #[error("Invalid config value: {0}")]
    Invalid(String),
}

/// Top-level settings shared by both training pipelines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// CSV file with the training records.
    #[serde(default = "default_data_path")]
    pub data_path: PathBuf,
    /// Directory that receives the artifacts.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default)]
    pub split: SplitSettings,
    #[serde(default)]
    pub forest: ForestSettings,
    #[serde(default)]
    pub network: NetworkSettings,
    #[serde(default)]
    pub logging: LogSettings,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_path: default_data_path(),
            output_dir: default_output_dir(),
            split: SplitSettings::default(),
            forest: ForestSettings::default(),
            network: NetworkSettings::default(),
            logging: LogSettings::default(),
        }
    }
}

/// Train/test partition settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitSettings {
    /// Fraction of rows held out for testing, in `(0, 1)`.
    #[serde(default = "default_test_fraction")]
    pub test_fraction: f64,
    /// Seed for the row permutation. Also seeds model initialisation.
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for SplitSettings {
    fn default() -> Self {
        Self {
            test_fraction: default_test_fraction(),
            seed: default_seed(),
        }
    }
}

/// Random forest hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestSettings {
    #[serde(default = "default_tree_count")]
    pub n_trees: usize,
    /// `None` grows trees until leaves are pure.
    #[serde(default)]
    pub max_depth: Option<usize>,
    #[serde(default = "default_min_samples_split")]
    pub min_samples_split: usize,
    #[serde(default = "default_min_samples_leaf")]
    pub min_samples_leaf: usize,
    #[serde(default)]
    pub max_features: forest::MaxFeatures,
    #[serde(default = "default_true")]
    pub bootstrap: bool,
}

impl Default for ForestSettings {
    fn default() -> Self {
        Self {
            n_trees: default_tree_count(),
            max_depth: None,
            min_samples_split: default_min_samples_split(),
            min_samples_leaf: default_min_samples_leaf(),
            max_features: forest::MaxFeatures::default(),
            bootstrap: default_true(),
        }
    }
}

impl ForestSettings {
    /// Build trainer options, seeding bootstrap sampling with `seed`.
    pub fn train_options(&self, seed: u64) -> forest::TrainOptions {
        forest::TrainOptions {
            n_trees: self.n_trees,
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            min_samples_leaf: self.min_samples_leaf,
            max_features: self.max_features,
            bootstrap: self.bootstrap,
            seed,
        }
    }
}

/// Dense network hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSettings {
    /// Hidden layer widths, input side first.
    #[serde(default = "default_hidden_layers")]
    pub hidden_layers: Vec<usize>,
    #[serde(default = "default_epochs")]
    pub epochs: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f32,
    #[serde(default = "default_beta1")]
    pub beta1: f32,
    #[serde(default = "default_beta2")]
    pub beta2: f32,
    #[serde(default = "default_epsilon")]
    pub epsilon: f32,
    /// Reshuffle training rows every epoch.
    #[serde(default = "default_true")]
    pub shuffle: bool,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            hidden_layers: default_hidden_layers(),
            epochs: default_epochs(),
            batch_size: default_batch_size(),
            learning_rate: default_learning_rate(),
            beta1: default_beta1(),
            beta2: default_beta2(),
            epsilon: default_epsilon(),
            shuffle: default_true(),
        }
    }
}

impl NetworkSettings {
    /// Build trainer options, seeding weight init and shuffling with `seed`.
    pub fn train_options(&self, seed: u64) -> network::TrainOptions {
        network::TrainOptions {
            hidden_layers: self.hidden_layers.clone(),
            epochs: self.epochs,
            batch_size: self.batch_size,
            adam: network::AdamSettings {
                learning_rate: self.learning_rate,
                beta1: self.beta1,
                beta2: self.beta2,
                epsilon: self.epsilon,
            },
            shuffle: self.shuffle,
            seed,
        }
    }
}

impl PipelineConfig {
    /// Load a config file, falling back to defaults for missing keys.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&text).map_err(|source| ConfigError::ParseToml {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` when given, otherwise return defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Reject values the trainers cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fraction = self.split.test_fraction;
        if !(fraction > 0.0 && fraction < 1.0) {
            return Err(ConfigError::Invalid(format!(
                "split.test_fraction must be in (0, 1), got {fraction}"
            )));
        }
        if self.forest.n_trees == 0 {
            return Err(ConfigError::Invalid("forest.n_trees must be >= 1".to_string()));
        }
        if self.forest.min_samples_split < 2 {
            return Err(ConfigError::Invalid(
                "forest.min_samples_split must be >= 2".to_string(),
            ));
        }
        if self.forest.min_samples_leaf == 0 {
            return Err(ConfigError::Invalid(
                "forest.min_samples_leaf must be >= 1".to_string(),
            ));
        }
        if self.network.hidden_layers.iter().any(|&width| width == 0) {
            return Err(ConfigError::Invalid(
                "network.hidden_layers entries must be >= 1".to_string(),
            ));
        }
        if self.network.epochs == 0 {
            return Err(ConfigError::Invalid("network.epochs must be >= 1".to_string()));
        }
        if self.network.batch_size == 0 {
            return Err(ConfigError::Invalid(
                "network.batch_size must be >= 1".to_string(),
            ));
        }
        let lr = self.network.learning_rate;
        if !lr.is_finite() || lr <= 0.0 {
            return Err(ConfigError::Invalid(
                "network.learning_rate must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn defaults_match_stock_pipeline() {
        let config = PipelineConfig::default();
        assert_eq!(config.data_path, PathBuf::from("training_data.csv"));
        assert_eq!(config.split.seed, 42);
        assert_eq!(config.split.test_fraction, 0.2);
        assert_eq!(config.forest.n_trees, 100);
        assert_eq!(config.network.hidden_layers, vec![64, 128, 64]);
        assert_eq!(config.network.epochs, 50);
        assert_eq!(config.network.batch_size, 8);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pipeline.toml");
        std::fs::write(
            &path,
            "output_dir = \"out\"\n\n[split]\nseed = 7\n\n[network]\nepochs = 3\n",
        )
        .unwrap();

        let config = PipelineConfig::load(&path).unwrap();
        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert_eq!(config.split.seed, 7);
        assert_eq!(config.split.test_fraction, 0.2);
        assert_eq!(config.network.epochs, 3);
        assert_eq!(config.network.batch_size, 8);
        assert_eq!(config.forest.n_trees, 100);
    }

    #[test]
    fn out_of_range_fraction_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pipeline.toml");
        std::fs::write(&path, "[split]\ntest_fraction = 1.5\n").unwrap();
        assert!(matches!(
            PipelineConfig::load(&path),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn malformed_toml_reports_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[split\nseed = ").unwrap();
        let err = PipelineConfig::load(&path).unwrap_err();
        assert!(err.to_string().contains("broken.toml"));
    }
}
