//! End-to-end training runs: CSV in, artifact directory out.
//!
//! The two pipelines share loading, splitting and artifact code but never call
//! each other. Each run is single pass and synchronous.

pub mod forest;
pub mod network;

use thiserror::Error;

use crate::artifacts::{ArtifactError, DatasetSummary, SplitSummary};
use crate::config::{ConfigError, PipelineConfig};
use crate::dataset::{DatasetLoadError, LoadedDataset, SplitError, SplitIndices};
use crate::ml::TrainError;
use crate::ml::metrics::{ConfusionMatrix, EvaluationSummary, summarize};
use crate::preprocess::PreprocessError;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Dataset(#[from] DatasetLoadError),
    #[error(transparent)]
    Split(#[from] SplitError),
    #[error(transparent)]
    Preprocess(#[from] PreprocessError),
    #[error(transparent)]
    Train(#[from] TrainError),
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
}

/// Held-out evaluation of one trained model.
#[derive(Debug, Clone)]
pub struct HeldOutEvaluation {
    pub confusion: ConfusionMatrix,
    pub summary: EvaluationSummary,
}

impl HeldOutEvaluation {
    fn new(truth: &[usize], predicted: &[usize], classes: &[String]) -> Self {
        let confusion = ConfusionMatrix::from_predictions(classes.len(), truth, predicted);
        let summary = summarize(&confusion, classes);
        Self { confusion, summary }
    }
}

fn dataset_summary(
    config: &PipelineConfig,
    data: &LoadedDataset,
    split: &SplitIndices,
) -> DatasetSummary {
    DatasetSummary {
        source: config.data_path.display().to_string(),
        fingerprint: data.fingerprint.clone(),
        rows: data.len(),
        train_rows: split.train.len(),
        test_rows: split.test.len(),
    }
}

fn split_summary(config: &PipelineConfig) -> SplitSummary {
    SplitSummary {
        seed: config.split.seed,
        test_fraction: config.split.test_fraction,
    }
}
