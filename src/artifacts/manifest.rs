use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use super::{ArtifactError, ArtifactKind, ArtifactRecord};
use crate::ml::metrics::EvaluationSummary;
use crate::ml::network::EpochMetrics;
use crate::preprocess::LabelEncoder;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineKind {
    Forest,
    Network,
}

/// Where the training rows came from and how many went to each side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub source: String,
    /// Hex blake3 digest of the CSV bytes.
    pub fingerprint: String,
    pub rows: usize,
    pub train_rows: usize,
    pub test_rows: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitSummary {
    pub seed: u64,
    pub test_fraction: f64,
}

/// Record of one pipeline run and the files it produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactManifest {
    pub format_version: u32,
    pub pipeline: PipelineKind,
    /// RFC 3339 UTC timestamp.
    pub created_at: String,
    pub dataset: DatasetSummary,
    /// Model input columns, in order.
    pub features: Vec<String>,
    /// Course ids, indexed by class code.
    pub classes: Vec<String>,
    pub class_count: usize,
    pub split: SplitSummary,
    /// Held-out metrics.
    #[serde(default)]
    pub evaluation: Option<EvaluationSummary>,
    #[serde(default)]
    pub final_epoch: Option<EpochMetrics>,
    /// User vocabulary for runs that do not write a separate encoder file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_vocabulary: Option<LabelEncoder>,
    pub artifacts: Vec<ArtifactRecord>,
}

impl ArtifactManifest {
    pub const FORMAT_VERSION: u32 = 1;

    /// Current UTC time formatted for `created_at`.
    pub fn timestamp_now() -> Result<String, ArtifactError> {
        Ok(OffsetDateTime::now_utc().format(&Rfc3339)?)
    }

    pub fn artifact(&self, kind: ArtifactKind) -> Option<&ArtifactRecord> {
        self.artifacts.iter().find(|record| record.kind == kind)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.format_version != Self::FORMAT_VERSION {
            return Err(format!(
                "Unsupported format_version {} (expected {})",
                self.format_version,
                Self::FORMAT_VERSION
            ));
        }
        if self.class_count != self.classes.len() {
            return Err(format!(
                "class_count {} disagrees with {} listed classes",
                self.class_count,
                self.classes.len()
            ));
        }
        if self.features.is_empty() {
            return Err("manifest lists no features".to_string());
        }
        let expected = match self.pipeline {
            PipelineKind::Forest => &[ArtifactKind::ForestModel][..],
            PipelineKind::Network => &[
                ArtifactKind::NetworkModel,
                ArtifactKind::UserEncoder,
                ArtifactKind::CourseEncoder,
                ArtifactKind::Scaler,
            ][..],
        };
        for kind in expected {
            if self.artifact(*kind).is_none() {
                return Err(format!("missing {kind} entry"));
            }
        }
        match (&self.user_vocabulary, self.pipeline) {
            (Some(vocabulary), _) => vocabulary.validate()?,
            (None, PipelineKind::Forest) => {
                return Err("forest manifest has no user vocabulary".to_string());
            }
            (None, PipelineKind::Network) => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest() -> ArtifactManifest {
        ArtifactManifest {
            format_version: ArtifactManifest::FORMAT_VERSION,
            pipeline: PipelineKind::Forest,
            created_at: "2024-01-01T00:00:00Z".to_string(),
            dataset: DatasetSummary {
                source: "training_data.csv".to_string(),
                fingerprint: "abc".to_string(),
                rows: 10,
                train_rows: 8,
                test_rows: 2,
            },
            features: vec!["User ID".into()],
            classes: vec!["101".into(), "102".into()],
            class_count: 2,
            split: SplitSummary {
                seed: 42,
                test_fraction: 0.2,
            },
            evaluation: None,
            final_epoch: None,
            user_vocabulary: Some(LabelEncoder::fit("User ID", ["3", "1"]).unwrap()),
            artifacts: vec![ArtifactRecord {
                kind: ArtifactKind::ForestModel,
                file_name: ArtifactKind::ForestModel.file_name().to_string(),
                blake3: "00".to_string(),
            }],
        }
    }

    #[test]
    fn valid_manifest_passes() {
        assert_eq!(manifest().validate(), Ok(()));
    }

    #[test]
    fn class_count_must_match_class_list() {
        let mut bad = manifest();
        bad.class_count = 3;
        assert!(bad.validate().is_err());
    }

    #[test]
    fn network_manifest_requires_preprocessors() {
        let mut bad = manifest();
        bad.pipeline = PipelineKind::Network;
        let err = bad.validate().unwrap_err();
        assert!(err.contains("network_model"), "{err}");
    }

    #[test]
    fn forest_manifest_requires_user_vocabulary() {
        let mut bad = manifest();
        bad.user_vocabulary = None;
        let err = bad.validate().unwrap_err();
        assert!(err.contains("user vocabulary"), "{err}");
    }

    #[test]
    fn user_vocabulary_survives_json() {
        let json = serde_json::to_string(&manifest()).unwrap();
        let restored: ArtifactManifest = serde_json::from_str(&json).unwrap();
        let users = restored.user_vocabulary.unwrap();
        assert_eq!(users.transform("3").unwrap(), 1);
    }

    #[test]
    fn timestamp_is_rfc3339() {
        let stamp = ArtifactManifest::timestamp_now().unwrap();
        assert!(OffsetDateTime::parse(&stamp, &Rfc3339).is_ok());
    }
}
