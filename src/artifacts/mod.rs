//! Persisted pipeline outputs: models, fitted preprocessors and manifests.
//!
//! Every artifact is pretty-printed JSON. A run writes its artifacts first,
//! then a manifest listing each file with its blake3 digest, so a reader can
//! detect a directory mixing files from different runs.

mod manifest;
mod store;

use std::fmt;
use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ml::forest::ForestModel;
use crate::ml::network::NetworkModel;
use crate::preprocess::{LabelEncoder, MinMaxScaler};

pub use manifest::{ArtifactManifest, DatasetSummary, PipelineKind, SplitSummary};
pub use store::ArtifactStore;

pub const FOREST_MODEL_FILE: &str = "course_recommender.forest.json";
pub const FOREST_MANIFEST_FILE: &str = "forest_manifest.json";
pub const NETWORK_MODEL_FILE: &str = "course_recommender.network.json";
pub const NETWORK_MANIFEST_FILE: &str = "network_manifest.json";
pub const USER_ENCODER_FILE: &str = "user_encoder.json";
pub const COURSE_ENCODER_FILE: &str = "course_encoder.json";
pub const SCALER_FILE: &str = "scaler.json";

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("Failed to create artifact directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Artifact not found: {path}")]
    Missing { path: PathBuf },
    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Invalid {label} at {path}: {reason}")]
    Invalid {
        label: &'static str,
        path: PathBuf,
        reason: String,
    },
    #[error("{path} does not match its manifest entry (expected blake3 {expected}, found {actual})")]
    HashMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },
    #[error("Manifest does not list a {0} artifact")]
    NotListed(ArtifactKind),
    #[error("Failed to format timestamp: {0}")]
    Timestamp(#[from] time::error::Format),
}

/// Role of a file inside an artifact directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    ForestModel,
    NetworkModel,
    UserEncoder,
    CourseEncoder,
    Scaler,
}

impl ArtifactKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ForestModel => "forest_model",
            Self::NetworkModel => "network_model",
            Self::UserEncoder => "user_encoder",
            Self::CourseEncoder => "course_encoder",
            Self::Scaler => "scaler",
        }
    }

    /// Conventional file name for this kind.
    pub fn file_name(self) -> &'static str {
        match self {
            Self::ForestModel => FOREST_MODEL_FILE,
            Self::NetworkModel => NETWORK_MODEL_FILE,
            Self::UserEncoder => USER_ENCODER_FILE,
            Self::CourseEncoder => COURSE_ENCODER_FILE,
            Self::Scaler => SCALER_FILE,
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Manifest entry for one written file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRecord {
    pub kind: ArtifactKind,
    pub file_name: String,
    /// Hex blake3 digest of the file bytes.
    pub blake3: String,
}

/// A JSON document that can check its own structural invariants.
pub trait Artifact: Serialize + DeserializeOwned {
    /// Human-readable name used in error messages.
    const LABEL: &'static str;

    fn validate(&self) -> Result<(), String>;
}

impl Artifact for ForestModel {
    const LABEL: &'static str = "forest model";

    fn validate(&self) -> Result<(), String> {
        ForestModel::validate(self)
    }
}

impl Artifact for NetworkModel {
    const LABEL: &'static str = "network model";

    fn validate(&self) -> Result<(), String> {
        NetworkModel::validate(self)
    }
}

impl Artifact for LabelEncoder {
    const LABEL: &'static str = "label encoder";

    fn validate(&self) -> Result<(), String> {
        LabelEncoder::validate(self)
    }
}

impl Artifact for MinMaxScaler {
    const LABEL: &'static str = "scaler";

    fn validate(&self) -> Result<(), String> {
        MinMaxScaler::validate(self)
    }
}

impl Artifact for ArtifactManifest {
    const LABEL: &'static str = "manifest";

    fn validate(&self) -> Result<(), String> {
        ArtifactManifest::validate(self)
    }
}
