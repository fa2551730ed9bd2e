//! CSV loader for course interaction records.

use std::io::Read;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const USER_ID_COLUMN: &str = "User ID";
pub const COURSE_ID_COLUMN: &str = "Course ID";
pub const COMPLETED_COLUMN: &str = "Completed (%)";
pub const RATING_COLUMN: &str = "Rating";
pub const SKILL_LEVEL_COLUMN: &str = "Skill Level";

/// Columns every training CSV must carry. Extra columns are ignored.
pub const REQUIRED_COLUMNS: [&str; 5] = [
    USER_ID_COLUMN,
    COURSE_ID_COLUMN,
    COMPLETED_COLUMN,
    RATING_COLUMN,
    SKILL_LEVEL_COLUMN,
];

#[derive(Debug, Error)]
pub enum DatasetLoadError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("Missing required column {0:?}")]
    MissingColumn(String),
    #[error("Dataset has no rows")]
    Empty,
}

/// One row of `training_data.csv`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingRecord {
    #[serde(rename = "User ID")]
    pub user_id: String,
    #[serde(rename = "Course ID")]
    pub course_id: String,
    /// Completion percentage, nominally 0–100.
    #[serde(rename = "Completed (%)")]
    pub completed: f32,
    #[serde(rename = "Rating")]
    pub rating: f32,
    #[serde(rename = "Skill Level")]
    pub skill_level: f32,
}

/// Numeric feature columns of a [`TrainingRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericColumn {
    Completed,
    Rating,
    SkillLevel,
}

impl NumericColumn {
    /// Header name as it appears in the CSV.
    pub fn name(self) -> &'static str {
        match self {
            Self::Completed => COMPLETED_COLUMN,
            Self::Rating => RATING_COLUMN,
            Self::SkillLevel => SKILL_LEVEL_COLUMN,
        }
    }

    pub fn value(self, record: &TrainingRecord) -> f32 {
        match self {
            Self::Completed => record.completed,
            Self::Rating => record.rating,
            Self::SkillLevel => record.skill_level,
        }
    }
}

/// Parsed dataset plus a content fingerprint of the source bytes.
#[derive(Debug, Clone)]
pub struct LoadedDataset {
    pub records: Vec<TrainingRecord>,
    /// Hex blake3 digest of the raw CSV bytes.
    pub fingerprint: String,
}

impl LoadedDataset {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn user_ids(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|record| record.user_id.as_str())
    }

    pub fn course_ids(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|record| record.course_id.as_str())
    }

    /// Row-major matrix of the requested numeric columns.
    pub fn numeric_rows(&self, columns: &[NumericColumn]) -> Vec<Vec<f32>> {
        self.records
            .iter()
            .map(|record| columns.iter().map(|column| column.value(record)).collect())
            .collect()
    }
}

/// Load and parse a training CSV from disk.
pub fn load_csv(path: &Path) -> Result<LoadedDataset, DatasetLoadError> {
    let bytes = std::fs::read(path).map_err(|source| DatasetLoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_csv(&bytes)
}

/// Parse training records from any reader.
pub fn load_csv_from_reader<R: Read>(mut reader: R) -> Result<LoadedDataset, DatasetLoadError> {
    let mut bytes = Vec::new();
    reader
        .read_to_end(&mut bytes)
        .map_err(|source| DatasetLoadError::Read {
            path: PathBuf::from("<reader>"),
            source,
        })?;
    parse_csv(&bytes)
}

fn parse_csv(bytes: &[u8]) -> Result<LoadedDataset, DatasetLoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let headers = reader.headers()?.clone();
    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|header| header == column) {
            return Err(DatasetLoadError::MissingColumn(column.to_string()));
        }
    }

    let mut records = Vec::new();
    for row in reader.deserialize::<TrainingRecord>() {
        records.push(row?);
    }
    if records.is_empty() {
        return Err(DatasetLoadError::Empty);
    }

    Ok(LoadedDataset {
        records,
        fingerprint: blake3::hash(bytes).to_hex().to_string(),
    })
}
