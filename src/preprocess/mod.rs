//! Fitted preprocessing transforms that are persisted next to a model.

mod encoder;
mod onehot;
mod scaler;

pub use encoder::{LabelEncoder, VocabularyOrder};
pub use onehot::one_hot;
pub use scaler::MinMaxScaler;

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum PreprocessError {
    #[error("{column}: value {value:?} was not seen during fitting")]
    UnseenLabel { column: String, value: String },
    #[error("{column}: cannot fit an encoder on an empty column")]
    EmptyVocabulary { column: String },
    #[error("label {label} does not fit a one-hot width of {width}")]
    LabelOutOfRange { label: usize, width: usize },
    #[error("cannot fit a scaler on zero rows")]
    EmptyInput,
    #[error("row {row} has {found} values, expected {expected}")]
    WidthMismatch {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("feature {feature:?} contains a non-finite value")]
    NonFinite { feature: String },
}
