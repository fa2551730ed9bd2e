//! Training data access: CSV parsing and train/test partitioning.

pub mod loader;
pub mod split;

pub use loader::{
    COMPLETED_COLUMN, COURSE_ID_COLUMN, DatasetLoadError, LoadedDataset, NumericColumn,
    RATING_COLUMN, SKILL_LEVEL_COLUMN, TrainingRecord, USER_ID_COLUMN, load_csv,
    load_csv_from_reader,
};
pub use split::{SplitError, SplitIndices, train_test_split};
