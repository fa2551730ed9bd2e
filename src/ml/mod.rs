//! Classifiers trained by the pipelines, plus shared math and metrics.
//!
//! Models are plain serde structs so they can be written as JSON artifacts and
//! loaded back for prediction without any runtime beyond this crate.

pub mod forest;
mod math;
pub mod metrics;
pub mod network;
mod train_data;

pub use math::{argmax, softmax};
pub use train_data::{OneHotDataset, TrainDataset, TrainError};
