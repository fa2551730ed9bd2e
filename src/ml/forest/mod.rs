//! Random forest classifier built from CART decision trees.
//!
//! - Gini impurity, unlimited depth by default.
//! - Bootstrap resampling and random feature subsets per split.
//! - Seeded, so the same data and options grow the same forest.
//! - JSON-serializable model with the class list embedded.

mod model;
mod train;

pub use model::{DecisionTree, ForestModel, TreeNode};
pub use train::{MaxFeatures, TrainOptions, train_forest};
