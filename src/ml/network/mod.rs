//! Dense feed-forward classifier trained with mini-batch Adam.

mod model;
mod train;

pub use model::{Activation, DenseLayer, NetworkModel};
pub use train::{
    AdamSettings, EpochMetrics, Evaluation, TrainOptions, TrainingHistory, evaluate,
    train_network,
};
