use std::path::PathBuf;

pub(super) fn default_data_path() -> PathBuf {
    PathBuf::from("training_data.csv")
}

pub(super) fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

pub(super) fn default_seed() -> u64 {
    42
}

pub(super) fn default_test_fraction() -> f64 {
    0.2
}

pub(super) fn default_tree_count() -> usize {
    100
}

pub(super) fn default_min_samples_split() -> usize {
    2
}

pub(super) fn default_min_samples_leaf() -> usize {
    1
}

pub(super) fn default_true() -> bool {
    true
}

pub(super) fn default_hidden_layers() -> Vec<usize> {
    vec![64, 128, 64]
}

pub(super) fn default_epochs() -> usize {
    50
}

pub(super) fn default_batch_size() -> usize {
    8
}

pub(super) fn default_learning_rate() -> f32 {
    0.001
}

pub(super) fn default_beta1() -> f32 {
    0.9
}

pub(super) fn default_beta2() -> f32 {
    0.999
}

pub(super) fn default_epsilon() -> f32 {
    1e-7
}
