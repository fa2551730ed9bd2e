//! Library exports for the training binaries, benchmarks and tests.
/// Application directory resolution.
pub mod app_dirs;
/// Persisted models, preprocessors and run manifests.
pub mod artifacts;
/// TOML pipeline configuration.
pub mod config;
/// CSV loading and train/test splitting.
pub mod dataset;
/// Tracing subscriber setup.
pub mod logging;
/// Random forest and dense network classifiers.
pub mod ml;
/// End-to-end training pipelines.
pub mod pipeline;
/// Label encoding, min-max scaling and one-hot targets.
pub mod preprocess;
/// Top-k course recommendations from saved artifacts.
pub mod recommend;
