//! Random forest pipeline.
//!
//! Encode both id columns, use `[User ID code, Completed (%), Skill Level]` as
//! features and the course code as the target, hold out a seeded test split,
//! grow the forest and persist it with a manifest.

use std::path::PathBuf;

use tracing::info;

use super::{HeldOutEvaluation, PipelineError, dataset_summary, split_summary};
use crate::artifacts::{
    ArtifactKind, ArtifactManifest, ArtifactStore, FOREST_MANIFEST_FILE, PipelineKind,
};
use crate::config::PipelineConfig;
use crate::dataset::{
    COMPLETED_COLUMN, COURSE_ID_COLUMN, LoadedDataset, SKILL_LEVEL_COLUMN, USER_ID_COLUMN,
    load_csv, train_test_split,
};
use crate::ml::TrainDataset;
use crate::ml::forest::{ForestModel, train_forest};
use crate::preprocess::{LabelEncoder, PreprocessError};

/// Forest input columns, in model order. `Rating` is not a forest feature.
pub const FOREST_FEATURES: [&str; 3] = [USER_ID_COLUMN, COMPLETED_COLUMN, SKILL_LEVEL_COLUMN];

/// Outcome of a forest run.
#[derive(Debug, Clone)]
pub struct ForestReport {
    pub model: ForestModel,
    pub evaluation: HeldOutEvaluation,
    pub manifest: ArtifactManifest,
    pub manifest_path: PathBuf,
    pub model_path: PathBuf,
}

/// Load `config.data_path`, train, evaluate and write artifacts.
pub fn run(config: &PipelineConfig) -> Result<ForestReport, PipelineError> {
    config.validate()?;
    let data = load_csv(&config.data_path)?;
    info!(
        path = %config.data_path.display(),
        rows = data.len(),
        "loaded training data"
    );
    run_with_data(config, &data)
}

/// Run the pipeline on an already loaded dataset.
pub fn run_with_data(
    config: &PipelineConfig,
    data: &LoadedDataset,
) -> Result<ForestReport, PipelineError> {
    let user_encoder = LabelEncoder::fit(USER_ID_COLUMN, data.user_ids())?;
    let course_encoder = LabelEncoder::fit(COURSE_ID_COLUMN, data.course_ids())?;
    info!(
        users = user_encoder.len(),
        courses = course_encoder.len(),
        "encoded id columns"
    );

    let x = feature_rows(data, &user_encoder)?;
    let y = course_encoder.transform_all(data.course_ids())?;
    let split = train_test_split(data.len(), config.split.test_fraction, config.split.seed)?;
    let (x_train, x_test) = split.select(&x);
    let (y_train, y_test) = split.select(&y);

    let train = TrainDataset {
        feature_names: FOREST_FEATURES.iter().map(|name| name.to_string()).collect(),
        classes: course_encoder.classes().to_vec(),
        x: x_train,
        y: y_train,
    };
    let options = config.forest.train_options(config.split.seed);
    info!(
        train_rows = train.x.len(),
        test_rows = x_test.len(),
        trees = options.n_trees,
        "training random forest"
    );
    let model = train_forest(&train, &options)?;

    let predicted: Vec<usize> = x_test
        .iter()
        .map(|row| model.predict_class_index(row))
        .collect();
    let evaluation = HeldOutEvaluation::new(&y_test, &predicted, &model.classes);
    info!(
        accuracy = evaluation.summary.accuracy,
        samples = evaluation.summary.samples,
        "forest evaluated on held-out split"
    );

    let store = ArtifactStore::new(&config.output_dir);
    let record = store.write(ArtifactKind::ForestModel, &model)?;
    let model_path = store.path(&record.file_name);
    let manifest = ArtifactManifest {
        format_version: ArtifactManifest::FORMAT_VERSION,
        pipeline: PipelineKind::Forest,
        created_at: ArtifactManifest::timestamp_now()?,
        dataset: dataset_summary(config, data, &split),
        features: model.feature_names.clone(),
        classes: model.classes.clone(),
        class_count: model.classes.len(),
        split: split_summary(config),
        evaluation: Some(evaluation.summary.clone()),
        final_epoch: None,
        user_vocabulary: Some(user_encoder),
        artifacts: vec![record],
    };
    let manifest_path = store.write_manifest(FOREST_MANIFEST_FILE, &manifest)?;
    info!(path = %model_path.display(), "forest model saved");

    Ok(ForestReport {
        model,
        evaluation,
        manifest,
        manifest_path,
        model_path,
    })
}

/// Forest input row for one raw record.
pub fn feature_row(
    user_encoder: &LabelEncoder,
    user_id: &str,
    completed: f32,
    skill_level: f32,
) -> Result<Vec<f32>, PreprocessError> {
    let user = user_encoder.transform(user_id)?;
    Ok(vec![user as f32, completed, skill_level])
}

fn feature_rows(
    data: &LoadedDataset,
    user_encoder: &LabelEncoder,
) -> Result<Vec<Vec<f32>>, PreprocessError> {
    data.records
        .iter()
        .map(|record| {
            feature_row(
                user_encoder,
                &record.user_id,
                record.completed,
                record.skill_level,
            )
        })
        .collect()
}
