//! Dense network pipeline.
//!
//! Label-encode both id columns, min-max scale the three numeric columns,
//! one-hot the course code over every distinct course, hold out a seeded test
//! split and train with validation on that split after every epoch. Writes the
//! network, both encoders and the scaler, then a manifest.

use std::path::PathBuf;

use tracing::info;

use super::{HeldOutEvaluation, PipelineError, dataset_summary, split_summary};
use crate::artifacts::{
    ArtifactKind, ArtifactManifest, ArtifactStore, NETWORK_MANIFEST_FILE, PipelineKind,
};
use crate::config::PipelineConfig;
use crate::dataset::{
    COURSE_ID_COLUMN, LoadedDataset, NumericColumn, USER_ID_COLUMN, load_csv, train_test_split,
};
use crate::ml::OneHotDataset;
use crate::ml::network::{NetworkModel, TrainingHistory, train_network};
use crate::preprocess::{LabelEncoder, MinMaxScaler, PreprocessError, one_hot};

/// Scaled numeric columns, in model order after the user code.
pub const SCALED_COLUMNS: [NumericColumn; 3] = [
    NumericColumn::Completed,
    NumericColumn::Rating,
    NumericColumn::SkillLevel,
];

/// Network input columns, in model order.
pub fn network_features() -> Vec<String> {
    std::iter::once(USER_ID_COLUMN)
        .chain(SCALED_COLUMNS.iter().map(|column| column.name()))
        .map(str::to_string)
        .collect()
}

/// Build one network input row: the raw user code followed by the scaled
/// numeric columns.
pub fn feature_row(
    user_encoder: &LabelEncoder,
    scaler: &MinMaxScaler,
    user_id: &str,
    numeric: &[f32],
) -> Result<Vec<f32>, PreprocessError> {
    let user = user_encoder.transform(user_id)?;
    let scaled = scaler.transform_row(numeric)?;
    let mut row = Vec::with_capacity(scaled.len() + 1);
    row.push(user as f32);
    row.extend(scaled);
    Ok(row)
}

/// Fitted preprocessing plus the encoded matrix for every row.
#[derive(Debug, Clone)]
pub struct PreparedData {
    pub user_encoder: LabelEncoder,
    pub course_encoder: LabelEncoder,
    pub scaler: MinMaxScaler,
    pub x: Vec<Vec<f32>>,
    pub labels: Vec<usize>,
    /// One-hot rows, `course_encoder.len()` wide.
    pub targets: Vec<Vec<f32>>,
}

/// Fit encoders and scaler on the full dataset and encode every row.
pub fn prepare(data: &LoadedDataset) -> Result<PreparedData, PipelineError> {
    let user_encoder = LabelEncoder::fit(USER_ID_COLUMN, data.user_ids())?;
    let course_encoder = LabelEncoder::fit(COURSE_ID_COLUMN, data.course_ids())?;
    let numeric = data.numeric_rows(&SCALED_COLUMNS);
    let scaler = MinMaxScaler::fit(
        SCALED_COLUMNS
            .iter()
            .map(|column| column.name().to_string())
            .collect(),
        &numeric,
    )?;

    let x = data
        .records
        .iter()
        .zip(&numeric)
        .map(|(record, values)| feature_row(&user_encoder, &scaler, &record.user_id, values))
        .collect::<Result<Vec<_>, _>>()?;
    let labels = course_encoder.transform_all(data.course_ids())?;
    let targets = one_hot(&labels, course_encoder.len())?;

    Ok(PreparedData {
        user_encoder,
        course_encoder,
        scaler,
        x,
        labels,
        targets,
    })
}

/// Outcome of a network run.
#[derive(Debug, Clone)]
pub struct NetworkReport {
    pub model: NetworkModel,
    pub history: TrainingHistory,
    pub evaluation: HeldOutEvaluation,
    pub manifest: ArtifactManifest,
    pub manifest_path: PathBuf,
    pub model_path: PathBuf,
}

/// Load `config.data_path`, train, evaluate and write artifacts.
pub fn run(config: &PipelineConfig) -> Result<NetworkReport, PipelineError> {
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
) -> Result<NetworkReport, PipelineError> {
    let prepared = prepare(data)?;
    info!(
        users = prepared.user_encoder.len(),
        courses = prepared.course_encoder.len(),
        "fitted encoders and scaler"
    );

    let split = train_test_split(data.len(), config.split.test_fraction, config.split.seed)?;
    let (x_train, x_test) = split.select(&prepared.x);
    let (t_train, t_test) = split.select(&prepared.targets);
    let (_, y_test) = split.select(&prepared.labels);
    let features = network_features();
    let classes = prepared.course_encoder.classes().to_vec();
    let train = OneHotDataset {
        feature_names: features.clone(),
        classes: classes.clone(),
        x: x_train,
        targets: t_train,
    };
    let test = OneHotDataset {
        feature_names: features,
        classes,
        x: x_test,
        targets: t_test,
    };

    let options = config.network.train_options(config.split.seed);
    info!(
        train_rows = train.x.len(),
        test_rows = test.x.len(),
        epochs = options.epochs,
        batch_size = options.batch_size,
        hidden = ?options.hidden_layers,
        "training dense network"
    );
    let (model, history) = train_network(&train, Some(&test), &options, |metrics| {
        info!(
            epoch = metrics.epoch,
            loss = metrics.loss,
            accuracy = metrics.accuracy,
            val_loss = metrics.val_loss,
            val_accuracy = metrics.val_accuracy,
            "epoch finished"
        );
    })?;

    let predicted: Vec<usize> = test
        .x
        .iter()
        .map(|row| model.predict_class_index(row))
        .collect();
    let evaluation = HeldOutEvaluation::new(&y_test, &predicted, &model.classes);
    info!(
        accuracy = evaluation.summary.accuracy,
        samples = evaluation.summary.samples,
        parameters = model.parameter_count(),
        "network evaluated on held-out split"
    );

    let store = ArtifactStore::new(&config.output_dir);
    let artifacts = vec![
        store.write(ArtifactKind::UserEncoder, &prepared.user_encoder)?,
        store.write(ArtifactKind::CourseEncoder, &prepared.course_encoder)?,
        store.write(ArtifactKind::Scaler, &prepared.scaler)?,
        store.write(ArtifactKind::NetworkModel, &model)?,
    ];
    let model_path = store.path(ArtifactKind::NetworkModel.file_name());
    let manifest = ArtifactManifest {
        format_version: ArtifactManifest::FORMAT_VERSION,
        pipeline: PipelineKind::Network,
        created_at: ArtifactManifest::timestamp_now()?,
        dataset: dataset_summary(config, data, &split),
        features: model.feature_names.clone(),
        classes: model.classes.clone(),
        class_count: model.classes.len(),
        split: split_summary(config),
        evaluation: Some(evaluation.summary.clone()),
        final_epoch: history.last().cloned(),
        user_vocabulary: None,
        artifacts,
    };
    let manifest_path = store.write_manifest(NETWORK_MANIFEST_FILE, &manifest)?;
    info!(path = %model_path.display(), "network model saved");

    Ok(NetworkReport {
        model,
        history,
        evaluation,
        manifest,
        manifest_path,
        model_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::load_csv_from_reader;

    const CSV: &str = "User ID,Course ID,Completed (%),Rating,Skill Level\n\
                       1,C3,0,1,1\n\
                       2,C1,50,3,2\n\
                       3,C2,100,5,3\n\
                       1,C1,25,2,1\n";

    #[test]
    fn prepare_scales_numeric_columns_and_keeps_user_codes() {
        let data = load_csv_from_reader(CSV.as_bytes()).unwrap();
        let prepared = prepare(&data).unwrap();
        assert_eq!(prepared.x[0], vec![0.0, 0.0, 0.0, 0.0]);
        assert_eq!(prepared.x[2], vec![2.0, 1.0, 1.0, 1.0]);
        assert_eq!(prepared.x[1], vec![1.0, 0.5, 0.5, 0.5]);
        assert_eq!(prepared.labels, vec![2, 0, 1, 0]);
        assert!(prepared.targets.iter().all(|row| row.len() == 3));
    }

    #[test]
    fn feature_row_rejects_unknown_users() {
        let data = load_csv_from_reader(CSV.as_bytes()).unwrap();
        let prepared = prepare(&data).unwrap();
        let err = feature_row(
            &prepared.user_encoder,
            &prepared.scaler,
            "99",
            &[10.0, 3.0, 2.0],
        )
        .unwrap_err();
        assert!(matches!(err, PreprocessError::UnseenLabel { .. }));
    }

    #[test]
    fn feature_names_follow_model_order() {
        assert_eq!(
            network_features(),
            vec!["User ID", "Completed (%)", "Rating", "Skill Level"]
        );
    }
}
