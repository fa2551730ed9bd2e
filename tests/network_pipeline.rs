mod support;

use course_recommender::artifacts::{
    ArtifactKind, ArtifactManifest, ArtifactStore, COURSE_ENCODER_FILE, NETWORK_MANIFEST_FILE,
    NETWORK_MODEL_FILE, SCALER_FILE, USER_ENCODER_FILE,
};
use course_recommender::dataset::load_csv;
use course_recommender::ml::network::NetworkModel;
use course_recommender::pipeline::network;
use course_recommender::preprocess::{LabelEncoder, MinMaxScaler, PreprocessError};
use course_recommender::recommend::{RecommendError, Recommender};
use support::training_data::{quick_config, synthetic_rows, write_csv};
use tempfile::tempdir;

#[test]
fn ten_courses_give_one_hot_width_ten() {
    let temp = tempdir().expect("tempdir");
    let csv = temp.path().join("training_data.csv");
    write_csv(&csv, &synthetic_rows(50, 10));
    let data = load_csv(&csv).expect("load");
    let prepared = network::prepare(&data).expect("prepare");
    assert_eq!(prepared.course_encoder.len(), 10);
    assert!(prepared.targets.iter().all(|row| row.len() == 10));
    assert!(
        prepared
            .targets
            .iter()
            .all(|row| row.iter().sum::<f32>() == 1.0)
    );
}

#[test]
fn network_run_writes_all_artifacts() {
    let temp = tempdir().expect("tempdir");
    let csv = temp.path().join("training_data.csv");
    write_csv(&csv, &synthetic_rows(60, 10));
    let out = temp.path().join("artifacts");

    let report = network::run(&quick_config(csv, out.clone())).expect("network run");

    for file in [
        NETWORK_MODEL_FILE,
        USER_ENCODER_FILE,
        COURSE_ENCODER_FILE,
        SCALER_FILE,
        NETWORK_MANIFEST_FILE,
    ] {
        assert!(out.join(file).is_file(), "{file} missing");
    }
    assert_eq!(report.history.epochs.len(), 4);
    assert_eq!(report.model.architecture(), vec![4, 16, 16, 8, 10]);
    let manifest = &report.manifest;
    assert_eq!(manifest.class_count, 10);
    assert_eq!(manifest.artifacts.len(), 4);
    let final_epoch = manifest.final_epoch.as_ref().expect("final epoch");
    assert_eq!(final_epoch.epoch, 4);
    assert!(final_epoch.val_loss.is_some());
}

#[test]
fn reloaded_artifacts_reproduce_outputs() {
    let temp = tempdir().expect("tempdir");
    let csv = temp.path().join("training_data.csv");
    write_csv(&csv, &synthetic_rows(48, 6));
    let report = network::run(&quick_config(csv.clone(), temp.path().to_path_buf()))
        .expect("network run");

    let store = ArtifactStore::new(temp.path());
    let manifest: ArtifactManifest = store.read(NETWORK_MANIFEST_FILE).expect("manifest");
    let model: NetworkModel = store
        .read_recorded(&manifest, ArtifactKind::NetworkModel)
        .expect("model");
    let users: LabelEncoder = store
        .read_recorded(&manifest, ArtifactKind::UserEncoder)
        .expect("user encoder");
    let scaler: MinMaxScaler = store
        .read_recorded(&manifest, ArtifactKind::Scaler)
        .expect("scaler");
    assert_eq!(model, report.model);

    let data = load_csv(&csv).expect("load");
    let prepared = network::prepare(&data).expect("prepare");
    assert_eq!(users, prepared.user_encoder);
    assert_eq!(scaler, prepared.scaler);
    for row in prepared.x.iter().take(5) {
        assert_eq!(model.predict_proba(row), report.model.predict_proba(row));
    }
}

#[test]
fn recommender_ranks_courses_from_saved_artifacts() {
    let temp = tempdir().expect("tempdir");
    let csv = temp.path().join("training_data.csv");
    write_csv(&csv, &synthetic_rows(40, 5));
    network::run(&quick_config(csv, temp.path().to_path_buf())).expect("network run");

    let recommender = Recommender::load(temp.path()).expect("load recommender");
    let proba = recommender
        .predict_proba("101", 60.0, 3.0, 2.0)
        .expect("predict");
    assert_eq!(proba.len(), 5);
    assert!((proba.iter().sum::<f32>() - 1.0).abs() < 1e-5);

    let top = recommender
        .recommend("101", 60.0, 3.0, 2.0, 3)
        .expect("recommend");
    assert_eq!(top.len(), 3);
    assert!(top.windows(2).all(|pair| pair[0].probability >= pair[1].probability));
    assert!(top.iter().all(|rec| rec.course_id.starts_with('5')));

    let err = recommender
        .recommend("no-such-user", 60.0, 3.0, 2.0, 3)
        .unwrap_err();
    assert!(matches!(
        err,
        RecommendError::Preprocess(PreprocessError::UnseenLabel { .. })
    ));
}

#[test]
fn recommender_rejects_tampered_artifacts() {
    let temp = tempdir().expect("tempdir");
    let csv = temp.path().join("training_data.csv");
    write_csv(&csv, &synthetic_rows(30, 3));
    network::run(&quick_config(csv, temp.path().to_path_buf())).expect("network run");

    let other = LabelEncoder::fit("User ID", ["1", "2", "3"]).expect("fit");
    std::fs::write(
        temp.path().join(USER_ENCODER_FILE),
        serde_json::to_vec_pretty(&other).expect("json"),
    )
    .expect("overwrite encoder");

    assert!(Recommender::load(temp.path()).is_err());
}
