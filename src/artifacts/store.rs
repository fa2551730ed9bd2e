use std::path::{Path, PathBuf};

use tracing::debug;

use super::{Artifact, ArtifactError, ArtifactKind, ArtifactManifest, ArtifactRecord};

/// Directory holding the artifacts of one or more pipeline runs.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, file_name: &str) -> PathBuf {
        self.root.join(file_name)
    }

    pub fn ensure_root(&self) -> Result<(), ArtifactError> {
        std::fs::create_dir_all(&self.root).map_err(|source| ArtifactError::CreateDir {
            path: self.root.clone(),
            source,
        })
    }

    /// Validate and write `value` under the conventional name for `kind`.
    pub fn write<A: Artifact>(
        &self,
        kind: ArtifactKind,
        value: &A,
    ) -> Result<ArtifactRecord, ArtifactError> {
        let file_name = kind.file_name();
        let bytes = self.write_json(file_name, value)?;
        Ok(ArtifactRecord {
            kind,
            file_name: file_name.to_string(),
            blake3: blake3::hash(&bytes).to_hex().to_string(),
        })
    }

    pub fn write_manifest(
        &self,
        file_name: &str,
        manifest: &ArtifactManifest,
    ) -> Result<PathBuf, ArtifactError> {
        self.write_json(file_name, manifest)?;
        Ok(self.path(file_name))
    }

    /// Read and validate an artifact by file name.
    pub fn read<A: Artifact>(&self, file_name: &str) -> Result<A, ArtifactError> {
        let path = self.path(file_name);
        let bytes = self.read_bytes(&path)?;
        parse(&path, &bytes)
    }

    /// Read the artifact a manifest lists for `kind`, checking its digest.
    pub fn read_recorded<A: Artifact>(
        &self,
        manifest: &ArtifactManifest,
        kind: ArtifactKind,
    ) -> Result<A, ArtifactError> {
        let record = manifest
            .artifact(kind)
            .ok_or(ArtifactError::NotListed(kind))?;
        let path = self.path(&record.file_name);
        let bytes = self.read_bytes(&path)?;
        let actual = blake3::hash(&bytes).to_hex().to_string();
        if actual != record.blake3 {
            return Err(ArtifactError::HashMismatch {
                path,
                expected: record.blake3.clone(),
                actual,
            });
        }
        parse(&path, &bytes)
    }

    fn write_json<A: Artifact>(&self, file_name: &str, value: &A) -> Result<Vec<u8>, ArtifactError> {
        let path = self.path(file_name);
        value.validate().map_err(|reason| ArtifactError::Invalid {
            label: A::LABEL,
            path: path.clone(),
            reason,
        })?;
        let bytes = serde_json::to_vec_pretty(value).map_err(|source| ArtifactError::Json {
            path: path.clone(),
            source,
        })?;
        self.ensure_root()?;
        // Stage next to the target so a failed write never leaves a truncated artifact.
        let staging = path.with_extension("json.partial");
        std::fs::write(&staging, &bytes).map_err(|source| ArtifactError::Write {
            path: staging.clone(),
            source,
        })?;
        if let Err(source) = std::fs::rename(&staging, &path) {
            let _ = std::fs::remove_file(&staging);
            return Err(ArtifactError::Write { path, source });
        }
        debug!(path = %path.display(), bytes = bytes.len(), "artifact written");
        Ok(bytes)
    }

    fn read_bytes(&self, path: &Path) -> Result<Vec<u8>, ArtifactError> {
        std::fs::read(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                ArtifactError::Missing {
                    path: path.to_path_buf(),
                }
            } else {
                ArtifactError::Read {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })
    }
}

fn parse<A: Artifact>(path: &Path, bytes: &[u8]) -> Result<A, ArtifactError> {
    let value: A = serde_json::from_slice(bytes).map_err(|source| ArtifactError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    value.validate().map_err(|reason| ArtifactError::Invalid {
        label: A::LABEL,
        path: path.to_path_buf(),
        reason,
    })?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::{DatasetSummary, PipelineKind, SplitSummary};
    use crate::preprocess::{LabelEncoder, MinMaxScaler};
    use tempfile::tempdir;

    fn encoder() -> LabelEncoder {
        LabelEncoder::fit("Course ID", ["301", "12", "45"]).unwrap()
    }

    fn manifest_for(records: Vec<ArtifactRecord>) -> ArtifactManifest {
        ArtifactManifest {
            format_version: ArtifactManifest::FORMAT_VERSION,
            pipeline: PipelineKind::Network,
            created_at: "2024-01-01T00:00:00Z".to_string(),
            dataset: DatasetSummary {
                source: "mem".to_string(),
                fingerprint: "f".to_string(),
                rows: 5,
                train_rows: 4,
                test_rows: 1,
            },
            features: vec!["User ID".into()],
            classes: vec!["12".into(), "45".into(), "301".into()],
            class_count: 3,
            split: SplitSummary {
                seed: 42,
                test_fraction: 0.2,
            },
            evaluation: None,
            final_epoch: None,
            user_vocabulary: None,
            artifacts: records,
        }
    }

    #[test]
    fn write_then_read_round_trips() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().join("nested"));
        let record = store.write(ArtifactKind::CourseEncoder, &encoder()).unwrap();
        assert_eq!(record.file_name, "course_encoder.json");
        let restored: LabelEncoder = store.read("course_encoder.json").unwrap();
        assert_eq!(restored, encoder());
        assert_eq!(restored.transform("301").unwrap(), 2);
    }

    #[test]
    fn missing_file_is_reported() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let err = store.read::<MinMaxScaler>("scaler.json").unwrap_err();
        assert!(matches!(err, ArtifactError::Missing { .. }));
    }

    #[test]
    fn tampered_file_fails_digest_check() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let record = store.write(ArtifactKind::CourseEncoder, &encoder()).unwrap();
        let manifest = manifest_for(vec![record]);

        let ok: LabelEncoder = store
            .read_recorded(&manifest, ArtifactKind::CourseEncoder)
            .unwrap();
        assert_eq!(ok.len(), 3);

        let other = LabelEncoder::fit("Course ID", ["1", "2"]).unwrap();
        std::fs::write(
            store.path("course_encoder.json"),
            serde_json::to_vec_pretty(&other).unwrap(),
        )
        .unwrap();
        let err = store
            .read_recorded::<LabelEncoder>(&manifest, ArtifactKind::CourseEncoder)
            .unwrap_err();
        assert!(matches!(err, ArtifactError::HashMismatch { .. }));
    }

    #[test]
    fn unlisted_kind_is_reported() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let err = store
            .read_recorded::<MinMaxScaler>(&manifest_for(Vec::new()), ArtifactKind::Scaler)
            .unwrap_err();
        assert!(matches!(err, ArtifactError::NotListed(ArtifactKind::Scaler)));
    }

    #[test]
    fn structurally_invalid_json_is_rejected() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        std::fs::write(
            store.path("scaler.json"),
            r#"{"feature_names":["a"],"data_min":[0.0,1.0],"data_max":[1.0]}"#,
        )
        .unwrap();
        let err = store.read::<MinMaxScaler>("scaler.json").unwrap_err();
        assert!(matches!(err, ArtifactError::Invalid { label: "scaler", .. }));
    }

    #[test]
    fn failed_rename_removes_staging_file() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let blocker = store.path("course_encoder.json");
        std::fs::create_dir(&blocker).unwrap();
        std::fs::write(blocker.join("keep"), "x").unwrap();

        let err = store
            .write(ArtifactKind::CourseEncoder, &encoder())
            .unwrap_err();
        assert!(matches!(err, ArtifactError::Write { .. }));
        assert!(!store.path("course_encoder.json.partial").exists());
    }

    #[test]
    fn manifest_round_trips() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let records = [
            ArtifactKind::NetworkModel,
            ArtifactKind::UserEncoder,
            ArtifactKind::CourseEncoder,
            ArtifactKind::Scaler,
        ]
        .into_iter()
        .map(|kind| ArtifactRecord {
            kind,
            file_name: kind.file_name().to_string(),
            blake3: "00".to_string(),
        })
        .collect();
        let manifest = manifest_for(records);
        let path = store.write_manifest("network_manifest.json", &manifest).unwrap();
        assert!(path.is_file());
        let restored: ArtifactManifest = store.read("network_manifest.json").unwrap();
        assert_eq!(restored, manifest);
    }
}
