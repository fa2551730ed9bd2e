//! Top-k course recommendations from a trained artifact directory.

use std::path::Path;

use thiserror::Error;
use tracing::debug;

use crate::artifacts::{
    ArtifactError, ArtifactKind, ArtifactManifest, ArtifactStore, FOREST_MANIFEST_FILE,
    NETWORK_MANIFEST_FILE, PipelineKind,
};
use crate::dataset::USER_ID_COLUMN;
use crate::ml::forest::ForestModel;
use crate::ml::network::NetworkModel;
use crate::pipeline::forest::{self, FOREST_FEATURES};
use crate::pipeline::network::{self, SCALED_COLUMNS};
use crate::preprocess::{LabelEncoder, MinMaxScaler, PreprocessError};

#[derive(Debug, Error)]
pub enum RecommendError {
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
    #[error(transparent)]
    Preprocess(#[from] PreprocessError),
    #[error("Artifacts are inconsistent: {0}")]
    Inconsistent(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Recommendation {
    pub course_id: String,
    pub probability: f32,
}

/// Network plus the fitted preprocessing it was trained with.
#[derive(Debug, Clone)]
pub struct Recommender {
    manifest: ArtifactManifest,
    user_encoder: LabelEncoder,
    course_encoder: LabelEncoder,
    scaler: MinMaxScaler,
    model: NetworkModel,
}

impl Recommender {
    /// Load and cross-check every artifact listed in the network manifest.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, RecommendError> {
        let store = ArtifactStore::new(dir.as_ref());
        let manifest = read_manifest(&store, NETWORK_MANIFEST_FILE, PipelineKind::Network)?;
        let recommender = Self {
            user_encoder: store.read_recorded(&manifest, ArtifactKind::UserEncoder)?,
            course_encoder: store.read_recorded(&manifest, ArtifactKind::CourseEncoder)?,
            scaler: store.read_recorded(&manifest, ArtifactKind::Scaler)?,
            model: store.read_recorded(&manifest, ArtifactKind::NetworkModel)?,
            manifest,
        };
        recommender.check_consistency()?;
        debug!(
            dir = %store.root().display(),
            classes = recommender.model.classes.len(),
            "recommender loaded"
        );
        Ok(recommender)
    }

    fn check_consistency(&self) -> Result<(), RecommendError> {
        let inconsistent = |msg: &str| Err(RecommendError::Inconsistent(msg.to_string()));
        if self.model.classes != self.manifest.classes {
            return inconsistent("model classes differ from the manifest");
        }
        if self.course_encoder.classes() != self.model.classes.as_slice() {
            return inconsistent("course encoder classes differ from the model");
        }
        if self.model.feature_names != self.manifest.features {
            return inconsistent("model features differ from the manifest");
        }
        let expected: Vec<&str> = SCALED_COLUMNS.iter().map(|c| c.name()).collect();
        if self.scaler.feature_names != expected {
            return inconsistent("scaler features do not match the scaled columns");
        }
        if self.model.feature_names.len() != self.scaler.width() + 1 {
            return inconsistent("model input width does not match the preprocessing");
        }
        Ok(())
    }

    pub fn manifest(&self) -> &ArtifactManifest {
        &self.manifest
    }

    pub fn model(&self) -> &NetworkModel {
        &self.model
    }

    /// Probability of every course, in class-code order.
    pub fn predict_proba(
        &self,
        user_id: &str,
        completed: f32,
        rating: f32,
        skill_level: f32,
    ) -> Result<Vec<f32>, RecommendError> {
        let row = network::feature_row(
            &self.user_encoder,
            &self.scaler,
            user_id,
            &[completed, rating, skill_level],
        )?;
        Ok(self.model.predict_proba(&row))
    }

    /// The `top_k` most probable courses, highest first.
    pub fn recommend(
        &self,
        user_id: &str,
        completed: f32,
        rating: f32,
        skill_level: f32,
        top_k: usize,
    ) -> Result<Vec<Recommendation>, RecommendError> {
        let proba = self.predict_proba(user_id, completed, rating, skill_level)?;
        Ok(rank(&proba, self.course_encoder.classes(), top_k))
    }
}

/// Random forest plus the user vocabulary recorded in its manifest.
#[derive(Debug, Clone)]
pub struct ForestRecommender {
    manifest: ArtifactManifest,
    user_encoder: LabelEncoder,
    model: ForestModel,
}

impl ForestRecommender {
    /// Load the forest manifest and model and check they describe the same run.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, RecommendError> {
        let store = ArtifactStore::new(dir.as_ref());
        let manifest = read_manifest(&store, FOREST_MANIFEST_FILE, PipelineKind::Forest)?;
        let user_encoder = manifest.user_vocabulary.clone().ok_or_else(|| {
            RecommendError::Inconsistent("forest manifest has no user vocabulary".to_string())
        })?;
        let recommender = Self {
            model: store.read_recorded(&manifest, ArtifactKind::ForestModel)?,
            user_encoder,
            manifest,
        };
        recommender.check_consistency()?;
        debug!(
            dir = %store.root().display(),
            users = recommender.user_encoder.len(),
            classes = recommender.model.classes.len(),
            "forest recommender loaded"
        );
        Ok(recommender)
    }

    fn check_consistency(&self) -> Result<(), RecommendError> {
        let inconsistent = |msg: &str| Err(RecommendError::Inconsistent(msg.to_string()));
        if self.model.classes != self.manifest.classes {
            return inconsistent("model classes differ from the manifest");
        }
        if self.model.feature_names != self.manifest.features
            || self.model.feature_names != FOREST_FEATURES
        {
            return inconsistent("model features differ from the forest columns");
        }
        if self.user_encoder.column != USER_ID_COLUMN {
            return inconsistent("user vocabulary was fitted on another column");
        }
        Ok(())
    }

    pub fn manifest(&self) -> &ArtifactManifest {
        &self.manifest
    }

    pub fn model(&self) -> &ForestModel {
        &self.model
    }

    /// Probability of every course, in class-code order.
    pub fn predict_proba(
        &self,
        user_id: &str,
        completed: f32,
        skill_level: f32,
    ) -> Result<Vec<f32>, RecommendError> {
        let row = forest::feature_row(&self.user_encoder, user_id, completed, skill_level)?;
        Ok(self.model.predict_proba(&row))
    }

    /// The `top_k` most probable courses, highest first.
    pub fn recommend(
        &self,
        user_id: &str,
        completed: f32,
        skill_level: f32,
        top_k: usize,
    ) -> Result<Vec<Recommendation>, RecommendError> {
        let proba = self.predict_proba(user_id, completed, skill_level)?;
        Ok(rank(&proba, &self.model.classes, top_k))
    }
}

fn read_manifest(
    store: &ArtifactStore,
    file_name: &str,
    pipeline: PipelineKind,
) -> Result<ArtifactManifest, RecommendError> {
    let manifest: ArtifactManifest = store.read(file_name)?;
    if manifest.pipeline != pipeline {
        return Err(RecommendError::Inconsistent(format!(
            "{file_name} describes a {:?} run",
            manifest.pipeline
        )));
    }
    Ok(manifest)
}

/// Sort by descending probability; equal probabilities keep class-code order.
fn rank(proba: &[f32], courses: &[String], top_k: usize) -> Vec<Recommendation> {
    let mut order: Vec<usize> = (0..proba.len()).collect();
    order.sort_by(|&a, &b| proba[b].total_cmp(&proba[a]));
    order
        .into_iter()
        .take(top_k)
        .filter_map(|idx| {
            courses.get(idx).map(|course| Recommendation {
                course_id: course.clone(),
                probability: proba[idx],
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rank_orders_by_probability_and_truncates() {
        let courses = LabelEncoder::fit("Course ID", ["10", "20", "30", "40"]).unwrap();
        let ranked = rank(&[0.1, 0.4, 0.1, 0.4], courses.classes(), 3);
        let ids: Vec<&str> = ranked.iter().map(|r| r.course_id.as_str()).collect();
        assert_eq!(ids, vec!["20", "40", "10"]);
        assert_eq!(ranked[0].probability, 0.4);
    }

    #[test]
    fn rank_with_zero_k_is_empty() {
        assert!(rank(&[1.0], &["a".to_string()], 0).is_empty());
    }
}
