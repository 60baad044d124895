//! JSON model artifact persistence.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::domain::artifact::{ArtifactMetadata, ModelArtifact};
use crate::domain::error::IndexcastError;
use crate::ports::artifact_port::ArtifactPort;

pub struct JsonArtifactAdapter {
    path: PathBuf,
    metadata_path: PathBuf,
}

impl JsonArtifactAdapter {
    pub fn new(dir: impl AsRef<Path>, name: &str) -> Self {
        Self {
            path: dir.as_ref().join(format!("{}.json", name)),
            metadata_path: dir.as_ref().join(format!("{}_metadata.json", name)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn metadata_path(&self) -> &Path {
        &self.metadata_path
    }

    /// The metadata sidecar alone, without deserializing the model weights.
    pub fn load_metadata(&self) -> Result<ArtifactMetadata, IndexcastError> {
        let content =
            fs::read_to_string(&self.metadata_path).map_err(|e| IndexcastError::ArtifactLoad {
                path: self.metadata_path.display().to_string(),
                reason: e.to_string(),
            })?;
        serde_json::from_str(&content).map_err(|e| IndexcastError::ArtifactLoad {
            path: self.metadata_path.display().to_string(),
            reason: format!("corrupt metadata: {}", e),
        })
    }
}

impl ArtifactPort for JsonArtifactAdapter {
    fn save(&self, artifact: &ModelArtifact) -> Result<(), IndexcastError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string(artifact).map_err(|e| IndexcastError::Store {
            reason: format!("artifact encode error: {}", e),
        })?;
        fs::write(&self.path, json)?;

        let metadata =
            serde_json::to_string_pretty(&artifact.metadata).map_err(|e| IndexcastError::Store {
                reason: format!("metadata encode error: {}", e),
            })?;
        fs::write(&self.metadata_path, metadata)?;

        info!(path = %self.path.display(), "model artifact saved");
        Ok(())
    }

    fn load(&self) -> Result<ModelArtifact, IndexcastError> {
        let content = fs::read_to_string(&self.path).map_err(|e| IndexcastError::ArtifactLoad {
            path: self.path.display().to_string(),
            reason: e.to_string(),
        })?;
        serde_json::from_str(&content).map_err(|e| IndexcastError::ArtifactLoad {
            path: self.path.display().to_string(),
            reason: format!("corrupt artifact: {}", e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::artifact::ArtifactMetadata;
    use crate::domain::dataset::{Dataset, Scaler};
    use crate::domain::metrics::{Evaluation, SelectionMetric};
    use crate::domain::model::{Classifier, HyperParams, ModelKind};
    use chrono::{NaiveDate, Utc};
    use tempfile::TempDir;

    fn sample_artifact() -> ModelArtifact {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let ds = Dataset {
            feature_names: vec!["a".into(), "b".into()],
            features: (0..24).map(|i| vec![i as f64, (24 - i) as f64]).collect(),
            labels: (0..24).map(|i| u8::from(i >= 12)).collect(),
            dates: (0..24).map(|i| start + chrono::Days::new(i)).collect(),
        };
        let params = HyperParams {
            n_estimators: 8,
            ..HyperParams::default()
        };
        ModelArtifact {
            classifier: Classifier::fit(ModelKind::GradientBoost, params.clone(), &ds).unwrap(),
            scaler: Scaler::fit(&ds.features),
            metadata: ArtifactMetadata {
                model_kind: ModelKind::GradientBoost,
                target: "IDX".into(),
                feature_names: ds.feature_names.clone(),
                train_start: start,
                train_end: start + chrono::Days::new(23),
                train_rows: 24,
                test_rows: 0,
                metric: SelectionMetric::Accuracy,
                cv_score: 0.9,
                cv_std: 0.02,
                test: Evaluation::compute(&[1], &[1]),
                params,
                trained_at: Utc::now(),
            },
        }
    }

    #[test]
    fn save_load_round_trip_predicts_identically() {
        let dir = TempDir::new().unwrap();
        let adapter = JsonArtifactAdapter::new(dir.path().join("models"), "current_model");
        let artifact = sample_artifact();

        adapter.save(&artifact).unwrap();
        let loaded = adapter.load().unwrap();

        assert_eq!(loaded.metadata.target, "IDX");
        for i in 0..24 {
            let row = vec![i as f64, (24 - i) as f64];
            let a = artifact
                .classifier
                .predict_proba_row(&artifact.scaler.transform_row(&row));
            let b = loaded
                .classifier
                .predict_proba_row(&loaded.scaler.transform_row(&row));
            assert_eq!(a, b);
        }
    }

    #[test]
    fn missing_artifact_is_a_load_error() {
        let dir = TempDir::new().unwrap();
        let adapter = JsonArtifactAdapter::new(dir.path(), "nope");
        assert!(matches!(
            adapter.load(),
            Err(IndexcastError::ArtifactLoad { .. })
        ));
    }

    #[test]
    fn corrupt_artifact_is_a_load_error() {
        let dir = TempDir::new().unwrap();
        let adapter = JsonArtifactAdapter::new(dir.path(), "current_model");
        fs::write(adapter.path(), "{not json").unwrap();
        match adapter.load() {
            Err(IndexcastError::ArtifactLoad { reason, .. }) => {
                assert!(reason.contains("corrupt"), "{}", reason);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn metadata_sidecar_is_written_and_readable() {
        let dir = TempDir::new().unwrap();
        let adapter = JsonArtifactAdapter::new(dir.path().join("models"), "current_model");
        let artifact = sample_artifact();

        adapter.save(&artifact).unwrap();
        assert!(adapter.metadata_path().exists());

        let metadata = adapter.load_metadata().unwrap();
        assert_eq!(metadata.feature_names, artifact.metadata.feature_names);
        assert_eq!(metadata.cv_score, artifact.metadata.cv_score);
    }

    #[test]
    fn save_replaces_the_previous_artifact() {
        let dir = TempDir::new().unwrap();
        let adapter = JsonArtifactAdapter::new(dir.path(), "current_model");

        let first = sample_artifact();
        adapter.save(&first).unwrap();

        let mut second = sample_artifact();
        second.metadata.cv_score = 0.123;
        adapter.save(&second).unwrap();

        let loaded = adapter.load().unwrap();
        assert_eq!(loaded.metadata.cv_score, 0.123);
    }
}
