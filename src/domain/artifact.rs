//! Persisted model bundle: classifier, scaler and training metadata.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::dataset::Scaler;
use crate::domain::error::IndexcastError;
use crate::domain::metrics::{Evaluation, SelectionMetric};
use crate::domain::model::{Classifier, HyperParams, ModelKind};

/// Everything recorded about a training run besides the model weights.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    pub model_kind: ModelKind,
    pub target: String,
    pub feature_names: Vec<String>,
    pub train_start: NaiveDate,
    pub train_end: NaiveDate,
    pub train_rows: usize,
    pub test_rows: usize,
    pub metric: SelectionMetric,
    pub cv_score: f64,
    pub cv_std: f64,
    pub test: Evaluation,
    pub params: HyperParams,
    pub trained_at: DateTime<Utc>,
}

/// A fitted model with its scaler and metadata. Immutable once persisted;
/// a retrain writes a whole new artifact in its place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub classifier: Classifier,
    pub scaler: Scaler,
    pub metadata: ArtifactMetadata,
}

impl ModelArtifact {
    /// Reject scoring input whose feature set differs from the one the
    /// model was trained on.
    pub fn check_features(&self, names: &[String]) -> Result<(), IndexcastError> {
        if names == self.metadata.feature_names.as_slice() {
            return Ok(());
        }

        let trained: std::collections::HashSet<&String> =
            self.metadata.feature_names.iter().collect();
        let offered: std::collections::HashSet<&String> = names.iter().collect();

        let missing: Vec<&str> = self
            .metadata
            .feature_names
            .iter()
            .filter(|n| !offered.contains(n))
            .map(|n| n.as_str())
            .collect();
        let extra: Vec<&str> = names
            .iter()
            .filter(|n| !trained.contains(n))
            .map(|n| n.as_str())
            .collect();

        let reason = if missing.is_empty() && extra.is_empty() {
            "feature order differs from the trained model".to_string()
        } else {
            format!(
                "missing [{}], unexpected [{}]",
                missing.join(", "),
                extra.join(", ")
            )
        };

        Err(IndexcastError::FeatureMismatch { reason })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::dataset::Dataset;
    use chrono::NaiveDate;

    fn sample_artifact() -> ModelArtifact {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let ds = Dataset {
            feature_names: vec!["a".into(), "b".into()],
            features: (0..20).map(|i| vec![i as f64, (20 - i) as f64]).collect(),
            labels: (0..20).map(|i| u8::from(i >= 10)).collect(),
            dates: (0..20).map(|i| start + chrono::Days::new(i)).collect(),
        };
        let params = HyperParams {
            n_estimators: 5,
            ..HyperParams::default()
        };
        let classifier = Classifier::fit(ModelKind::GradientBoost, params.clone(), &ds).unwrap();
        ModelArtifact {
            classifier,
            scaler: Scaler::fit(&ds.features),
            metadata: ArtifactMetadata {
                model_kind: ModelKind::GradientBoost,
                target: "IDX".into(),
                feature_names: ds.feature_names.clone(),
                train_start: start,
                train_end: start + chrono::Days::new(19),
                train_rows: 20,
                test_rows: 0,
                metric: SelectionMetric::Accuracy,
                cv_score: 0.8,
                cv_std: 0.05,
                test: Evaluation::compute(&[1, 0], &[1, 0]),
                params,
                trained_at: Utc::now(),
            },
        }
    }

    #[test]
    fn matching_features_pass() {
        let artifact = sample_artifact();
        artifact
            .check_features(&["a".to_string(), "b".to_string()])
            .unwrap();
    }

    #[test]
    fn missing_feature_is_rejected() {
        let artifact = sample_artifact();
        let err = artifact.check_features(&["a".to_string()]).unwrap_err();
        match err {
            IndexcastError::FeatureMismatch { reason } => {
                assert!(reason.contains("missing [b]"), "{}", reason);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn reordered_features_are_rejected() {
        let artifact = sample_artifact();
        let err = artifact
            .check_features(&["b".to_string(), "a".to_string()])
            .unwrap_err();
        match err {
            IndexcastError::FeatureMismatch { reason } => {
                assert!(reason.contains("order"), "{}", reason);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn serde_round_trip_preserves_predictions() {
        let artifact = sample_artifact();
        let json = serde_json::to_string(&artifact).unwrap();
        let back: ModelArtifact = serde_json::from_str(&json).unwrap();

        let row = vec![3.0, 17.0];
        let scaled = artifact.scaler.transform_row(&row);
        let scaled_back = back.scaler.transform_row(&row);
        assert_eq!(scaled, scaled_back);
        assert_eq!(
            artifact.classifier.predict_proba_row(&scaled),
            back.classifier.predict_proba_row(&scaled_back)
        );
    }
}
