//! Direction classifiers.
//!
//! The classifier family is a configuration choice: gradient-boosted trees
//! by default, random forest as the alternative. Both are seeded, fully
//! serializable and share one hyperparameter shape.

pub mod boosting;
pub mod forest;
pub mod tree;

pub use boosting::GradientBoostClassifier;
pub use forest::RandomForestClassifier;

use serde::{Deserialize, Serialize};

use crate::domain::dataset::Dataset;
use crate::domain::error::IndexcastError;

/// Hyperparameters shared by both model families. The forest ignores
/// `learning_rate` and `subsample`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HyperParams {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub subsample: f64,
    pub seed: u64,
}

impl Default for HyperParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 3,
            min_samples_split: 2,
            min_samples_leaf: 1,
            subsample: 1.0,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelKind {
    GradientBoost,
    RandomForest,
}

impl ModelKind {
    pub fn parse(value: &str) -> Result<Self, IndexcastError> {
        match value.to_lowercase().as_str() {
            "gradient_boost" | "gbm" => Ok(Self::GradientBoost),
            "random_forest" | "forest" => Ok(Self::RandomForest),
            other => Err(IndexcastError::ConfigInvalid {
                section: "train".into(),
                key: "model".into(),
                reason: format!(
                    "unknown model {} (expected gradient_boost or random_forest)",
                    other
                ),
            }),
        }
    }
}

impl std::fmt::Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GradientBoost => write!(f, "gradient_boost"),
            Self::RandomForest => write!(f, "random_forest"),
        }
    }
}

/// A fitted classifier of either family.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Classifier {
    GradientBoost(GradientBoostClassifier),
    RandomForest(RandomForestClassifier),
}

impl Classifier {
    pub fn fit(
        kind: ModelKind,
        params: HyperParams,
        dataset: &Dataset,
    ) -> Result<Self, IndexcastError> {
        match kind {
            ModelKind::GradientBoost => {
                let mut model = GradientBoostClassifier::new(params);
                model.fit(dataset)?;
                Ok(Self::GradientBoost(model))
            }
            ModelKind::RandomForest => {
                let mut model = RandomForestClassifier::new(params);
                model.fit(dataset)?;
                Ok(Self::RandomForest(model))
            }
        }
    }

    pub fn kind(&self) -> ModelKind {
        match self {
            Self::GradientBoost(_) => ModelKind::GradientBoost,
            Self::RandomForest(_) => ModelKind::RandomForest,
        }
    }

    pub fn predict_proba_row(&self, row: &[f64]) -> f64 {
        match self {
            Self::GradientBoost(m) => m.predict_proba_row(row),
            Self::RandomForest(m) => m.predict_proba_row(row),
        }
    }

    pub fn predict_row(&self, row: &[f64]) -> u8 {
        match self {
            Self::GradientBoost(m) => m.predict_row(row),
            Self::RandomForest(m) => m.predict_row(row),
        }
    }

    pub fn predict(&self, rows: &[Vec<f64>]) -> Vec<u8> {
        match self {
            Self::GradientBoost(m) => m.predict(rows),
            Self::RandomForest(m) => m.predict(rows),
        }
    }

    pub fn importance(&self) -> &[f64] {
        match self {
            Self::GradientBoost(m) => m.importance(),
            Self::RandomForest(m) => m.importance(),
        }
    }

    pub fn feature_names(&self) -> &[String] {
        match self {
            Self::GradientBoost(m) => m.feature_names(),
            Self::RandomForest(m) => m.feature_names(),
        }
    }

    pub fn params(&self) -> &HyperParams {
        match self {
            Self::GradientBoost(m) => m.params(),
            Self::RandomForest(m) => m.params(),
        }
    }

    /// Feature importances paired with names, highest first.
    pub fn ranked_importance(&self) -> Vec<(String, f64)> {
        let mut ranked: Vec<(String, f64)> = self
            .feature_names()
            .iter()
            .cloned()
            .zip(self.importance().iter().copied())
            .collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        ranked
    }
}
