//! Gradient-boosted trees for binary direction classification.
//!
//! Logistic loss: each round fits a variance-split tree to the residual
//! `y - sigmoid(F)` and adds it to the additive score with shrinkage. The
//! reported probability is `sigmoid(F(x))`.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::dataset::Dataset;
use crate::domain::error::IndexcastError;
use crate::domain::model::tree::{SplitCriterion, Tree, TreeParams};
use crate::domain::model::HyperParams;

pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostClassifier {
    params: HyperParams,
    init_score: f64,
    trees: Vec<Tree>,
    feature_names: Vec<String>,
    importance: Vec<f64>,
}

impl GradientBoostClassifier {
    pub fn new(params: HyperParams) -> Self {
        Self {
            params,
            init_score: 0.0,
            trees: Vec::new(),
            feature_names: Vec::new(),
            importance: Vec::new(),
        }
    }

    pub fn fit(&mut self, dataset: &Dataset) -> Result<(), IndexcastError> {
        if dataset.is_empty() {
            return Err(IndexcastError::InsufficientData {
                rows: 0,
                minimum: 1,
            });
        }

        let n = dataset.len();
        let targets: Vec<f64> = dataset.labels.iter().map(|&l| f64::from(l)).collect();

        // Prior log-odds, clamped away from degenerate all-one-class inputs.
        let positive = targets.iter().sum::<f64>() / n as f64;
        let p0 = positive.clamp(1e-6, 1.0 - 1e-6);
        self.init_score = (p0 / (1.0 - p0)).ln();

        let mut scores = vec![self.init_score; n];
        let mut rng = ChaCha8Rng::seed_from_u64(self.params.seed);
        let tree_params = TreeParams {
            max_depth: self.params.max_depth,
            min_samples_split: self.params.min_samples_split,
            min_samples_leaf: self.params.min_samples_leaf,
            max_features: None,
        };

        self.trees = Vec::with_capacity(self.params.n_estimators);
        self.importance = vec![0.0; dataset.n_features()];

        let sample_size = ((n as f64 * self.params.subsample).round() as usize).clamp(1, n);
        let mut residuals = vec![0.0; n];

        for round in 0..self.params.n_estimators {
            for i in 0..n {
                residuals[i] = targets[i] - sigmoid(scores[i]);
            }

            let indices: Vec<usize> = if sample_size < n {
                let mut all: Vec<usize> = (0..n).collect();
                all.shuffle(&mut rng);
                all.truncate(sample_size);
                all
            } else {
                (0..n).collect()
            };

            let mut tree = Tree::new(SplitCriterion::Variance, tree_params.clone());
            tree.fit(&dataset.features, &residuals, &indices, &mut rng);

            for (i, row) in dataset.features.iter().enumerate() {
                scores[i] += self.params.learning_rate * tree.predict_row(row);
            }
            for (total, part) in self.importance.iter_mut().zip(tree.importance()) {
                *total += part;
            }
            self.trees.push(tree);

            if (round + 1) % 50 == 0 {
                debug!(round = round + 1, "boosting round complete");
            }
        }

        let total: f64 = self.importance.iter().sum();
        if total > 0.0 {
            for imp in &mut self.importance {
                *imp /= total;
            }
        }
        self.feature_names = dataset.feature_names.clone();

        Ok(())
    }

    /// Probability that the next close is higher.
    pub fn predict_proba_row(&self, row: &[f64]) -> f64 {
        let mut score = self.init_score;
        for tree in &self.trees {
            score += self.params.learning_rate * tree.predict_row(row);
        }
        sigmoid(score)
    }

    pub fn predict_row(&self, row: &[f64]) -> u8 {
        u8::from(self.predict_proba_row(row) > 0.5)
    }

    pub fn predict(&self, rows: &[Vec<f64>]) -> Vec<u8> {
        rows.iter().map(|r| self.predict_row(r)).collect()
    }

    pub fn importance(&self) -> &[f64] {
        &self.importance
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn params(&self) -> &HyperParams {
        &self.params
    }
}
