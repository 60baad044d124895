//! Random forest alternative to the boosted classifier.
//!
//! Bootstrap-sampled gini trees with sqrt-feature subsampling; the
//! probability is the mean leaf positive-fraction across trees.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::domain::dataset::Dataset;
use crate::domain::error::IndexcastError;
use crate::domain::model::tree::{SplitCriterion, Tree, TreeParams};
use crate::domain::model::HyperParams;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForestClassifier {
    params: HyperParams,
    trees: Vec<Tree>,
    feature_names: Vec<String>,
    importance: Vec<f64>,
}

impl RandomForestClassifier {
    pub fn new(params: HyperParams) -> Self {
        Self {
            params,
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
        let max_features = (dataset.n_features() as f64).sqrt().round().max(1.0) as usize;

        let tree_params = TreeParams {
            max_depth: self.params.max_depth,
            min_samples_split: self.params.min_samples_split,
            min_samples_leaf: self.params.min_samples_leaf,
            max_features: Some(max_features),
        };

        let mut rng = ChaCha8Rng::seed_from_u64(self.params.seed);
        self.trees = Vec::with_capacity(self.params.n_estimators);
        self.importance = vec![0.0; dataset.n_features()];

        for _ in 0..self.params.n_estimators {
            let indices: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();

            let mut tree = Tree::new(SplitCriterion::Gini, tree_params.clone());
            tree.fit(&dataset.features, &targets, &indices, &mut rng);

            for (total, part) in self.importance.iter_mut().zip(tree.importance()) {
                *total += part;
            }
            self.trees.push(tree);
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

    /// Mean positive fraction across trees: the forest's vote share.
    pub fn predict_proba_row(&self, row: &[f64]) -> f64 {
        if self.trees.is_empty() {
            return 0.5;
        }
        let sum: f64 = self.trees.iter().map(|t| t.predict_row(row)).sum();
        sum / self.trees.len() as f64
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
