//! Training dataset and feature standardization.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::features::FeatureTable;

/// Labeled samples in date order, ready for training.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub feature_names: Vec<String>,
    pub features: Vec<Vec<f64>>,
    pub labels: Vec<u8>,
    pub dates: Vec<NaiveDate>,
}

impl Dataset {
    /// Collect the labeled rows of a feature table. The trailing unlabeled
    /// row never enters a dataset.
    pub fn from_feature_table(table: &FeatureTable) -> Self {
        let mut features = Vec::new();
        let mut labels = Vec::new();
        let mut dates = Vec::new();

        for (date, row, label) in table.labeled() {
            dates.push(date);
            features.push(row.to_vec());
            labels.push(label);
        }

        Self {
            feature_names: table.names.clone(),
            features,
            labels,
            dates,
        }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    /// Fraction of rows labeled "up".
    pub fn positive_ratio(&self) -> f64 {
        if self.labels.is_empty() {
            return 0.0;
        }
        self.labels.iter().filter(|&&l| l == 1).count() as f64 / self.labels.len() as f64
    }

    /// Split into leading train and trailing test rows. No shuffling: every
    /// test date is later than every train date.
    pub fn chronological_split(&self, test_size: f64) -> (Dataset, Dataset) {
        let test_rows = (self.len() as f64 * test_size).round() as usize;
        let split = self.len().saturating_sub(test_rows);
        (self.subset_range(0, split), self.subset_range(split, self.len()))
    }

    fn subset_range(&self, start: usize, end: usize) -> Dataset {
        Dataset {
            feature_names: self.feature_names.clone(),
            features: self.features[start..end].to_vec(),
            labels: self.labels[start..end].to_vec(),
            dates: self.dates[start..end].to_vec(),
        }
    }

    /// Rows at the given indices, in the given order.
    pub fn subset(&self, indices: &[usize]) -> Dataset {
        Dataset {
            feature_names: self.feature_names.clone(),
            features: indices.iter().map(|&i| self.features[i].clone()).collect(),
            labels: indices.iter().map(|&i| self.labels[i]).collect(),
            dates: indices.iter().map(|&i| self.dates[i]).collect(),
        }
    }
}

/// Column-wise standardization fitted on training data.
///
/// Persisted inside the model artifact so prediction-time rows go through
/// the same transform the model was trained on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scaler {
    pub means: Vec<f64>,
    pub stds: Vec<f64>,
}

impl Scaler {
    pub fn fit(rows: &[Vec<f64>]) -> Self {
        if rows.is_empty() {
            return Self {
                means: Vec::new(),
                stds: Vec::new(),
            };
        }

        let n_cols = rows[0].len();
        let n = rows.len() as f64;

        let mut means = vec![0.0; n_cols];
        for row in rows {
            for (m, v) in means.iter_mut().zip(row.iter()) {
                *m += v;
            }
        }
        for m in &mut means {
            *m /= n;
        }

        let mut stds = vec![0.0; n_cols];
        for row in rows {
            for (s, (v, m)) in stds.iter_mut().zip(row.iter().zip(means.iter())) {
                *s += (v - m).powi(2);
            }
        }
        for s in &mut stds {
            *s = (*s / n).sqrt();
            // A constant column standardizes to zero, not infinity.
            if *s == 0.0 {
                *s = 1.0;
            }
        }

        Self { means, stds }
    }

    pub fn transform_row(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .zip(self.means.iter().zip(self.stds.iter()))
            .map(|(v, (m, s))| (v - m) / s)
            .collect()
    }

    pub fn transform(&self, rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
        rows.iter().map(|r| self.transform_row(r)).collect()
    }
}
