//! Model training: cross-validated grid search and final evaluation.

use chrono::Utc;
use tracing::info;

use crate::domain::artifact::{ArtifactMetadata, ModelArtifact};
use crate::domain::dataset::{Dataset, Scaler};
use crate::domain::error::IndexcastError;
use crate::domain::metrics::{Evaluation, SelectionMetric};
use crate::domain::model::{Classifier, HyperParams, ModelKind};

/// One candidate configuration of the bounded grid search.
#[derive(Debug, Clone, Copy)]
pub struct GridPoint {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
}

/// The fixed search grid.
pub fn default_grid() -> Vec<GridPoint> {
    vec![
        GridPoint { n_estimators: 100, learning_rate: 0.1, max_depth: 3 },
        GridPoint { n_estimators: 200, learning_rate: 0.05, max_depth: 5 },
        GridPoint { n_estimators: 100, learning_rate: 0.1, max_depth: 6 },
        GridPoint { n_estimators: 150, learning_rate: 0.05, max_depth: 4 },
        GridPoint { n_estimators: 100, learning_rate: 0.01, max_depth: 7 },
    ]
}

#[derive(Debug, Clone)]
pub struct TrainConfig {
    pub kind: ModelKind,
    /// Name of the target column, recorded in the artifact metadata.
    pub target: String,
    pub metric: SelectionMetric,
    pub test_size: f64,
    pub cv_folds: usize,
    pub seed: u64,
    pub grid: Vec<GridPoint>,
    /// Accuracy the final model should beat to count as a success.
    pub success_threshold: f64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            kind: ModelKind::GradientBoost,
            target: String::new(),
            metric: SelectionMetric::Accuracy,
            test_size: 0.2,
            cv_folds: 5,
            seed: 42,
            grid: default_grid(),
            success_threshold: 0.55,
        }
    }
}

/// Per-configuration cross-validation summary.
#[derive(Debug, Clone)]
pub struct CvSummary {
    pub fold_scores: Vec<f64>,
    pub mean: f64,
    pub std: f64,
}

#[derive(Debug, Clone)]
pub struct GridResult {
    pub point: GridPoint,
    pub cv: CvSummary,
}

#[derive(Debug)]
pub struct TrainOutcome {
    pub artifact: ModelArtifact,
    pub grid_results: Vec<GridResult>,
    pub best_index: usize,
    pub success: bool,
}

/// Contiguous, unshuffled k-fold splits: deterministic for a given length.
pub fn k_fold_splits(n_samples: usize, n_folds: usize) -> Vec<(Vec<usize>, Vec<usize>)> {
    let fold_size = n_samples / n_folds;
    let mut splits = Vec::with_capacity(n_folds);

    for fold in 0..n_folds {
        let test_start = fold * fold_size;
        let test_end = if fold == n_folds - 1 {
            n_samples
        } else {
            (fold + 1) * fold_size
        };

        let test: Vec<usize> = (test_start..test_end).collect();
        let train: Vec<usize> = (0..test_start).chain(test_end..n_samples).collect();
        splits.push((train, test));
    }

    splits
}

/// Mean and spread of the selection metric across folds.
pub fn cross_validate(
    kind: ModelKind,
    params: &HyperParams,
    dataset: &Dataset,
    n_folds: usize,
    metric: SelectionMetric,
) -> Result<CvSummary, IndexcastError> {
    let minimum = n_folds * 2;
    if dataset.len() < minimum {
        return Err(IndexcastError::InsufficientData {
            rows: dataset.len(),
            minimum,
        });
    }

    let mut fold_scores = Vec::with_capacity(n_folds);
    for (train_idx, test_idx) in k_fold_splits(dataset.len(), n_folds) {
        let train = dataset.subset(&train_idx);
        let test = dataset.subset(&test_idx);

        let model = Classifier::fit(kind, params.clone(), &train)?;
        let predictions = model.predict(&test.features);
        let eval = Evaluation::compute(&test.labels, &predictions);
        fold_scores.push(metric.score(&eval));
    }

    let mean = fold_scores.iter().sum::<f64>() / fold_scores.len() as f64;
    let std = (fold_scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>()
        / fold_scores.len() as f64)
        .sqrt();

    Ok(CvSummary {
        fold_scores,
        mean,
        std,
    })
}

fn params_for(point: &GridPoint, seed: u64) -> HyperParams {
    HyperParams {
        n_estimators: point.n_estimators,
        learning_rate: point.learning_rate,
        max_depth: point.max_depth,
        seed,
        ..HyperParams::default()
    }
}

/// Full training run: chronological split, grid search by cross-validated
/// metric, final fit on the train rows, held-out evaluation, artifact
/// assembly.
pub fn train(dataset: &Dataset, config: &TrainConfig) -> Result<TrainOutcome, IndexcastError> {
    let minimum = config.cv_folds * 2 + 1;
    if dataset.len() < minimum {
        return Err(IndexcastError::InsufficientData {
            rows: dataset.len(),
            minimum,
        });
    }

    let (train_raw, test_raw) = dataset.chronological_split(config.test_size);
    info!(
        train_rows = train_raw.len(),
        test_rows = test_raw.len(),
        model = %config.kind,
        "starting grid search"
    );

    // The scaler sees only training rows; test and live rows reuse it.
    let scaler = Scaler::fit(&train_raw.features);
    let mut train = train_raw.clone();
    train.features = scaler.transform(&train_raw.features);
    let mut test = test_raw.clone();
    test.features = scaler.transform(&test_raw.features);

    let mut grid_results = Vec::with_capacity(config.grid.len());
    let mut best_index = 0;
    for (i, point) in config.grid.iter().enumerate() {
        let params = params_for(point, config.seed);
        let cv = cross_validate(config.kind, &params, &train, config.cv_folds, config.metric)?;
        info!(
            n_estimators = point.n_estimators,
            learning_rate = point.learning_rate,
            max_depth = point.max_depth,
            cv_mean = cv.mean,
            cv_std = cv.std,
            "grid point evaluated"
        );
        if cv.mean > grid_results.get(best_index).map(|r: &GridResult| r.cv.mean).unwrap_or(f64::NEG_INFINITY) {
            best_index = i;
        }
        grid_results.push(GridResult { point: *point, cv });
    }

    let best = &grid_results[best_index];
    let best_params = params_for(&best.point, config.seed);
    let classifier = Classifier::fit(config.kind, best_params.clone(), &train)?;

    let test_eval = if test.is_empty() {
        Evaluation::compute(&[], &[])
    } else {
        Evaluation::compute(&test.labels, &classifier.predict(&test.features))
    };
    let success = test_eval.accuracy > config.success_threshold;

    info!(
        cv_score = best.cv.mean,
        test_accuracy = test_eval.accuracy,
        success,
        "training complete"
    );

    let metadata = ArtifactMetadata {
        model_kind: config.kind,
        target: config.target.clone(),
        feature_names: dataset.feature_names.clone(),
        train_start: *train_raw.dates.first().expect("train set is not empty"),
        train_end: *train_raw.dates.last().expect("train set is not empty"),
        train_rows: train_raw.len(),
        test_rows: test_raw.len(),
        metric: config.metric,
        cv_score: best.cv.mean,
        cv_std: best.cv.std,
        test: test_eval,
        params: best_params,
        trained_at: Utc::now(),
    };

    Ok(TrainOutcome {
        artifact: ModelArtifact {
            classifier,
            scaler,
            metadata,
        },
        grid_results,
        best_index,
        success,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn separable(n: usize) -> Dataset {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        Dataset {
            feature_names: vec!["x0".into(), "x1".into()],
            features: (0..n)
                .map(|i| {
                    let x = i as f64 / n as f64;
                    vec![x, 1.0 - x]
                })
                .collect(),
            labels: (0..n).map(|i| u8::from(i * 2 >= n)).collect(),
            dates: (0..n).map(|i| start + chrono::Days::new(i as u64)).collect(),
        }
    }

    fn quick_config() -> TrainConfig {
        TrainConfig {
            grid: vec![
                GridPoint { n_estimators: 10, learning_rate: 0.2, max_depth: 3 },
                GridPoint { n_estimators: 20, learning_rate: 0.1, max_depth: 2 },
            ],
            ..TrainConfig::default()
        }
    }

    #[test]
    fn k_fold_covers_all_indices_disjointly() {
        let splits = k_fold_splits(23, 5);
        assert_eq!(splits.len(), 5);

        let mut seen = vec![false; 23];
        for (train, test) in &splits {
            assert_eq!(train.len() + test.len(), 23);
            for &i in test {
                assert!(!seen[i], "index {} tested twice", i);
                seen[i] = true;
            }
            for &i in train {
                assert!(!test.contains(&i));
            }
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn cross_validation_is_deterministic() {
        let ds = separable(60);
        let params = HyperParams {
            n_estimators: 10,
            ..HyperParams::default()
        };
        let a = cross_validate(ModelKind::GradientBoost, &params, &ds, 5, SelectionMetric::Accuracy)
            .unwrap();
        let b = cross_validate(ModelKind::GradientBoost, &params, &ds, 5, SelectionMetric::Accuracy)
            .unwrap();
        assert_eq!(a.fold_scores, b.fold_scores);
        assert_eq!(a.mean, b.mean);
    }

    #[test]
    fn cross_validation_rejects_tiny_datasets() {
        let ds = separable(8);
        let err = cross_validate(
            ModelKind::GradientBoost,
            &HyperParams::default(),
            &ds,
            5,
            SelectionMetric::Accuracy,
        )
        .unwrap_err();
        assert!(matches!(err, IndexcastError::InsufficientData { .. }));
    }

    #[test]
    fn train_produces_consistent_artifact() {
        let ds = separable(80);
        let config = quick_config();
        let outcome = train(&ds, &config).unwrap();

        assert_eq!(outcome.grid_results.len(), 2);
        assert!(outcome.best_index < 2);

        let meta = &outcome.artifact.metadata;
        assert_eq!(meta.model_kind, ModelKind::GradientBoost);
        assert_eq!(meta.feature_names, ds.feature_names);
        assert_eq!(meta.train_rows + meta.test_rows, ds.len());
        assert!(meta.train_end < ds.dates[meta.train_rows]);

        // Separable data: the held-out rows should score well.
        assert!(meta.test.accuracy > 0.8);
        assert!(outcome.success);
    }

    #[test]
    fn best_index_is_argmax_of_cv_mean() {
        let ds = separable(80);
        let outcome = train(&ds, &quick_config()).unwrap();
        let best_mean = outcome.grid_results[outcome.best_index].cv.mean;
        for r in &outcome.grid_results {
            assert!(best_mean >= r.cv.mean);
        }
    }

    #[test]
    fn train_rejects_insufficient_rows() {
        let ds = separable(9);
        let err = train(&ds, &quick_config()).unwrap_err();
        assert!(matches!(err, IndexcastError::InsufficientData { .. }));
    }

    #[test]
    fn forest_kind_trains_too() {
        let ds = separable(60);
        let config = TrainConfig {
            kind: ModelKind::RandomForest,
            ..quick_config()
        };
        let outcome = train(&ds, &config).unwrap();
        assert_eq!(outcome.artifact.classifier.kind(), ModelKind::RandomForest);
    }
}
