//! Scoring the latest feature row and recent empirical accuracy.

use chrono::NaiveDate;

use crate::domain::artifact::ModelArtifact;
use crate::domain::error::IndexcastError;
use crate::domain::features::FeatureTable;

/// Next-day direction forecast for one date.
#[derive(Debug, Clone, Copy)]
pub struct Prediction {
    /// Date of the features the forecast was made from.
    pub date: NaiveDate,
    /// 1 = up, 0 = down.
    pub direction: u8,
    /// Probability of the up class.
    pub probability: f64,
}

/// Empirical accuracy over a trailing window of rows with known outcomes.
#[derive(Debug, Clone, Copy)]
pub struct RecentPerformance {
    /// Requested window size.
    pub window: usize,
    /// Rows actually evaluated (the table may be shorter).
    pub evaluated: usize,
    pub accuracy: f64,
    pub up_days: usize,
    pub down_days: usize,
}

/// Score the most recent feature row with a persisted model.
pub fn predict_latest(
    artifact: &ModelArtifact,
    features: &FeatureTable,
) -> Result<Prediction, IndexcastError> {
    artifact.check_features(&features.names)?;

    let (date, row) = features
        .latest()
        .ok_or(IndexcastError::InsufficientData { rows: 0, minimum: 1 })?;

    let scaled = artifact.scaler.transform_row(row);
    let probability = artifact.classifier.predict_proba_row(&scaled);

    Ok(Prediction {
        date,
        direction: u8::from(probability > 0.5),
        probability,
    })
}

/// Replay the model over the trailing `window` labeled rows and compare
/// against the known outcomes.
pub fn recent_performance(
    artifact: &ModelArtifact,
    features: &FeatureTable,
    window: usize,
) -> Result<RecentPerformance, IndexcastError> {
    artifact.check_features(&features.names)?;

    let labeled: Vec<(NaiveDate, &[f64], u8)> = features.labeled().collect();
    let start = labeled.len().saturating_sub(window);
    let recent = &labeled[start..];

    let mut correct = 0;
    let mut up_days = 0;
    for (_, row, label) in recent {
        let scaled = artifact.scaler.transform_row(row);
        if artifact.classifier.predict_row(&scaled) == *label {
            correct += 1;
        }
        if *label == 1 {
            up_days += 1;
        }
    }

    let evaluated = recent.len();
    Ok(RecentPerformance {
        window,
        evaluated,
        accuracy: if evaluated > 0 {
            correct as f64 / evaluated as f64
        } else {
            0.0
        },
        up_days,
        down_days: evaluated - up_days,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::dataset::Dataset;
    use crate::domain::features::{build_features, FeatureConfig};
    use crate::domain::series::{PricePoint, PriceSeries, PriceTable};
    use crate::domain::trainer::{train, GridPoint, TrainConfig};

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Days::new(u64::from(d))
    }

    fn trending_table(n: usize) -> PriceTable {
        // Alternating rises and falls: tomorrow reverses today, so the
        // day's own change decides the label.
        let mut close = 100.0;
        let mut points = Vec::new();
        for i in 0..n {
            close *= if i % 2 == 0 { 1.01 } else { 0.99 };
            points.push(PricePoint {
                date: date(i as u32),
                close,
            });
        }
        PriceTable::merge(&[PriceSeries::new("IDX", "IDX", points)])
    }

    fn feature_config() -> FeatureConfig {
        FeatureConfig {
            target: "IDX".into(),
            lags: vec![1, 2],
        }
    }

    fn trained_artifact(table: &PriceTable) -> crate::domain::artifact::ModelArtifact {
        let features = build_features(table, &feature_config()).unwrap();
        let dataset = Dataset::from_feature_table(&features);
        let config = TrainConfig {
            target: "IDX".into(),
            grid: vec![GridPoint {
                n_estimators: 20,
                learning_rate: 0.2,
                max_depth: 3,
            }],
            ..TrainConfig::default()
        };
        train(&dataset, &config).unwrap().artifact
    }

    #[test]
    fn prediction_scores_the_latest_row() {
        let table = trending_table(90);
        let artifact = trained_artifact(&table);
        let features = build_features(&table, &feature_config()).unwrap();

        let prediction = predict_latest(&artifact, &features).unwrap();

        assert_eq!(prediction.date, *table.dates.last().unwrap());
        assert!((0.0..=1.0).contains(&prediction.probability));
        assert_eq!(prediction.direction, u8::from(prediction.probability > 0.5));
    }

    #[test]
    fn recent_performance_tracks_the_window() {
        let table = trending_table(90);
        let artifact = trained_artifact(&table);
        let features = build_features(&table, &feature_config()).unwrap();

        let perf = recent_performance(&artifact, &features, 30).unwrap();

        assert_eq!(perf.window, 30);
        assert_eq!(perf.evaluated, 30);
        assert_eq!(perf.up_days + perf.down_days, 30);
        // The pattern is deterministic, so replayed accuracy should be high.
        assert!(perf.accuracy > 0.7, "accuracy {}", perf.accuracy);
    }

    #[test]
    fn window_larger_than_history_uses_what_exists() {
        let table = trending_table(40);
        let artifact = trained_artifact(&table);
        let features = build_features(&table, &feature_config()).unwrap();

        let perf = recent_performance(&artifact, &features, 500).unwrap();
        assert_eq!(perf.evaluated, features.labeled_count());
    }

    #[test]
    fn mismatched_features_are_rejected() {
        let table = trending_table(60);
        let artifact = trained_artifact(&table);

        let other = PriceTable::merge(&[
            PriceSeries::new(
                "IDX",
                "IDX",
                (0..60)
                    .map(|i| PricePoint {
                        date: date(i),
                        close: 100.0 + f64::from(i),
                    })
                    .collect(),
            ),
            PriceSeries::new(
                "GOLD",
                "GOLD",
                (0..60)
                    .map(|i| PricePoint {
                        date: date(i),
                        close: 50.0 + f64::from(i),
                    })
                    .collect(),
            ),
        ]);
        let features = build_features(&other, &feature_config()).unwrap();

        let err = predict_latest(&artifact, &features).unwrap_err();
        assert!(matches!(err, IndexcastError::FeatureMismatch { .. }));
    }
}
