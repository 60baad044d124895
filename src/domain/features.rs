//! Feature engineering: percent changes, lag features and direction labels.

use chrono::NaiveDate;

use crate::domain::error::IndexcastError;
use crate::domain::series::PriceTable;

/// Feature builder configuration.
#[derive(Debug, Clone)]
pub struct FeatureConfig {
    /// Column whose next-day direction is predicted.
    pub target: String,
    /// Lag horizons, in trading days, applied to every non-target column.
    pub lags: Vec<usize>,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            target: "BIST100".to_string(),
            lags: vec![1, 10, 30],
        }
    }
}

/// Date-indexed feature rows plus the per-row direction label.
///
/// The final row carries no label (there is no next-day close yet) and is the
/// row scored for a live prediction. Every other row is fully populated: rows
/// whose lag columns could not be filled are dropped during construction.
#[derive(Debug, Clone)]
pub struct FeatureTable {
    pub dates: Vec<NaiveDate>,
    pub names: Vec<String>,
    pub rows: Vec<Vec<f64>>,
    pub labels: Vec<Option<u8>>,
    pub target: String,
}

impl FeatureTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows with a known outcome, in date order.
    pub fn labeled(&self) -> impl Iterator<Item = (NaiveDate, &[f64], u8)> + '_ {
        self.rows
            .iter()
            .zip(self.labels.iter())
            .zip(self.dates.iter())
            .filter_map(|((row, label), date)| label.map(|l| (*date, row.as_slice(), l)))
    }

    pub fn labeled_count(&self) -> usize {
        self.labels.iter().filter(|l| l.is_some()).count()
    }

    /// The most recent row, labeled or not.
    pub fn latest(&self) -> Option<(NaiveDate, &[f64])> {
        let last = self.rows.len().checked_sub(1)?;
        Some((self.dates[last], self.rows[last].as_slice()))
    }
}

/// Build the feature table from a gap-filled price table.
///
/// Per column: the daily fractional change, named `<col>_change`. Per
/// non-target column and lag L: the change shifted back L rows, named
/// `<col>_change_lag<L>`. The label compares the target close against the
/// following row's target close.
pub fn build_features(
    table: &PriceTable,
    config: &FeatureConfig,
) -> Result<FeatureTable, IndexcastError> {
    let target_idx =
        table
            .column_index(&config.target)
            .ok_or_else(|| IndexcastError::ConfigInvalid {
                section: "data".into(),
                key: "target".into(),
                reason: format!("column {} not present in price table", config.target),
            })?;

    let max_lag = config.lags.iter().copied().max().unwrap_or(0);
    // Need max_lag change rows of warmup, one change row to predict from and
    // at least one labeled row.
    if table.len() < max_lag + 3 {
        return Err(IndexcastError::InsufficientData {
            rows: table.len(),
            minimum: max_lag + 3,
        });
    }

    let pct = table.pct_change();

    let mut names: Vec<String> = pct
        .columns
        .iter()
        .map(|c| format!("{}_change", c))
        .collect();
    for (col, name) in pct.columns.iter().enumerate() {
        if col == target_idx {
            continue;
        }
        for lag in &config.lags {
            names.push(format!("{}_change_lag{}", name, lag));
        }
    }

    let target_closes = table
        .column(&config.target)
        .expect("target column checked above");

    let mut dates = Vec::new();
    let mut rows = Vec::new();
    let mut labels = Vec::new();

    // pct row j sits at raw row j + 1. Rows before max_lag have unfilled
    // lags and are dropped.
    for j in max_lag..pct.len() {
        let mut row = pct.values[j].clone();
        for (col, _) in pct.columns.iter().enumerate() {
            if col == target_idx {
                continue;
            }
            for lag in &config.lags {
                row.push(pct.values[j - lag][col]);
            }
        }

        let raw = j + 1;
        let label = if raw + 1 < table.len() {
            Some(u8::from(target_closes[raw + 1] > target_closes[raw]))
        } else {
            None
        };

        dates.push(pct.dates[j]);
        rows.push(row);
        labels.push(label);
    }

    Ok(FeatureTable {
        dates,
        names,
        rows,
        labels,
        target: config.target.clone(),
    })
}
