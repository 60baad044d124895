//! Correlation analyses backing the dashboard: pairwise matrix, lagged
//! effects on the target and rolling windows.

use chrono::NaiveDate;

use crate::domain::error::IndexcastError;
use crate::domain::series::PriceTable;

/// Pearson correlation; 0.0 when either side is degenerate.
pub fn pearson(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    if n < 2 {
        return 0.0;
    }
    let a = &a[..n];
    let b = &b[..n];

    let mean_a = a.iter().sum::<f64>() / n as f64;
    let mean_b = b.iter().sum::<f64>() / n as f64;

    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (x, y) in a.iter().zip(b.iter()) {
        cov += (x - mean_a) * (y - mean_b);
        var_a += (x - mean_a).powi(2);
        var_b += (y - mean_b).powi(2);
    }

    let denom = (var_a * var_b).sqrt();
    if denom == 0.0 {
        0.0
    } else {
        cov / denom
    }
}

/// Symmetric pairwise correlation of a table's columns.
#[derive(Debug, Clone)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    pub values: Vec<Vec<f64>>,
}

pub fn correlation_matrix(table: &PriceTable) -> CorrelationMatrix {
    let n = table.columns.len();
    let cols: Vec<Vec<f64>> = table
        .columns
        .iter()
        .map(|c| table.column(c).expect("column exists"))
        .collect();

    let mut values = vec![vec![0.0; n]; n];
    for i in 0..n {
        values[i][i] = 1.0;
        for j in (i + 1)..n {
            let r = pearson(&cols[i], &cols[j]);
            values[i][j] = r;
            values[j][i] = r;
        }
    }

    CorrelationMatrix {
        columns: table.columns.clone(),
        values,
    }
}

/// Correlation between the target's daily change and one variable's change
/// `lag` days earlier.
#[derive(Debug, Clone)]
pub struct LagCorrelation {
    pub variable: String,
    pub lag: usize,
    pub correlation: f64,
}

/// Lagged-effect sweep over every non-target column for lags `1..=max_lag`,
/// computed on daily changes of the raw table.
pub fn lag_correlations(
    table: &PriceTable,
    target: &str,
    max_lag: usize,
) -> Result<Vec<LagCorrelation>, IndexcastError> {
    let target_idx = table
        .column_index(target)
        .ok_or_else(|| IndexcastError::ConfigInvalid {
            section: "data".into(),
            key: "target".into(),
            reason: format!("column {} not present in price table", target),
        })?;

    let pct = table.pct_change();
    if pct.len() <= max_lag + 1 {
        return Err(IndexcastError::InsufficientData {
            rows: pct.len(),
            minimum: max_lag + 2,
        });
    }

    let target_changes: Vec<f64> = pct.values.iter().map(|r| r[target_idx]).collect();
    let mut results = Vec::new();

    for (col, name) in pct.columns.iter().enumerate() {
        if col == target_idx {
            continue;
        }
        let changes: Vec<f64> = pct.values.iter().map(|r| r[col]).collect();
        for lag in 1..=max_lag {
            let correlation = pearson(&target_changes[lag..], &changes[..changes.len() - lag]);
            results.push(LagCorrelation {
                variable: name.clone(),
                lag,
                correlation,
            });
        }
    }

    Ok(results)
}

/// Per variable, the lag with the strongest absolute correlation.
pub fn best_lags(correlations: &[LagCorrelation]) -> Vec<LagCorrelation> {
    let mut best: Vec<LagCorrelation> = Vec::new();
    for c in correlations {
        match best.iter_mut().find(|b| b.variable == c.variable) {
            Some(b) => {
                if c.correlation.abs() > b.correlation.abs() {
                    *b = c.clone();
                }
            }
            None => best.push(c.clone()),
        }
    }
    best
}

/// Correlation between target and variable changes over a moving window.
/// Returns one point per window end date.
pub fn rolling_correlation(
    table: &PriceTable,
    target: &str,
    variable: &str,
    window: usize,
) -> Result<Vec<(NaiveDate, f64)>, IndexcastError> {
    if table.column_index(target).is_none() {
        return Err(IndexcastError::ConfigInvalid {
            section: "data".into(),
            key: "target".into(),
            reason: format!("column {} not present in price table", target),
        });
    }
    if table.column_index(variable).is_none() {
        return Err(IndexcastError::ConfigInvalid {
            section: "data".into(),
            key: "columns".into(),
            reason: format!("column {} not present in price table", variable),
        });
    }

    let pct = table.pct_change();
    if window < 2 || pct.len() < window {
        return Err(IndexcastError::InsufficientData {
            rows: pct.len(),
            minimum: window.max(2),
        });
    }

    let ti = pct.column_index(target).expect("checked above");
    let vi = pct.column_index(variable).expect("checked above");
    let target_changes: Vec<f64> = pct.values.iter().map(|r| r[ti]).collect();
    let var_changes: Vec<f64> = pct.values.iter().map(|r| r[vi]).collect();

    let mut points = Vec::with_capacity(pct.len() - window + 1);
    for end in window..=pct.len() {
        let r = pearson(
            &target_changes[end - window..end],
            &var_changes[end - window..end],
        );
        points.push((pct.dates[end - 1], r));
    }

    Ok(points)
}
