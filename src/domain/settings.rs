//! Typed settings resolved and validated from the config file.

use chrono::{Days, NaiveDate, Utc};
use std::path::PathBuf;

use crate::domain::error::IndexcastError;
use crate::domain::features::FeatureConfig;
use crate::domain::metrics::SelectionMetric;
use crate::domain::model::ModelKind;
use crate::domain::trainer::{default_grid, TrainConfig};
use crate::ports::config_port::ConfigPort;

/// One configured ticker: display name and provider symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolSpec {
    pub name: String,
    pub ticker: String,
}

#[derive(Debug, Clone)]
pub struct DataSettings {
    pub symbols: Vec<SymbolSpec>,
    pub target: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub cache_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct TrainSettings {
    pub config: TrainConfig,
    pub model_dir: PathBuf,
    pub model_name: String,
    /// Trailing window for empirical prediction accuracy.
    pub accuracy_window: usize,
}

/// The index and macro tickers the original study tracks.
fn default_symbols() -> Vec<SymbolSpec> {
    [
        ("BIST100", "XU100.IS"),
        ("Gold", "GC=F"),
        ("Oil", "CL=F"),
        ("USDTRY", "USDTRY=X"),
        ("US10Y", "^TNX"),
        ("NatGas", "NG=F"),
        ("VIX", "^VIX"),
    ]
    .into_iter()
    .map(|(name, ticker)| SymbolSpec {
        name: name.to_string(),
        ticker: ticker.to_string(),
    })
    .collect()
}

fn parse_symbols(value: &str) -> Result<Vec<SymbolSpec>, IndexcastError> {
    let mut symbols = Vec::new();
    for entry in value.split(',') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        let (name, ticker) = entry.split_once(':').ok_or_else(|| {
            IndexcastError::ConfigInvalid {
                section: "data".into(),
                key: "symbols".into(),
                reason: format!("expected NAME:TICKER, got {}", entry),
            }
        })?;
        symbols.push(SymbolSpec {
            name: name.trim().to_string(),
            ticker: ticker.trim().to_string(),
        });
    }
    if symbols.is_empty() {
        return Err(IndexcastError::ConfigInvalid {
            section: "data".into(),
            key: "symbols".into(),
            reason: "no symbols configured".into(),
        });
    }
    Ok(symbols)
}

fn parse_date(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: NaiveDate,
) -> Result<NaiveDate, IndexcastError> {
    match config.get_string(section, key) {
        Some(value) => {
            NaiveDate::parse_from_str(&value, "%Y-%m-%d").map_err(|_| IndexcastError::ConfigInvalid {
                section: section.into(),
                key: key.into(),
                reason: "invalid date format (expected YYYY-MM-DD)".into(),
            })
        }
        None => Ok(default),
    }
}

/// Resolve `[data]`: tickers, target, date range, cache directory. The range
/// defaults to the trailing five years.
pub fn data_settings(config: &dyn ConfigPort) -> Result<DataSettings, IndexcastError> {
    let symbols = match config.get_string("data", "symbols") {
        Some(value) => parse_symbols(&value)?,
        None => default_symbols(),
    };

    let target = config
        .get_string("data", "target")
        .unwrap_or_else(|| "BIST100".to_string());
    if !symbols.iter().any(|s| s.name == target) {
        return Err(IndexcastError::ConfigInvalid {
            section: "data".into(),
            key: "target".into(),
            reason: format!("target {} is not among the configured symbols", target),
        });
    }

    let today = Utc::now().date_naive();
    let end_date = parse_date(config, "data", "end_date", today)?;
    let start_date = parse_date(
        config,
        "data",
        "start_date",
        end_date - Days::new(5 * 365),
    )?;
    if start_date >= end_date {
        return Err(IndexcastError::ConfigInvalid {
            section: "data".into(),
            key: "start_date".into(),
            reason: "start_date must precede end_date".into(),
        });
    }

    let cache_dir = config
        .get_string("data", "cache_dir")
        .unwrap_or_else(|| "data".to_string());

    Ok(DataSettings {
        symbols,
        target,
        start_date,
        end_date,
        cache_dir: PathBuf::from(cache_dir),
    })
}

/// Resolve `[features]`: the lag horizons.
pub fn feature_settings(
    config: &dyn ConfigPort,
    target: &str,
) -> Result<FeatureConfig, IndexcastError> {
    let lags = match config.get_string("features", "lags") {
        Some(value) => {
            let mut lags = Vec::new();
            for part in value.split(',') {
                let part = part.trim();
                if part.is_empty() {
                    continue;
                }
                let lag: usize = part.parse().map_err(|_| IndexcastError::ConfigInvalid {
                    section: "features".into(),
                    key: "lags".into(),
                    reason: format!("invalid lag {}", part),
                })?;
                if lag == 0 {
                    return Err(IndexcastError::ConfigInvalid {
                        section: "features".into(),
                        key: "lags".into(),
                        reason: "lags must be positive".into(),
                    });
                }
                lags.push(lag);
            }
            if lags.is_empty() {
                return Err(IndexcastError::ConfigInvalid {
                    section: "features".into(),
                    key: "lags".into(),
                    reason: "no lags configured".into(),
                });
            }
            lags
        }
        None => vec![1, 10, 30],
    };

    Ok(FeatureConfig {
        target: target.to_string(),
        lags,
    })
}

/// Resolve `[train]` and `[model]`.
pub fn train_settings(
    config: &dyn ConfigPort,
    target: &str,
) -> Result<TrainSettings, IndexcastError> {
    let kind = match config.get_string("train", "model") {
        Some(value) => ModelKind::parse(&value)?,
        None => ModelKind::GradientBoost,
    };
    let metric = match config.get_string("train", "metric") {
        Some(value) => SelectionMetric::parse(&value)?,
        None => SelectionMetric::Accuracy,
    };

    let test_size = config.get_double("train", "test_size", 0.2);
    if !(0.0..1.0).contains(&test_size) {
        return Err(IndexcastError::ConfigInvalid {
            section: "train".into(),
            key: "test_size".into(),
            reason: "test_size must be in [0, 1)".into(),
        });
    }

    let cv_folds = config.get_int("train", "cv_folds", 5);
    if cv_folds < 2 {
        return Err(IndexcastError::ConfigInvalid {
            section: "train".into(),
            key: "cv_folds".into(),
            reason: "cv_folds must be at least 2".into(),
        });
    }

    let accuracy_window = config.get_int("train", "accuracy_window", 30);
    if accuracy_window < 1 {
        return Err(IndexcastError::ConfigInvalid {
            section: "train".into(),
            key: "accuracy_window".into(),
            reason: "accuracy_window must be positive".into(),
        });
    }

    let train_config = TrainConfig {
        kind,
        target: target.to_string(),
        metric,
        test_size,
        cv_folds: cv_folds as usize,
        seed: config.get_int("train", "seed", 42) as u64,
        grid: default_grid(),
        success_threshold: config.get_double("train", "success_threshold", 0.55),
    };

    Ok(TrainSettings {
        config: train_config,
        model_dir: PathBuf::from(
            config
                .get_string("model", "dir")
                .unwrap_or_else(|| "models".to_string()),
        ),
        model_name: config
            .get_string("model", "name")
            .unwrap_or_else(|| "current_model".to_string()),
        accuracy_window: accuracy_window as usize,
    })
}
