//! On-disk CSV store for collected price data.
//!
//! One raw table per collection run, plus the prepared training table and a
//! small JSON summary. Re-reads filter by date range so a cached file can
//! serve narrower requests.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::domain::error::IndexcastError;
use crate::domain::features::FeatureTable;
use crate::domain::series::PriceTable;

pub struct CsvStoreAdapter {
    base_path: PathBuf,
}

/// What a collection run produced, shown by `info` and the dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionSummary {
    pub rows: usize,
    pub columns: Vec<String>,
    pub feature_count: usize,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub positive_ratio: f64,
    pub collected_at: DateTime<Utc>,
}

impl CsvStoreAdapter {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn raw_path(&self) -> PathBuf {
        self.base_path.join("raw_prices.csv")
    }

    pub fn prepared_path(&self) -> PathBuf {
        self.base_path.join("prepared_data.csv")
    }

    pub fn summary_path(&self) -> PathBuf {
        self.base_path.join("collection_summary.json")
    }

    pub fn has_raw(&self) -> bool {
        self.raw_path().exists()
    }

    fn ensure_dir(&self) -> Result<(), IndexcastError> {
        fs::create_dir_all(&self.base_path).map_err(|e| IndexcastError::Store {
            reason: format!(
                "failed to create {}: {}",
                self.base_path.display(),
                e
            ),
        })
    }

    pub fn save_raw(&self, table: &PriceTable) -> Result<(), IndexcastError> {
        self.ensure_dir()?;
        let path = self.raw_path();
        let mut writer = csv::Writer::from_path(&path).map_err(|e| IndexcastError::Store {
            reason: format!("failed to write {}: {}", path.display(), e),
        })?;

        let mut header = vec!["date".to_string()];
        header.extend(table.columns.iter().cloned());
        writer
            .write_record(&header)
            .map_err(|e| IndexcastError::Store {
                reason: format!("CSV write error: {}", e),
            })?;

        for (date, row) in table.dates.iter().zip(table.values.iter()) {
            let mut record = vec![date.format("%Y-%m-%d").to_string()];
            record.extend(row.iter().map(|v| v.to_string()));
            writer
                .write_record(&record)
                .map_err(|e| IndexcastError::Store {
                    reason: format!("CSV write error: {}", e),
                })?;
        }

        writer.flush().map_err(|e| IndexcastError::Store {
            reason: format!("CSV flush error: {}", e),
        })?;
        info!(path = %path.display(), rows = table.len(), "raw price table saved");
        Ok(())
    }

    pub fn load_raw(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<PriceTable, IndexcastError> {
        let path = self.raw_path();
        let content = fs::read_to_string(&path).map_err(|e| IndexcastError::Store {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut reader = csv::Reader::from_reader(content.as_bytes());
        let headers = reader.headers().map_err(|e| IndexcastError::Store {
            reason: format!("CSV parse error: {}", e),
        })?;
        let columns: Vec<String> = headers.iter().skip(1).map(|h| h.to_string()).collect();
        if columns.is_empty() {
            return Err(IndexcastError::Store {
                reason: format!("{} has no data columns", path.display()),
            });
        }

        let mut dates = Vec::new();
        let mut values = Vec::new();
        for result in reader.records() {
            let record = result.map_err(|e| IndexcastError::Store {
                reason: format!("CSV parse error: {}", e),
            })?;

            let date_str = record.get(0).ok_or_else(|| IndexcastError::Store {
                reason: "missing date column".into(),
            })?;
            let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|e| {
                IndexcastError::Store {
                    reason: format!("invalid date {}: {}", date_str, e),
                }
            })?;
            if date < start_date || date > end_date {
                continue;
            }

            let mut row = Vec::with_capacity(columns.len());
            for i in 0..columns.len() {
                let raw = record.get(i + 1).ok_or_else(|| IndexcastError::Store {
                    reason: format!("row {} is missing column {}", date_str, columns[i]),
                })?;
                let value: f64 = raw.parse().map_err(|_| IndexcastError::Store {
                    reason: format!("invalid value {} for {} on {}", raw, columns[i], date_str),
                })?;
                row.push(value);
            }

            dates.push(date);
            values.push(row);
        }

        Ok(PriceTable {
            dates,
            columns,
            values,
        })
    }

    /// The engineered training table: feature columns plus the label, one
    /// row per labeled date.
    pub fn save_prepared(&self, features: &FeatureTable) -> Result<(), IndexcastError> {
        self.ensure_dir()?;
        let path = self.prepared_path();
        let mut writer = csv::Writer::from_path(&path).map_err(|e| IndexcastError::Store {
            reason: format!("failed to write {}: {}", path.display(), e),
        })?;

        let mut header = vec!["date".to_string()];
        header.extend(features.names.iter().cloned());
        header.push("target".to_string());
        writer
            .write_record(&header)
            .map_err(|e| IndexcastError::Store {
                reason: format!("CSV write error: {}", e),
            })?;

        for (date, row, label) in features.labeled() {
            let mut record = vec![date.format("%Y-%m-%d").to_string()];
            record.extend(row.iter().map(|v| v.to_string()));
            record.push(label.to_string());
            writer
                .write_record(&record)
                .map_err(|e| IndexcastError::Store {
                    reason: format!("CSV write error: {}", e),
                })?;
        }

        writer.flush().map_err(|e| IndexcastError::Store {
            reason: format!("CSV flush error: {}", e),
        })?;
        info!(path = %path.display(), "prepared training table saved");
        Ok(())
    }

    pub fn save_summary(&self, summary: &CollectionSummary) -> Result<(), IndexcastError> {
        self.ensure_dir()?;
        let json =
            serde_json::to_string_pretty(summary).map_err(|e| IndexcastError::Store {
                reason: format!("summary encode error: {}", e),
            })?;
        fs::write(self.summary_path(), json).map_err(|e| IndexcastError::Store {
            reason: format!("failed to write summary: {}", e),
        })
    }

    pub fn load_summary(&self) -> Result<CollectionSummary, IndexcastError> {
        let path = self.summary_path();
        let content = fs::read_to_string(&path).map_err(|e| IndexcastError::Store {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;
        serde_json::from_str(&content).map_err(|e| IndexcastError::Store {
            reason: format!("summary decode error: {}", e),
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }
}
