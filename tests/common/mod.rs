//! Shared helpers for integration tests: synthetic price data and a mock
//! quote port.

#![allow(dead_code)]

use chrono::NaiveDate;
use std::collections::HashMap;

use indexcast::domain::error::IndexcastError;
use indexcast::domain::series::{PricePoint, PriceSeries, PriceTable};
use indexcast::ports::quote_port::QuotePort;

pub fn date(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Days::new(u64::from(d))
}

pub fn series_from_closes(name: &str, closes: &[f64]) -> PriceSeries {
    PriceSeries::new(
        name,
        name,
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| PricePoint {
                date: date(i as u32),
                close,
            })
            .collect(),
    )
}

/// A close series following a deterministic two-up-one-down cycle.
pub fn cyclic_closes(n: usize) -> Vec<f64> {
    let mut close = 100.0;
    let mut closes = Vec::with_capacity(n);
    for i in 0..n {
        close *= if i % 3 == 2 { 0.98 } else { 1.01 };
        closes.push(close);
    }
    closes
}

/// Strictly alternating rises and falls: tomorrow's direction is the
/// opposite of today's change, so the day's own percent change decides the
/// label and a shallow tree learns the rule exactly.
pub fn zigzag_closes(n: usize) -> Vec<f64> {
    let mut close = 100.0;
    let mut closes = Vec::with_capacity(n);
    for i in 0..n {
        close *= if i % 2 == 0 { 1.01 } else { 0.99 };
        closes.push(close);
    }
    closes
}

/// Alternating up/down closes: row i rises exactly when i is even.
pub fn alternating_closes(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| if i % 2 == 0 { 100.0 } else { 110.0 })
        .collect()
}

/// A smooth secondary series to stand in for a commodity.
pub fn commodity_closes(n: usize, base: f64) -> Vec<f64> {
    (0..n)
        .map(|i| base * (1.0 + 0.02 * (i as f64 * 0.35).sin()))
        .collect()
}

/// Two-column table (target IDX plus Gold) with the learnable zigzag.
pub fn sample_table(n: usize) -> PriceTable {
    let mut table = PriceTable::merge(&[
        series_from_closes("IDX", &zigzag_closes(n)),
        series_from_closes("Gold", &commodity_closes(n, 2000.0)),
    ]);
    table.fill_gaps();
    table
}

/// Quote port backed by fixed in-memory series.
pub struct MockQuotePort {
    series: HashMap<String, Vec<f64>>,
    failing: Vec<String>,
}

impl MockQuotePort {
    pub fn new() -> Self {
        Self {
            series: HashMap::new(),
            failing: Vec::new(),
        }
    }

    pub fn with_series(mut self, name: &str, closes: Vec<f64>) -> Self {
        self.series.insert(name.to_string(), closes);
        self
    }

    pub fn with_failing(mut self, name: &str) -> Self {
        self.failing.push(name.to_string());
        self
    }
}

impl QuotePort for MockQuotePort {
    fn fetch_daily_closes(
        &self,
        name: &str,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<PriceSeries, IndexcastError> {
        if self.failing.iter().any(|f| f == name) {
            return Err(IndexcastError::Fetch {
                symbol: symbol.to_string(),
                reason: "mock failure".into(),
            });
        }
        let closes = self
            .series
            .get(name)
            .ok_or_else(|| IndexcastError::EmptyResponse {
                symbol: symbol.to_string(),
            })?;

        let mut series = series_from_closes(name, closes);
        series.symbol = symbol.to_string();
        series.points.retain(|p| p.date >= start_date && p.date <= end_date);
        if series.points.is_empty() {
            return Err(IndexcastError::EmptyResponse {
                symbol: symbol.to_string(),
            });
        }
        Ok(series)
    }
}
