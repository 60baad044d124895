//! Alpha Vantage daily-series client.
//!
//! Single-attempt blocking HTTP: a failed or empty response is reported and
//! the run ends, there is no retry or backoff.

use chrono::NaiveDate;
use reqwest::blocking::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};

use crate::domain::error::IndexcastError;
use crate::domain::series::{PricePoint, PriceSeries};
use crate::ports::quote_port::QuotePort;

pub const DEFAULT_BASE_URL: &str = "https://www.alphavantage.co";

pub struct AlphaVantageAdapter {
    client: Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct DailyEntry {
    #[serde(rename = "4. close")]
    close: String,
}

#[derive(Debug, Deserialize)]
struct DailyResponse {
    #[serde(rename = "Time Series (Daily)")]
    time_series: Option<HashMap<String, DailyEntry>>,
    #[serde(rename = "Error Message")]
    error_message: Option<String>,
    #[serde(rename = "Note")]
    note: Option<String>,
}

impl AlphaVantageAdapter {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(DEFAULT_BASE_URL, api_key)
    }

    pub fn with_base_url(base_url: &str, api_key: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("failed to build HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    /// Decode one response body into a date-filtered series.
    fn parse_series(
        name: &str,
        symbol: &str,
        body: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<PriceSeries, IndexcastError> {
        let response: DailyResponse =
            serde_json::from_str(body).map_err(|e| IndexcastError::Fetch {
                symbol: symbol.to_string(),
                reason: format!("unexpected response body: {}", e),
            })?;

        if let Some(message) = response.error_message {
            return Err(IndexcastError::Fetch {
                symbol: symbol.to_string(),
                reason: message,
            });
        }
        if let Some(note) = response.note {
            return Err(IndexcastError::Fetch {
                symbol: symbol.to_string(),
                reason: note,
            });
        }

        let time_series = match response.time_series {
            Some(ts) if !ts.is_empty() => ts,
            _ => {
                return Err(IndexcastError::EmptyResponse {
                    symbol: symbol.to_string(),
                })
            }
        };

        let mut points = Vec::with_capacity(time_series.len());
        for (date_str, entry) in &time_series {
            let date = match NaiveDate::parse_from_str(date_str, "%Y-%m-%d") {
                Ok(d) => d,
                Err(_) => continue,
            };
            if date < start_date || date > end_date {
                continue;
            }
            let close: f64 = match entry.close.parse() {
                Ok(c) => c,
                Err(_) => continue,
            };
            points.push(PricePoint { date, close });
        }

        if points.is_empty() {
            return Err(IndexcastError::EmptyResponse {
                symbol: symbol.to_string(),
            });
        }

        Ok(PriceSeries::new(name, symbol, points))
    }
}

impl QuotePort for AlphaVantageAdapter {
    fn fetch_daily_closes(
        &self,
        name: &str,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<PriceSeries, IndexcastError> {
        let url = format!(
            "{}/query?function=TIME_SERIES_DAILY&symbol={}&outputsize=full&apikey={}",
            self.base_url, symbol, self.api_key
        );
        debug!(symbol, "fetching daily series");

        let body = self
            .client
            .get(&url)
            .send()
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.text())
            .map_err(|e| IndexcastError::Fetch {
                symbol: symbol.to_string(),
                reason: e.to_string(),
            })?;

        let series = Self::parse_series(name, symbol, &body, start_date, end_date)?;
        info!(symbol, rows = series.len(), "fetched daily series");
        Ok(series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    const BODY: &str = r#"{
        "Meta Data": {"2. Symbol": "XU100.IS"},
        "Time Series (Daily)": {
            "2024-01-02": {"1. open": "100.0", "2. high": "101.0", "3. low": "99.0", "4. close": "100.5", "5. volume": "1000"},
            "2024-01-03": {"1. open": "100.5", "2. high": "103.0", "3. low": "100.0", "4. close": "102.0", "5. volume": "1200"},
            "2024-01-04": {"1. open": "102.0", "2. high": "102.5", "3. low": "98.0", "4. close": "99.0", "5. volume": "900"}
        }
    }"#;

    #[test]
    fn parses_and_sorts_daily_closes() {
        let series = AlphaVantageAdapter::parse_series(
            "BIST100",
            "XU100.IS",
            BODY,
            date(2024, 1, 1),
            date(2024, 1, 31),
        )
        .unwrap();

        assert_eq!(series.name, "BIST100");
        assert_eq!(series.len(), 3);
        assert_eq!(series.points[0].date, date(2024, 1, 2));
        assert_eq!(series.points[0].close, 100.5);
        assert_eq!(series.points[2].close, 99.0);
    }

    #[test]
    fn filters_outside_the_requested_range() {
        let series = AlphaVantageAdapter::parse_series(
            "BIST100",
            "XU100.IS",
            BODY,
            date(2024, 1, 3),
            date(2024, 1, 3),
        )
        .unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series.points[0].close, 102.0);
    }

    #[test]
    fn range_with_no_rows_is_an_empty_response() {
        let err = AlphaVantageAdapter::parse_series(
            "BIST100",
            "XU100.IS",
            BODY,
            date(2023, 1, 1),
            date(2023, 1, 31),
        )
        .unwrap_err();
        assert!(matches!(err, IndexcastError::EmptyResponse { .. }));
    }

    #[test]
    fn api_error_message_is_a_fetch_error() {
        let body = r#"{"Error Message": "Invalid API call."}"#;
        let err = AlphaVantageAdapter::parse_series(
            "BIST100",
            "XU100.IS",
            body,
            date(2024, 1, 1),
            date(2024, 1, 31),
        )
        .unwrap_err();
        match err {
            IndexcastError::Fetch { symbol, reason } => {
                assert_eq!(symbol, "XU100.IS");
                assert!(reason.contains("Invalid API call"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rate_limit_note_is_a_fetch_error() {
        let body = r#"{"Note": "Thank you for using Alpha Vantage! Our standard API rate limit is 25 requests per day."}"#;
        let err = AlphaVantageAdapter::parse_series(
            "BIST100",
            "XU100.IS",
            body,
            date(2024, 1, 1),
            date(2024, 1, 31),
        )
        .unwrap_err();
        assert!(matches!(err, IndexcastError::Fetch { .. }));
    }

    #[test]
    fn garbage_body_is_a_fetch_error() {
        let err = AlphaVantageAdapter::parse_series(
            "BIST100",
            "XU100.IS",
            "<html>nope</html>",
            date(2024, 1, 1),
            date(2024, 1, 31),
        )
        .unwrap_err();
        assert!(matches!(err, IndexcastError::Fetch { .. }));
    }
}
