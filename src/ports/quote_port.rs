//! Remote price-data access port trait.

use chrono::NaiveDate;

use crate::domain::error::IndexcastError;
use crate::domain::series::PriceSeries;

pub trait QuotePort {
    /// Daily close series for one ticker over an inclusive date range.
    ///
    /// One attempt only; a network failure or an empty body surfaces as an
    /// error without retry.
    fn fetch_daily_closes(
        &self,
        name: &str,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<PriceSeries, IndexcastError>;
}
