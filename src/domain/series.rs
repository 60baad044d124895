//! Price series and the merged, date-aligned price table.

use chrono::NaiveDate;
use std::collections::BTreeSet;

/// A single daily close observation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

/// Close-only daily series for one ticker.
///
/// Dates are strictly increasing after construction; duplicate dates keep
/// the first observation.
#[derive(Debug, Clone)]
pub struct PriceSeries {
    pub name: String,
    pub symbol: String,
    pub points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn new(name: impl Into<String>, symbol: impl Into<String>, mut points: Vec<PricePoint>) -> Self {
        points.sort_by_key(|p| p.date);
        points.dedup_by_key(|p| p.date);
        Self {
            name: name.into(),
            symbol: symbol.into(),
            points,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Date-indexed table of closes, one column per series.
///
/// `values` is row-major: `values[row][col]`. Missing observations are NaN
/// until [`PriceTable::fill_gaps`] runs. Dates are strictly increasing with
/// no duplicates.
#[derive(Debug, Clone)]
pub struct PriceTable {
    pub dates: Vec<NaiveDate>,
    pub columns: Vec<String>,
    pub values: Vec<Vec<f64>>,
}

impl PriceTable {
    /// Outer-join the given series on date. Holes are NaN.
    pub fn merge(series: &[PriceSeries]) -> Self {
        let all_dates: BTreeSet<NaiveDate> = series
            .iter()
            .flat_map(|s| s.points.iter().map(|p| p.date))
            .collect();
        let dates: Vec<NaiveDate> = all_dates.into_iter().collect();

        let columns: Vec<String> = series.iter().map(|s| s.name.clone()).collect();
        let mut values = vec![vec![f64::NAN; columns.len()]; dates.len()];

        for (col, s) in series.iter().enumerate() {
            // Both sides are sorted, so walk them together.
            let mut row = 0;
            for p in &s.points {
                while dates[row] < p.date {
                    row += 1;
                }
                values[row][col] = p.close;
            }
        }

        Self {
            dates,
            columns,
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// One column's values in date order.
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let idx = self.column_index(name)?;
        Some(self.values.iter().map(|row| row[idx]).collect())
    }

    /// Forward-fill then backward-fill every column in place.
    pub fn fill_gaps(&mut self) {
        for col in 0..self.columns.len() {
            let mut last = f64::NAN;
            for row in 0..self.values.len() {
                if self.values[row][col].is_nan() {
                    self.values[row][col] = last;
                } else {
                    last = self.values[row][col];
                }
            }
            let mut next = f64::NAN;
            for row in (0..self.values.len()).rev() {
                if self.values[row][col].is_nan() {
                    self.values[row][col] = next;
                } else {
                    next = self.values[row][col];
                }
            }
        }
    }

    pub fn has_nan(&self) -> bool {
        self.values.iter().flatten().any(|v| v.is_nan())
    }

    /// Rows with `start <= date <= end`.
    pub fn slice_range(&self, start: NaiveDate, end: NaiveDate) -> Self {
        let keep: Vec<usize> = (0..self.dates.len())
            .filter(|&i| self.dates[i] >= start && self.dates[i] <= end)
            .collect();
        Self {
            dates: keep.iter().map(|&i| self.dates[i]).collect(),
            columns: self.columns.clone(),
            values: keep.iter().map(|&i| self.values[i].clone()).collect(),
        }
    }

    /// The trailing `n` rows (fewer if the table is shorter).
    pub fn tail(&self, n: usize) -> Self {
        let start = self.dates.len().saturating_sub(n);
        Self {
            dates: self.dates[start..].to_vec(),
            columns: self.columns.clone(),
            values: self.values[start..].to_vec(),
        }
    }

    /// Day-over-day fractional change per column. One fewer row than the
    /// input; column names are preserved.
    pub fn pct_change(&self) -> Self {
        let mut dates = Vec::with_capacity(self.len().saturating_sub(1));
        let mut values = Vec::with_capacity(self.len().saturating_sub(1));

        for row in 1..self.len() {
            let prev = &self.values[row - 1];
            let curr = &self.values[row];
            let changes: Vec<f64> = curr
                .iter()
                .zip(prev.iter())
                .map(|(c, p)| if *p != 0.0 { (c - p) / p } else { 0.0 })
                .collect();
            dates.push(self.dates[row]);
            values.push(changes);
        }

        Self {
            dates,
            columns: self.columns.clone(),
            values,
        }
    }
}
