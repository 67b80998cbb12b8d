//! Time-Series Table - column-oriented SCADA telemetry
//!
//! Rows are keyed by timestamp and carry an asset id plus numeric feature
//! columns. Missing cells are stored as NaN.

use std::ops::Range;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use ndarray::{Array2, ArrayView1, Axis};

/// Accepted naive timestamp layouts, tried in order
const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%d/%m/%Y %H:%M:%S",
];

/// Parse a telemetry timestamp. Offsets are normalised to UTC.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }

    for fmt in TIMESTAMP_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(ts);
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Parse a numeric cell; anything unparsable is missing (NaN)
pub fn parse_value(raw: &str) -> f64 {
    raw.trim().parse::<f64>().unwrap_or(f64::NAN)
}

/// Timestamped telemetry table
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeriesTable {
    timestamps: Vec<NaiveDateTime>,
    asset_ids: Vec<String>,
    columns: Vec<String>,
    /// rows x columns
    values: Array2<f64>,
}

impl TimeSeriesTable {
    pub fn empty(columns: Vec<String>) -> Self {
        let n_cols = columns.len();
        Self {
            timestamps: Vec::new(),
            asset_ids: Vec::new(),
            columns,
            values: Array2::zeros((0, n_cols)),
        }
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    pub fn asset_ids(&self) -> &[String] {
        &self.asset_ids
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Column by name
    pub fn column(&self, name: &str) -> Option<ArrayView1<'_, f64>> {
        self.column_index(name).map(|i| self.values.column(i))
    }

    pub fn t_min(&self) -> Option<NaiveDateTime> {
        self.timestamps.iter().min().copied()
    }

    pub fn t_max(&self) -> Option<NaiveDateTime> {
        self.timestamps.iter().max().copied()
    }

    pub fn is_sorted(&self) -> bool {
        self.timestamps.windows(2).all(|w| w[0] <= w[1])
    }

    /// Stable sort by timestamp (ascending)
    pub fn sort_by_timestamp(self) -> Self {
        if self.is_sorted() {
            return self;
        }
        let mut order: Vec<usize> = (0..self.len()).collect();
        order.sort_by_key(|&i| self.timestamps[i]);
        self.select(&order)
    }

    /// Rows at `indices`, in the given order
    pub fn select(&self, indices: &[usize]) -> Self {
        Self {
            timestamps: indices.iter().map(|&i| self.timestamps[i]).collect(),
            asset_ids: indices.iter().map(|&i| self.asset_ids[i].clone()).collect(),
            columns: self.columns.clone(),
            values: self.values.select(Axis(0), indices),
        }
    }

    /// Contiguous row range (clamped to the table)
    pub fn slice(&self, range: Range<usize>) -> Self {
        let end = range.end.min(self.len());
        let start = range.start.min(end);
        let indices: Vec<usize> = (start..end).collect();
        self.select(&indices)
    }

    pub fn head(&self, n: usize) -> Self {
        self.slice(0..n)
    }

    pub fn tail(&self, n: usize) -> Self {
        self.slice(self.len().saturating_sub(n)..self.len())
    }

    /// Rows matching a timestamp predicate, order preserved
    pub fn filter_time<F>(&self, keep: F) -> Self
    where
        F: Fn(&NaiveDateTime) -> bool,
    {
        let indices: Vec<usize> = self
            .timestamps
            .iter()
            .enumerate()
            .filter(|(_, ts)| keep(ts))
            .map(|(i, _)| i)
            .collect();
        self.select(&indices)
    }
}

// ============================================================================
// BUILDER PATTERN
// ============================================================================

/// Row-wise builder for `TimeSeriesTable`
#[derive(Debug, Clone)]
pub struct TableBuilder {
    columns: Vec<String>,
    timestamps: Vec<NaiveDateTime>,
    asset_ids: Vec<String>,
    data: Vec<f64>,
}

impl TableBuilder {
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            timestamps: Vec::new(),
            asset_ids: Vec::new(),
            data: Vec::new(),
        }
    }

    /// Append a row. Short rows are padded with NaN, long rows truncated.
    pub fn push(&mut self, timestamp: NaiveDateTime, asset_id: impl Into<String>, values: &[f64]) {
        let n_cols = self.columns.len();
        self.timestamps.push(timestamp);
        self.asset_ids.push(asset_id.into());
        self.data.extend(values.iter().copied().take(n_cols));
        self.data
            .extend(std::iter::repeat(f64::NAN).take(n_cols.saturating_sub(values.len())));
    }

    pub fn row(mut self, timestamp: NaiveDateTime, asset_id: impl Into<String>, values: &[f64]) -> Self {
        self.push(timestamp, asset_id, values);
        self
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn build(self) -> TimeSeriesTable {
        let n_rows = self.timestamps.len();
        let n_cols = self.columns.len();
        let data = self.data;
        let values = Array2::from_shape_fn((n_rows, n_cols), |(i, j)| data[i * n_cols + j]);

        TimeSeriesTable {
            timestamps: self.timestamps,
            asset_ids: self.asset_ids,
            columns: self.columns,
            values,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> NaiveDateTime {
        parse_timestamp(s).unwrap()
    }

    #[test]
    fn test_parse_timestamp_formats() {
        assert_eq!(ts("2023-05-01 10:00:00"), ts("2023-05-01T10:00:00"));
        assert_eq!(ts("2023-05-01T12:00:00+02:00"), ts("2023-05-01 10:00:00"));
        assert_eq!(ts("2023-05-01"), ts("2023-05-01 00:00:00"));
        assert!(parse_timestamp("not a time").is_none());
        assert!(parse_timestamp("   ").is_none());
    }

    #[test]
    fn test_parse_value_missing() {
        assert_eq!(parse_value(" 1.5 "), 1.5);
        assert!(parse_value("").is_nan());
        assert!(parse_value("n/a").is_nan());
    }

    #[test]
    fn test_builder_pads_short_rows() {
        let table = TableBuilder::new(["a", "b"])
            .row(ts("2023-01-01 00:00:00"), "T1", &[1.0])
            .build();
        assert_eq!(table.len(), 1);
        assert_eq!(table.column("a").unwrap()[0], 1.0);
        assert!(table.column("b").unwrap()[0].is_nan());
    }

    #[test]
    fn test_sort_is_stable() {
        let table = TableBuilder::new(["a"])
            .row(ts("2023-01-01 02:00:00"), "T1", &[3.0])
            .row(ts("2023-01-01 01:00:00"), "T1", &[1.0])
            .row(ts("2023-01-01 01:00:00"), "T2", &[2.0])
            .build()
            .sort_by_timestamp();

        assert!(table.is_sorted());
        let col: Vec<f64> = table.column("a").unwrap().to_vec();
        assert_eq!(col, vec![1.0, 2.0, 3.0]);
        assert_eq!(table.asset_ids(), &["T1", "T2", "T1"]);
    }

    #[test]
    fn test_head_tail_clamp() {
        let mut builder = TableBuilder::new(["a"]);
        for i in 0..5 {
            builder.push(ts("2023-01-01 00:00:00") + chrono::Duration::minutes(i), "T1", &[i as f64]);
        }
        let table = builder.build();
        assert_eq!(table.head(10).len(), 5);
        assert_eq!(table.tail(2).column("a").unwrap().to_vec(), vec![3.0, 4.0]);
        assert_eq!(table.slice(4..2).len(), 0);
    }
}
