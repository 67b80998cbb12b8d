//! Drift Explainer - ranks features by shift between a baseline and a recent slice
//!
//! Baseline = oldest rows of the window, recent = trailing hours before `t_end`.
//! `z_shift = |mean(recent) - mean(baseline)| / std(baseline)`.
//! Diagnostic only; never feeds the risk score.

use chrono::{Duration, NaiveDateTime};
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

use crate::logic::features::TimeSeriesTable;

// ============================================================================
// CONSTANTS
// ============================================================================

const DEFAULT_BASELINE_MIN_ROWS: usize = 200;
const DEFAULT_BASELINE_FRACTION: f64 = 0.3;
const DEFAULT_RECENT_HOURS: i64 = 24;
const DEFAULT_RECENT_MIN_ROWS: usize = 50;
const DEFAULT_FALLBACK_ROWS: usize = 200;
const DEFAULT_MAX_CONTRIBUTORS: usize = 10;

/// Population heuristics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DriftPolicy {
    /// Baseline is at least this many rows from the start of the window
    pub baseline_min_rows: usize,
    /// ...or this fraction of the window, whichever is larger
    pub baseline_fraction: f64,
    /// Recent slice = rows within this many hours of `t_end`
    pub recent_hours: i64,
    /// Below this many recent rows, fall back to the window tail
    pub recent_min_rows: usize,
    /// Tail size used by the fallback
    pub fallback_rows: usize,
    pub max_contributors: usize,
}

impl Default for DriftPolicy {
    fn default() -> Self {
        Self {
            baseline_min_rows: DEFAULT_BASELINE_MIN_ROWS,
            baseline_fraction: DEFAULT_BASELINE_FRACTION,
            recent_hours: DEFAULT_RECENT_HOURS,
            recent_min_rows: DEFAULT_RECENT_MIN_ROWS,
            fallback_rows: DEFAULT_FALLBACK_ROWS,
            max_contributors: DEFAULT_MAX_CONTRIBUTORS,
        }
    }
}

/// One ranked feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contributor {
    pub feature: String,
    pub z_shift: f64,
    pub recent_mean: f64,
    pub baseline_mean: f64,
}

impl DriftPolicy {
    /// Rows taken from the start of a window of `n` rows
    pub fn baseline_len(&self, n: usize) -> usize {
        let by_fraction = (self.baseline_fraction * n as f64).floor() as usize;
        self.baseline_min_rows.max(by_fraction).min(n)
    }

    pub fn baseline(&self, window: &TimeSeriesTable) -> TimeSeriesTable {
        window.head(self.baseline_len(window.len()))
    }

    /// Recent slice, or the window tail when the slice is too small
    pub fn recent(&self, window: &TimeSeriesTable, t_end: NaiveDateTime) -> TimeSeriesTable {
        let since = Duration::try_hours(self.recent_hours)
            .and_then(|d| t_end.checked_sub_signed(d))
            .unwrap_or(NaiveDateTime::MIN);
        let recent = window.filter_time(|ts| *ts >= since);
        if recent.len() < self.recent_min_rows {
            window.tail(self.fallback_rows)
        } else {
            recent
        }
    }

    /// Top features by z-shift, descending
    pub fn top_contributors(
        &self,
        window: &TimeSeriesTable,
        features: &[String],
        t_end: NaiveDateTime,
    ) -> Vec<Contributor> {
        let baseline = self.baseline(window);
        let recent = self.recent(window, t_end);

        let mut ranked: Vec<Contributor> = features
            .iter()
            .filter_map(|feature| {
                let base_col = baseline.column(feature)?;
                let recent_col = recent.column(feature)?;

                let baseline_mean = nan_mean(base_col)?;
                let base_std = nan_std(base_col)?;
                let recent_mean = nan_mean(recent_col)?;

                if base_std == 0.0 {
                    return None;
                }

                let z_shift = (recent_mean - baseline_mean).abs() / base_std;
                if !z_shift.is_finite() {
                    return None;
                }

                Some(Contributor {
                    feature: feature.clone(),
                    z_shift,
                    recent_mean,
                    baseline_mean,
                })
            })
            .collect();

        ranked.sort_by(|a, b| {
            b.z_shift
                .partial_cmp(&a.z_shift)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        ranked.truncate(self.max_contributors);

        ranked
    }
}

/// Default-policy ranking
pub fn top_contributors(
    window: &TimeSeriesTable,
    features: &[String],
    t_end: NaiveDateTime,
) -> Vec<Contributor> {
    DriftPolicy::default().top_contributors(window, features, t_end)
}

// ============================================================================
// INTERNAL HELPERS
// ============================================================================

/// Mean over non-NaN cells; None if there are none
fn nan_mean(col: ArrayView1<'_, f64>) -> Option<f64> {
    let (sum, n) = col
        .iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

/// Sample standard deviation (n - 1) over non-NaN cells; None below 2 values
fn nan_std(col: ArrayView1<'_, f64>) -> Option<f64> {
    let mean = nan_mean(col)?;
    let (sq, n) = col
        .iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(s, n), v| (s + (v - mean).powi(2), n + 1));
    (n > 1).then(|| (sq / (n - 1) as f64).sqrt())
}
