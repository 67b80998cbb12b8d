//! Window Resolver - trailing lookback slice with a bounded row count
//!
//! `t_end` is the latest timestamp present; rows in `[t_end - lookback, t_end]`
//! are kept. Oversized windows are downsampled uniformly with a seeded RNG and
//! put back in timestamp order.

use chrono::{Duration, NaiveDateTime};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

use super::table::TimeSeriesTable;
use crate::constants::{DEFAULT_LOOKBACK_HOURS, DEFAULT_MAX_POINTS, DEFAULT_SAMPLE_SEED};

/// No rows survived timestamp parsing or window filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("scoring window is empty")]
pub struct EmptyWindowError;

/// Resolved analysis window
#[derive(Debug, Clone)]
pub struct ScoringWindow {
    pub table: TimeSeriesTable,
    pub t_end: NaiveDateTime,
    pub lookback: Duration,
    /// Rows in the window before downsampling
    pub rows_in_window: usize,
}

impl ScoringWindow {
    /// Window start; a lookback reaching past the calendar keeps everything
    pub fn t_start(&self) -> NaiveDateTime {
        window_start(self.t_end, self.lookback)
    }

    pub fn was_sampled(&self) -> bool {
        self.table.len() < self.rows_in_window
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Asset id of the first row, used to label the record
    pub fn representative_asset(&self) -> Option<&str> {
        self.table.asset_ids().first().map(String::as_str)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct WindowResolver {
    pub lookback: Duration,
    pub max_points: usize,
    pub seed: u64,
}

impl Default for WindowResolver {
    fn default() -> Self {
        Self {
            lookback: Duration::hours(DEFAULT_LOOKBACK_HOURS),
            max_points: DEFAULT_MAX_POINTS,
            seed: DEFAULT_SAMPLE_SEED,
        }
    }
}

impl WindowResolver {
    pub fn new(lookback: Duration) -> Self {
        Self {
            lookback,
            ..Default::default()
        }
    }

    pub fn with_max_points(mut self, max_points: usize) -> Self {
        self.max_points = max_points;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Resolve using a fresh RNG seeded from `self.seed`
    pub fn resolve(&self, table: &TimeSeriesTable) -> Result<ScoringWindow, EmptyWindowError> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        self.resolve_with_rng(table, &mut rng)
    }

    /// Resolve drawing the downsample from a caller-supplied RNG
    pub fn resolve_with_rng<R: Rng + ?Sized>(
        &self,
        table: &TimeSeriesTable,
        rng: &mut R,
    ) -> Result<ScoringWindow, EmptyWindowError> {
        let t_end = table.t_max().ok_or(EmptyWindowError)?;
        let t_start = window_start(t_end, self.lookback);

        let window = table.filter_time(|ts| *ts >= t_start && *ts <= t_end);
        if window.is_empty() {
            return Err(EmptyWindowError);
        }

        let rows_in_window = window.len();
        let window = window.sort_by_timestamp();
        let table = if rows_in_window > self.max_points {
            log::debug!(
                "Window has {} rows, downsampling to {}",
                rows_in_window,
                self.max_points
            );
            downsample(&window, self.max_points, rng)
        } else {
            window
        };

        Ok(ScoringWindow {
            table,
            t_end,
            lookback: self.lookback,
            rows_in_window,
        })
    }
}

fn window_start(t_end: NaiveDateTime, lookback: Duration) -> NaiveDateTime {
    match t_end.checked_sub_signed(lookback) {
        Some(start) => start,
        None if lookback < Duration::zero() => NaiveDateTime::MAX,
        None => NaiveDateTime::MIN,
    }
}

/// Uniform sample of exactly `n` rows (without replacement), timestamp order kept
fn downsample<R: Rng + ?Sized>(table: &TimeSeriesTable, n: usize, rng: &mut R) -> TimeSeriesTable {
    let mut picked = rand::seq::index::sample(rng, table.len(), n).into_vec();
    // table is time-sorted, so index order is timestamp order (ties stay stable)
    picked.sort_unstable();
    table.select(&picked)
}
