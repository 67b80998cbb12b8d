use chrono::{Duration, NaiveDateTime};

use super::drift::{top_contributors, DriftPolicy};
use crate::logic::features::table::{parse_timestamp, TableBuilder};
use crate::logic::features::TimeSeriesTable;

fn t0() -> NaiveDateTime {
    parse_timestamp("2023-06-01 00:00:00").unwrap()
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// 400 rows every 10 minutes; the last 24h (145 rows) is the recent slice
fn drift_window() -> (TimeSeriesTable, NaiveDateTime) {
    let mut builder = TableBuilder::new(["stable", "shifted", "mild", "empty"]);
    let n = 400;
    let recent_from = n - 145;
    for i in 0..n {
        let wobble = (i % 2) as f64;
        let is_recent = i >= recent_from;
        let shifted = if is_recent { 10.0 + wobble } else { wobble };
        let mild = if is_recent { wobble + 0.5 } else { wobble };
        builder.push(
            t0() + Duration::minutes(10 * i as i64),
            "WTG01",
            &[5.0, shifted, mild, f64::NAN],
        );
    }
    let table = builder.build();
    let t_end = table.t_max().unwrap();
    (table, t_end)
}

#[test]
fn test_baseline_len_heuristic() {
    let policy = DriftPolicy::default();
    assert_eq!(policy.baseline_len(100), 100);
    assert_eq!(policy.baseline_len(400), 200);
    assert_eq!(policy.baseline_len(1000), 300);
    assert_eq!(policy.baseline_len(1005), 301);
}

#[test]
fn test_ranking_order_and_exclusions() {
    let (window, t_end) = drift_window();
    let feats = names(&["stable", "mild", "shifted", "empty", "not_in_table"]);

    let ranked = top_contributors(&window, &feats, t_end);
    let order: Vec<&str> = ranked.iter().map(|c| c.feature.as_str()).collect();

    // zero-variance, all-missing and absent features are excluded
    assert_eq!(order, vec!["shifted", "mild"]);

    let shifted = &ranked[0];
    assert!((shifted.baseline_mean - 0.5).abs() < 1e-9);
    assert!((shifted.recent_mean - (10.0 + 73.0 / 145.0)).abs() < 1e-9);
    assert!(shifted.z_shift > ranked[1].z_shift);
}

#[test]
fn test_recent_fallback_to_tail() {
    // hourly rows: only 25 rows fall in the last 24h
    let mut builder = TableBuilder::new(["x"]);
    for i in 0..300 {
        builder.push(t0() + Duration::hours(i), "WTG02", &[i as f64]);
    }
    let window = builder.build();
    let t_end = window.t_max().unwrap();

    let policy = DriftPolicy::default();
    let recent = policy.recent(&window, t_end);
    assert_eq!(recent.len(), 200);
    assert_eq!(recent.column("x").unwrap()[0], 100.0);
}

#[test]
fn test_recent_slice_used_when_large_enough() {
    let (window, t_end) = drift_window();
    let recent = DriftPolicy::default().recent(&window, t_end);
    assert_eq!(recent.len(), 145);
}

#[test]
fn test_at_most_ten_sorted_descending() {
    let feats: Vec<String> = (0..15).map(|k| format!("f{k:02}")).collect();
    let mut builder = TableBuilder::new(feats.clone());
    let n = 400;
    for i in 0..n {
        let wobble = (i % 2) as f64;
        let values: Vec<f64> = (0..15)
            .map(|k| if i >= n - 145 { wobble + k as f64 } else { wobble })
            .collect();
        builder.push(t0() + Duration::minutes(10 * i as i64), "WTG03", &values);
    }
    let window = builder.build();
    let t_end = window.t_max().unwrap();

    let ranked = top_contributors(&window, &feats, t_end);
    assert_eq!(ranked.len(), 10);
    assert_eq!(ranked[0].feature, "f14");
    assert!(ranked.windows(2).all(|w| w[0].z_shift > w[1].z_shift));
    // f00 barely moves and falls outside the top ten
    assert!(ranked.iter().all(|c| c.feature != "f00"));
}

#[test]
fn test_single_row_window_has_no_contributors() {
    let window = TableBuilder::new(["x"]).row(t0(), "WTG04", &[1.0]).build();
    let ranked = top_contributors(&window, &names(&["x"]), t0());
    assert!(ranked.is_empty());
}

#[test]
fn test_custom_policy_limit() {
    let (window, t_end) = drift_window();
    let policy = DriftPolicy {
        max_contributors: 1,
        ..Default::default()
    };
    let ranked = policy.top_contributors(&window, &names(&["mild", "shifted"]), t_end);
    assert_eq!(ranked.len(), 1);
    assert_eq!(ranked[0].feature, "shifted");
}
