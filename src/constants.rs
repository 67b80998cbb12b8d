//! Central Configuration Constants
//!
//! Single source of truth for all scoring defaults.
//! Paths and policy knobs can be overridden through the environment.

use std::path::PathBuf;

/// Default directory holding per-source telemetry CSV files
pub const DEFAULT_DATA_DIR: &str = "data/processed/scada";

/// Default source index (one row per telemetry file)
pub const DEFAULT_INDEX_CSV: &str = "data/processed/scada_index.csv";

/// Default threshold registry written by the calibration step
pub const DEFAULT_THRESHOLDS_PATH: &str = "models/baseline/thresholds.json";

/// Default directory holding `isoforest_<unit>.onnx` + `.json` packs
pub const DEFAULT_MODEL_DIR: &str = "models/baseline";

/// Default fleet ranking export
pub const DEFAULT_FLEET_RISK_CSV: &str = "data/processed/fleet_risk.csv";

/// Default lookback (hours)
pub const DEFAULT_LOOKBACK_HOURS: i64 = 24;

/// Maximum rows scored per window before downsampling
pub const DEFAULT_MAX_POINTS: usize = 50_000;

/// Seed for window downsampling
pub const DEFAULT_SAMPLE_SEED: u64 = 42;

/// Number of alerting rows returned with a single-unit score
pub const DEFAULT_ALERTS_TAIL: usize = 50;

/// Model packs kept in memory
pub const DEFAULT_MODEL_CACHE_CAPACITY: usize = 16;

/// Prefix of model pack files (`isoforest_<unit>.onnx`)
pub const MODEL_FILE_PREFIX: &str = "isoforest_";

/// Separator between unit id and dataset id in source file names
pub const SOURCE_UNIT_SEPARATOR: &str = "__";

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// App name
pub const APP_NAME: &str = "Wind Fleet Health";

// ============================================
// Helper functions to read from env with fallback
// ============================================

fn env_path(key: &str, default: &str) -> PathBuf {
    std::env::var(key)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(default))
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// Get telemetry directory from environment or use default
pub fn get_data_dir() -> PathBuf {
    env_path("WINDFLEET_DATA_DIR", DEFAULT_DATA_DIR)
}

/// Get source index path from environment or use default
pub fn get_index_csv() -> PathBuf {
    env_path("WINDFLEET_INDEX_CSV", DEFAULT_INDEX_CSV)
}

/// Get threshold registry path from environment or use default
pub fn get_thresholds_path() -> PathBuf {
    env_path("WINDFLEET_THRESHOLDS", DEFAULT_THRESHOLDS_PATH)
}

/// Get model directory from environment or use default
pub fn get_model_dir() -> PathBuf {
    env_path("WINDFLEET_MODEL_DIR", DEFAULT_MODEL_DIR)
}

/// Get fleet ranking export path from environment or use default
pub fn get_fleet_risk_csv() -> PathBuf {
    env_path("WINDFLEET_FLEET_RISK_CSV", DEFAULT_FLEET_RISK_CSV)
}

/// Get lookback hours from environment or use default
pub fn get_lookback_hours() -> i64 {
    env_parse("WINDFLEET_LOOKBACK_HOURS", DEFAULT_LOOKBACK_HOURS)
}

/// Get window row cap from environment or use default
pub fn get_max_points() -> usize {
    env_parse("WINDFLEET_MAX_POINTS", DEFAULT_MAX_POINTS)
}

/// Get downsampling seed from environment or use default
pub fn get_sample_seed() -> u64 {
    env_parse("WINDFLEET_SAMPLE_SEED", DEFAULT_SAMPLE_SEED)
}

/// Get model cache capacity from environment or use default
pub fn get_model_cache_capacity() -> usize {
    env_parse("WINDFLEET_MODEL_CACHE", DEFAULT_MODEL_CACHE_CAPACITY)
}
