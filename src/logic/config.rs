//! Scoring configuration
//!
//! Paths come from the environment (see `constants`), policy knobs default to
//! the calibrated values and can be replaced per engine.

use std::path::PathBuf;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::constants;
use crate::logic::explain::DriftPolicy;
use crate::logic::risk::RiskPolicy;

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Directory holding telemetry source files
    pub data_dir: PathBuf,

    /// Source index CSV
    pub index_csv: PathBuf,

    /// Threshold registry JSON
    pub thresholds_path: PathBuf,

    /// Directory holding model packs
    pub model_dir: PathBuf,

    /// Fleet ranking export (also used for asset -> source lookup)
    pub fleet_risk_csv: PathBuf,

    /// Lookback used by the fleet batch
    pub lookback_hours: i64,

    /// Row cap per window
    pub max_points: usize,

    /// Downsampling seed
    pub sample_seed: u64,

    /// Alerting rows returned by single-unit scoring
    pub alerts_tail: usize,

    /// Model packs kept in memory
    pub model_cache_capacity: usize,

    pub risk: RiskPolicy,

    pub drift: DriftPolicy,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(constants::DEFAULT_DATA_DIR),
            index_csv: PathBuf::from(constants::DEFAULT_INDEX_CSV),
            thresholds_path: PathBuf::from(constants::DEFAULT_THRESHOLDS_PATH),
            model_dir: PathBuf::from(constants::DEFAULT_MODEL_DIR),
            fleet_risk_csv: PathBuf::from(constants::DEFAULT_FLEET_RISK_CSV),
            lookback_hours: constants::DEFAULT_LOOKBACK_HOURS,
            max_points: constants::DEFAULT_MAX_POINTS,
            sample_seed: constants::DEFAULT_SAMPLE_SEED,
            alerts_tail: constants::DEFAULT_ALERTS_TAIL,
            model_cache_capacity: constants::DEFAULT_MODEL_CACHE_CAPACITY,
            risk: RiskPolicy::default(),
            drift: DriftPolicy::default(),
        }
    }
}

impl ScoringConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            data_dir: constants::get_data_dir(),
            index_csv: constants::get_index_csv(),
            thresholds_path: constants::get_thresholds_path(),
            model_dir: constants::get_model_dir(),
            fleet_risk_csv: constants::get_fleet_risk_csv(),
            lookback_hours: constants::get_lookback_hours(),
            max_points: constants::get_max_points(),
            sample_seed: constants::get_sample_seed(),
            model_cache_capacity: constants::get_model_cache_capacity(),
            ..Default::default()
        }
    }

    /// Configuration rooted at a single directory (tests, demos)
    pub fn rooted_at(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            data_dir: root.join("scada"),
            index_csv: root.join("scada_index.csv"),
            thresholds_path: root.join("models").join("thresholds.json"),
            model_dir: root.join("models"),
            fleet_risk_csv: root.join("fleet_risk.csv"),
            ..Default::default()
        }
    }

    /// Lookback as a duration, saturating at the representable range
    pub fn lookback(&self) -> Duration {
        Duration::try_hours(self.lookback_hours).unwrap_or(if self.lookback_hours < 0 {
            Duration::MIN
        } else {
            Duration::MAX
        })
    }
}
