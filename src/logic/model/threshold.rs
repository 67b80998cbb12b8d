//! Threshold Registry
//!
//! Decision threshold per fleet unit, produced by the calibration step:
//!
//! ```json
//! { "Wind_Farm_A": { "threshold": 0.532, "quantile": 0.995 }, "Wind_Farm_B": 0.61 }
//! ```
//!
//! A unit without a threshold is out of scope for scoring.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ScoringError, ScoringResult};

/// Registry entry; extra calibration fields are ignored
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(untagged)]
enum ThresholdEntry {
    Detailed { threshold: f64 },
    Bare(f64),
}

impl ThresholdEntry {
    fn value(self) -> f64 {
        match self {
            ThresholdEntry::Detailed { threshold } => threshold,
            ThresholdEntry::Bare(v) => v,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThresholdRegistry {
    thresholds: HashMap<String, f64>,
}

impl ThresholdRegistry {
    /// Load the registry; a missing file is a configuration error
    pub fn load(path: &Path) -> ScoringResult<Self> {
        if !path.exists() {
            return Err(ScoringError::ConfigurationMissing {
                what: "threshold registry",
                path: path.to_path_buf(),
            });
        }

        let data = fs::read(path).map_err(|e| ScoringError::io(path, e))?;
        let entries: HashMap<String, ThresholdEntry> = serde_json::from_slice(&data)?;

        let registry = Self {
            thresholds: entries.into_iter().map(|(k, v)| (k, v.value())).collect(),
        };

        log::debug!("Loaded {} thresholds from {}", registry.len(), path.display());
        Ok(registry)
    }

    pub fn from_map(thresholds: HashMap<String, f64>) -> Self {
        Self { thresholds }
    }

    pub fn insert(&mut self, unit_id: impl Into<String>, threshold: f64) {
        self.thresholds.insert(unit_id.into(), threshold);
    }

    pub fn get(&self, unit_id: &str) -> Option<f64> {
        self.thresholds.get(unit_id).copied()
    }

    /// Threshold or `UnknownUnit`
    pub fn require(&self, unit_id: &str) -> ScoringResult<f64> {
        self.get(unit_id).ok_or_else(|| ScoringError::UnknownUnit {
            unit_id: unit_id.to_string(),
        })
    }

    pub fn contains(&self, unit_id: &str) -> bool {
        self.thresholds.contains_key(unit_id)
    }

    pub fn len(&self) -> usize {
        self.thresholds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.thresholds.is_empty()
    }

    /// Unit ids, sorted
    pub fn units(&self) -> Vec<&str> {
        let mut units: Vec<&str> = self.thresholds.keys().map(String::as_str).collect();
        units.sort_unstable();
        units
    }
}
