//! In-memory models for tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use ndarray::{ArrayView2, Axis};

use super::cache::PackLoader;
use super::inference::{InferenceError, OutlierModel};
use super::pack::ModelPack;
use crate::error::{ScoringError, ScoringResult};

/// Native score = -mean(row), so the anomaly score is the row mean
pub struct RowMeanModel {
    n_features: usize,
}

impl RowMeanModel {
    pub fn new(n_features: usize) -> Self {
        Self { n_features }
    }
}

impl OutlierModel for RowMeanModel {
    fn score_samples(&self, rows: ArrayView2<'_, f32>) -> Result<Vec<f32>, InferenceError> {
        Ok(rows
            .axis_iter(Axis(0))
            .map(|row| {
                if row.is_empty() {
                    0.0
                } else {
                    -(row.sum() / row.len() as f32)
                }
            })
            .collect())
    }

    fn n_features_in(&self) -> Option<usize> {
        Some(self.n_features)
    }

    fn describe(&self) -> String {
        "row-mean".to_string()
    }
}

/// Loader handing out `RowMeanModel` packs for known units, counting loads
pub struct StubLoader {
    pub features: Vec<String>,
    pub units: Vec<String>,
    pub loads: Arc<AtomicUsize>,
}

impl StubLoader {
    pub fn new(units: &[&str], features: &[&str]) -> Self {
        Self {
            features: features.iter().map(|s| s.to_string()).collect(),
            units: units.iter().map(|s| s.to_string()).collect(),
            loads: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl PackLoader for StubLoader {
    fn load(&self, unit_id: &str) -> ScoringResult<ModelPack> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if !self.units.iter().any(|u| u == unit_id) {
            return Err(ScoringError::ModelLoad {
                unit_id: unit_id.to_string(),
                reason: "no stub model".to_string(),
            });
        }
        ModelPack::new(
            unit_id,
            Arc::new(RowMeanModel::new(self.features.len())),
            self.features.clone(),
            None,
        )
    }
}
