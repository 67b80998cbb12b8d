//! Model Pack - fitted model + the exact feature order it was trained on
//!
//! On disk a pack is two files in the model directory:
//! - `isoforest_<unit>.onnx` - the exported model
//! - `isoforest_<unit>.json` - metadata (feature order, expected width, checksum)
//!
//! The feature list is truncated to the model's expected width so that a
//! metadata file listing extra columns still yields a consistent schema.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crc32fast::Hasher;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::inference::{score_anomalies, InferenceError, OnnxOutlierModel, OutlierModel};
use crate::constants::MODEL_FILE_PREFIX;
use crate::error::{ScoringError, ScoringResult};
use crate::logic::features::AlignedFeatures;

// ============================================================================
// METADATA
// ============================================================================

/// Sidecar metadata written next to the exported model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackMetadata {
    /// Feature names in training order
    pub features: Vec<String>,

    /// Width the model was fitted on
    #[serde(default)]
    pub n_features_in: Option<usize>,

    /// ONNX output holding the scores
    #[serde(default)]
    pub score_output: Option<String>,

    /// Added to the raw output to recover native scores
    #[serde(default)]
    pub score_offset: f32,

    /// Hex SHA-256 of the `.onnx` file
    #[serde(default)]
    pub sha256: Option<String>,
}

/// Paths of a unit's pack files
pub fn pack_paths(model_dir: &Path, unit_id: &str) -> (PathBuf, PathBuf) {
    let stem = format!("{}{}", MODEL_FILE_PREFIX, unit_id);
    (
        model_dir.join(format!("{}.onnx", stem)),
        model_dir.join(format!("{}.json", stem)),
    )
}

// ============================================================================
// MODEL PACK
// ============================================================================

/// Immutable per-unit model + feature schema
#[derive(Clone)]
pub struct ModelPack {
    unit_id: String,
    model: Arc<dyn OutlierModel>,
    features: Vec<String>,
    layout_hash: u32,
}

impl fmt::Debug for ModelPack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelPack")
            .field("unit_id", &self.unit_id)
            .field("model", &self.model.describe())
            .field("n_expected", &self.features.len())
            .field("layout_hash", &format_args!("{:08x}", self.layout_hash))
            .finish()
    }
}

impl ModelPack {
    /// Build a pack. The expected width comes from `n_expected`, then the model,
    /// then the feature list; a longer list is cut to that width.
    pub fn new(
        unit_id: &str,
        model: Arc<dyn OutlierModel>,
        mut features: Vec<String>,
        n_expected: Option<usize>,
    ) -> ScoringResult<Self> {
        let n_expected = n_expected
            .or_else(|| model.n_features_in())
            .unwrap_or(features.len());

        if features.len() < n_expected {
            return Err(ScoringError::ModelLoad {
                unit_id: unit_id.to_string(),
                reason: format!(
                    "model expects {} features but only {} are listed",
                    n_expected,
                    features.len()
                ),
            });
        }

        if features.len() > n_expected {
            log::warn!(
                "Pack '{}' lists {} features, model expects {}; keeping the first {}",
                unit_id,
                features.len(),
                n_expected,
                n_expected
            );
            features.truncate(n_expected);
        }

        let layout_hash = compute_layout_hash(&features);

        Ok(Self {
            unit_id: unit_id.to_string(),
            model,
            features,
            layout_hash,
        })
    }

    pub fn unit_id(&self) -> &str {
        &self.unit_id
    }

    /// Ordered feature list, `len() == n_expected()`
    pub fn features(&self) -> &[String] {
        &self.features
    }

    pub fn n_expected(&self) -> usize {
        self.features.len()
    }

    pub fn layout_hash(&self) -> u32 {
        self.layout_hash
    }

    pub fn model(&self) -> &dyn OutlierModel {
        self.model.as_ref()
    }

    /// Anomaly scores (higher = more anomalous) for an aligned matrix
    pub fn score(&self, aligned: &AlignedFeatures) -> Result<Vec<f64>, InferenceError> {
        score_anomalies(self.model.as_ref(), aligned)
    }
}

// ============================================================================
// LOADING
// ============================================================================

/// Load `isoforest_<unit>.{onnx,json}` from `model_dir`
pub fn load_pack(model_dir: &Path, unit_id: &str) -> ScoringResult<ModelPack> {
    let (onnx_path, meta_path) = pack_paths(model_dir, unit_id);
    let load_err = |reason: String| ScoringError::ModelLoad {
        unit_id: unit_id.to_string(),
        reason,
    };

    if !meta_path.exists() {
        return Err(load_err(format!("metadata not found: {}", meta_path.display())));
    }
    if !onnx_path.exists() {
        return Err(load_err(format!("model not found: {}", onnx_path.display())));
    }

    let meta_bytes = fs::read(&meta_path).map_err(|e| ScoringError::io(&meta_path, e))?;
    let metadata: PackMetadata = serde_json::from_slice(&meta_bytes)?;

    let model_bytes = fs::read(&onnx_path).map_err(|e| ScoringError::io(&onnx_path, e))?;
    if let Some(expected) = metadata.sha256.as_deref() {
        if !verify_checksum(&model_bytes, expected) {
            return Err(load_err(format!(
                "checksum mismatch for {} (expected {})",
                onnx_path.display(),
                expected
            )));
        }
    }

    let model = OnnxOutlierModel::from_bytes(
        unit_id,
        &model_bytes,
        metadata.score_output.as_deref(),
        metadata.score_offset,
    )
    .map_err(|e| load_err(e.to_string()))?;

    let pack = ModelPack::new(unit_id, Arc::new(model), metadata.features, metadata.n_features_in)?;

    log::info!(
        "Loaded model pack '{}' ({} features, layout {:08x})",
        unit_id,
        pack.n_expected(),
        pack.layout_hash()
    );

    Ok(pack)
}

// ============================================================================
// INTEGRITY
// ============================================================================

/// CRC32 of the ordered feature names
pub fn compute_layout_hash(features: &[String]) -> u32 {
    let mut hasher = Hasher::new();
    for name in features {
        hasher.update(name.as_bytes());
        hasher.update(&[0]); // Separator
    }
    hasher.finalize()
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Case-insensitive comparison against an expected hex digest
pub fn verify_checksum(bytes: &[u8], expected_hex: &str) -> bool {
    sha256_hex(bytes).eq_ignore_ascii_case(expected_hex.trim())
}
