//! Inference Engine - ONNX Runtime Integration
//!
//! Outlier models report native scores where lower = more anomalous (the
//! `score_samples` convention). The anomaly scorer flips the sign so that
//! higher = more anomalous everywhere downstream.

use ndarray::{Array2, ArrayView2};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Value;
use parking_lot::Mutex;

use crate::logic::features::AlignedFeatures;

/// Preferred ONNX output for isolation-forest exports
const DEFAULT_SCORE_OUTPUT: &str = "scores";

// ============================================================================
// ERROR HANDLING
// ============================================================================

#[derive(Debug, Clone, thiserror::Error)]
#[error("InferenceError: {0}")]
pub struct InferenceError(pub String);

// ============================================================================
// OUTLIER MODEL TRAIT
// ============================================================================

/// Trait cho outlier models (ONNX, in-memory stubs, ...)
pub trait OutlierModel: Send + Sync {
    /// Native per-row scores, lower = more anomalous
    fn score_samples(&self, rows: ArrayView2<'_, f32>) -> Result<Vec<f32>, InferenceError>;

    /// Feature count the model was fitted on, when the model knows it
    fn n_features_in(&self) -> Option<usize> {
        None
    }

    fn describe(&self) -> String {
        "outlier-model".to_string()
    }
}

// ============================================================================
// ANOMALY SCORER
// ============================================================================

/// Per-row anomaly scores, higher = more anomalous
pub fn score_anomalies(
    model: &dyn OutlierModel,
    aligned: &AlignedFeatures,
) -> Result<Vec<f64>, InferenceError> {
    if let Some(expected) = model.n_features_in() {
        if expected != aligned.n_features() {
            return Err(InferenceError(format!(
                "Feature count mismatch: model expects {}, got {}",
                expected,
                aligned.n_features()
            )));
        }
    }

    if aligned.n_rows() == 0 {
        return Ok(Vec::new());
    }

    let native = model.score_samples(aligned.matrix.view())?;
    if native.len() != aligned.n_rows() {
        return Err(InferenceError(format!(
            "Model returned {} scores for {} rows",
            native.len(),
            aligned.n_rows()
        )));
    }

    Ok(native.into_iter().map(|s| -f64::from(s)).collect())
}

// ============================================================================
// ONNX IMPLEMENTATION
// ============================================================================

/// Isolation forest (or any outlier model) exported to ONNX
pub struct OnnxOutlierModel {
    session: Mutex<Session>,
    output_name: String,
    /// Added to the raw output to recover `score_samples` (decision offset)
    score_offset: f32,
    label: String,
}

impl std::fmt::Debug for OnnxOutlierModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxOutlierModel")
            .field("label", &self.label)
            .field("output_name", &self.output_name)
            .field("score_offset", &self.score_offset)
            .finish()
    }
}

impl OnnxOutlierModel {
    /// Load ONNX model từ bytes
    pub fn from_bytes(
        label: &str,
        model_bytes: &[u8],
        score_output: Option<&str>,
        score_offset: f32,
    ) -> Result<Self, InferenceError> {
        log::info!("Loading ONNX model '{}' ({} bytes)", label, model_bytes.len());

        let session = Session::builder()
            .map_err(|e| InferenceError(format!("Session builder error: {}", e)))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| InferenceError(format!("Optimization error: {}", e)))?
            .commit_from_memory(model_bytes)
            .map_err(|e| InferenceError(format!("Load from memory error: {}", e)))?;

        let output_names: Vec<String> = session.outputs.iter().map(|o| o.name.clone()).collect();
        let output_name = pick_output(&output_names, score_output)?;

        log::debug!(
            "ONNX model '{}' outputs {:?}, scoring from '{}'",
            label,
            output_names,
            output_name
        );

        Ok(Self {
            session: Mutex::new(session),
            output_name,
            score_offset,
            label: label.to_string(),
        })
    }
}

impl OutlierModel for OnnxOutlierModel {
    fn score_samples(&self, rows: ArrayView2<'_, f32>) -> Result<Vec<f32>, InferenceError> {
        let start_time = std::time::Instant::now();
        let n_rows = rows.nrows();

        let input_array: Array2<f32> = rows.to_owned();
        let input_tensor = Value::from_array(input_array)
            .map_err(|e| InferenceError(format!("Tensor error: {}", e)))?;

        let mut session = self.session.lock();
        let outputs = session
            .run(ort::inputs![input_tensor])
            .map_err(|e| InferenceError(format!("Inference failed: {}", e)))?;

        let output = outputs
            .get(&self.output_name)
            .ok_or_else(|| InferenceError(format!("No output '{}'", self.output_name)))?;

        let output_tensor = output
            .try_extract_tensor::<f32>()
            .map_err(|e| InferenceError(format!("Extract error: {}", e)))?;

        let data = output_tensor.1;
        if data.len() != n_rows {
            return Err(InferenceError(format!(
                "Output '{}' has {} values for {} rows",
                self.output_name,
                data.len(),
                n_rows
            )));
        }

        let scores = data.iter().map(|s| s + self.score_offset).collect();

        log::debug!(
            "ONNX '{}' scored {} rows in {}us",
            self.label,
            n_rows,
            start_time.elapsed().as_micros()
        );

        Ok(scores)
    }

    fn describe(&self) -> String {
        format!("onnx:{}", self.label)
    }
}

/// Explicit name, else `scores`, else the last declared output
fn pick_output(outputs: &[String], requested: Option<&str>) -> Result<String, InferenceError> {
    if let Some(name) = requested {
        return outputs
            .iter()
            .find(|o| o.as_str() == name)
            .cloned()
            .ok_or_else(|| InferenceError(format!("Output '{}' not in model {:?}", name, outputs)));
    }

    outputs
        .iter()
        .find(|o| o.as_str() == DEFAULT_SCORE_OUTPUT)
        .or_else(|| outputs.last())
        .cloned()
        .ok_or_else(|| InferenceError("No output defined".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::model::testing::RowMeanModel;
    use ndarray::array;

    fn aligned(matrix: Array2<f32>) -> AlignedFeatures {
        let names = (0..matrix.ncols()).map(|i| format!("f{}", i)).collect();
        AlignedFeatures { names, matrix, synthesized: Vec::new() }
    }

    #[test]
    fn test_sign_is_flipped() {
        // RowMeanModel reports -mean(row) natively
        let model = RowMeanModel::new(2);
        let scores = score_anomalies(&model, &aligned(array![[1.0, 3.0], [0.0, 0.0], [-2.0, -2.0]])).unwrap();
        assert_eq!(scores, vec![2.0, 0.0, -2.0]);
    }

    #[test]
    fn test_feature_count_mismatch() {
        let model = RowMeanModel::new(3);
        let result = score_anomalies(&model, &aligned(array![[1.0, 3.0]]));
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_matrix_scores_nothing() {
        let model = RowMeanModel::new(2);
        let scores = score_anomalies(&model, &aligned(Array2::zeros((0, 2)))).unwrap();
        assert!(scores.is_empty());
    }

    #[test]
    fn test_pick_output() {
        let outs = vec!["label".to_string(), "scores".to_string()];
        assert_eq!(pick_output(&outs, None).unwrap(), "scores");
        assert_eq!(pick_output(&outs, Some("label")).unwrap(), "label");
        assert!(pick_output(&outs, Some("missing")).is_err());

        let single = vec!["variable".to_string()];
        assert_eq!(pick_output(&single, None).unwrap(), "variable");
        assert!(pick_output(&[], None).is_err());
    }
}
