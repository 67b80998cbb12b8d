//! Model Module - per-unit outlier models
//!
//! Tách logic inference khỏi data handling.
//! Dễ dàng swap model (ONNX, in-memory) behind `OutlierModel`.

pub mod inference;
pub mod pack;
pub mod cache;
pub mod threshold;

#[cfg(test)]
pub(crate) mod testing;

// Re-export common types
pub use inference::{score_anomalies, InferenceError, OnnxOutlierModel, OutlierModel};
pub use pack::{load_pack, ModelPack, PackMetadata};
pub use cache::{ModelCache, OnnxPackLoader, PackLoader};
pub use threshold::ThresholdRegistry;
