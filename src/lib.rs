//! Wind Fleet Health - Anomaly Risk Scoring Engine
//!
//! Scores SCADA telemetry with a per-unit outlier model and ranks the fleet by
//! a 0-100 risk index.
//!
//! ## Layout
//! - `logic/model/` - ModelPack loading, LRU cache, thresholds, ONNX inference
//! - `logic/features/` - Time-series table, window resolver, feature aligner
//! - `logic/risk.rs` - Score-to-risk blend
//! - `logic/explain/` - Drift-based contributor ranking
//! - `logic/catalog.rs` - Source index + CSV readers
//! - `logic/scoring/` - Single-unit scoring and fleet batch driver

pub mod constants;
pub mod error;
pub mod logic;

pub use error::{ScoringError, ScoringResult};
pub use logic::config::ScoringConfig;
pub use logic::scoring::{RiskEngine, RiskRecord, ScoreRequest, ScoreResponse};
