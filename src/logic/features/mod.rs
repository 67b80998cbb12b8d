//! Features Module - telemetry tables and model-input preparation
//!
//! - `table` - column-oriented timestamped telemetry
//! - `window` - lookback window resolution + seeded downsampling
//! - `align` - projection onto a model's feature schema

pub mod table;
pub mod window;
pub mod align;

// Re-export common types
pub use table::{TableBuilder, TimeSeriesTable};
pub use window::{EmptyWindowError, ScoringWindow, WindowResolver};
pub use align::{align_features, AlignedFeatures};
