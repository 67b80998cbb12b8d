//! Logic Module - Scoring Engines
//!
//! ## Architecture
//! - `features/` - Table, window resolution, feature alignment
//! - `model/` - Model packs, thresholds, inference
//! - `risk` - Risk blend
//! - `explain/` - Drift contributors
//! - `scoring/` - Single-unit + fleet drivers

pub mod config;
pub mod catalog;
pub mod risk;

pub mod features;
pub mod model;
pub mod explain;
pub mod scoring;
