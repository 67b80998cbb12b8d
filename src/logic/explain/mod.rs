//! Explain Module - lightweight explainability for risk records
//!
//! Ranks features by how far their recent mean drifted from an in-window
//! baseline.

pub mod drift;

#[cfg(test)]
mod tests;

pub use drift::{top_contributors, Contributor, DriftPolicy};
