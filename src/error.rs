//! Error handling

use std::path::PathBuf;

use thiserror::Error;

use crate::logic::model::inference::InferenceError;

pub type ScoringResult<T> = Result<T, ScoringError>;

#[derive(Debug, Error)]
pub enum ScoringError {
    // Configuration errors
    #[error("{what} missing: {path}")]
    ConfigurationMissing { what: &'static str, path: PathBuf },

    // Request errors
    #[error("unknown unit '{unit_id}'")]
    UnknownUnit { unit_id: String },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    // Data errors
    #[error("source not found for unit '{unit_id}': {path}")]
    SourceNotFound { unit_id: String, path: PathBuf },

    #[error("malformed source {path}: {reason}")]
    MalformedSource { path: PathBuf, reason: String },

    #[error("no rows in scoring window for unit '{unit_id}' ({source_ref})")]
    EmptyWindow { unit_id: String, source_ref: String },

    #[error("asset '{asset_id}' not found in fleet export for unit '{unit_id}'")]
    AssetNotResolved { unit_id: String, asset_id: String },

    // Model errors
    #[error("failed to load model pack for unit '{unit_id}': {reason}")]
    ModelLoad { unit_id: String, reason: String },

    #[error(transparent)]
    Inference(#[from] InferenceError),

    // IO / format errors
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ScoringError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ScoringError::Io { path: path.into(), source }
    }

    /// True for errors a caller should report as "not found"
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ScoringError::SourceNotFound { .. } | ScoringError::AssetNotResolved { .. }
        )
    }
}
