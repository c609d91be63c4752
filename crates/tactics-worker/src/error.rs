//! Worker error types

use chess_core::NormalizationError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Configuration error: {0}")]
    Config(&'static str),

    /// The engine could not be started, has died, or the session is closed.
    #[error("Engine unavailable: {0}")]
    EngineUnavailable(String),

    /// One evaluation failed or timed out. The walker absorbs this per ply.
    #[error("Evaluation failed: {0}")]
    EvaluationFailed(String),

    #[error("Normalization error: {0}")]
    Normalization(#[from] NormalizationError),

    #[error("Analysis cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
