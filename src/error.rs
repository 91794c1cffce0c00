//! Ricotta Error Types
//!
//! Centralized error handling. Narration failures themselves never reach
//! the user; these cover settings and the command line surface.

use thiserror::Error;

/// Central error type for Ricotta
#[derive(Error, Debug)]
pub enum RicottaError {
    #[error("Voice '{voice}' is not offered for {language}")]
    UnknownVoice { voice: String, language: String },

    #[error("Unknown learning language: {0}")]
    UnknownLanguage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for Ricotta operations
pub type RicottaResult<T> = Result<T, RicottaError>;
