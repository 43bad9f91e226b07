//! Error types shared across MacroKit crates.

use std::path::PathBuf;

/// Top-level error type for MacroKit operations.
#[derive(Debug, thiserror::Error)]
pub enum MacroError {
    #[error("Invalid configuration: {message}")]
    Validation { message: String },

    #[error("Input capture error: {message}")]
    Capture { message: String },

    #[error("Busy: {message}")]
    Busy { message: String },

    #[error("No recording loaded")]
    NoRecording,

    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using MacroError.
pub type MacroResult<T> = Result<T, MacroError>;

impl MacroError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    pub fn capture(msg: impl Into<String>) -> Self {
        Self::Capture {
            message: msg.into(),
        }
    }

    pub fn busy(msg: impl Into<String>) -> Self {
        Self::Busy {
            message: msg.into(),
        }
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage {
            message: msg.into(),
        }
    }

    /// Whether this error only reports that another session is active.
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Busy { .. })
    }
}
