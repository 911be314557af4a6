//! Error types shared across Scrubmark crates.

use std::path::PathBuf;

/// Top-level error type for Scrubmark operations.
#[derive(Debug, thiserror::Error)]
pub enum ScrubmarkError {
    #[error("Probe error: {message}")]
    Probe { message: String },

    #[error("Decode error: {message}")]
    Decode { message: String },

    #[error("Scan error: {message}")]
    Scan { message: String },

    #[error("Audio error: {message}")]
    Audio { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Unsupported operation: {message}")]
    Unsupported { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using ScrubmarkError.
pub type ScrubmarkResult<T> = Result<T, ScrubmarkError>;

impl ScrubmarkError {
    pub fn probe(msg: impl Into<String>) -> Self {
        Self::Probe {
            message: msg.into(),
        }
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode {
            message: msg.into(),
        }
    }

    pub fn scan(msg: impl Into<String>) -> Self {
        Self::Scan {
            message: msg.into(),
        }
    }

    pub fn audio(msg: impl Into<String>) -> Self {
        Self::Audio {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported {
            message: msg.into(),
        }
    }
}
