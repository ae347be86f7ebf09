use std::path::PathBuf;

use thiserror::Error;

use crate::extract::ExtractionError;
use crate::llm_client::LlmError;
use crate::merge::MergeError;

/// Application-level error type. `main` reports it through `anyhow`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error("Structuring call failed: {0}")]
    Structuring(#[from] LlmError),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Merge failed: {0}")]
    Merge(#[from] MergeError),

    #[error("No valid resume records to merge under {0}")]
    NoRecords(PathBuf),
}

impl AppError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AppError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        AppError::Json {
            path: path.into(),
            source,
        }
    }
}
