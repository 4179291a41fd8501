//! Error types for unitrack-core.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrackingError {
    /// A requested backend name is not in the supported set.
    #[error("{0} is not supported")]
    UnsupportedBackend(String),

    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    #[error("Parameter '{0}' is not a finite number")]
    NonFiniteParam(String),

    #[error("Hosted metrics service returned {status}: {body}")]
    Hosted { status: u16, body: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, TrackingError>;
