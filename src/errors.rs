use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::types::{Identifier, SourceName};

/// Error type for fetch, configuration, and persistence failures.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("request to {url} failed: {reason}")]
    Http { url: String, reason: String },
    #[error("request to {url} returned HTTP status {status}")]
    HttpStatus { url: String, status: u16 },
    #[error("response from {url} is not valid JSON: {reason}")]
    InvalidJson { url: String, reason: String },
    #[error("source '{source_name}' returned an unexpected payload: {details}")]
    UnexpectedPayload {
        source_name: SourceName,
        details: String,
    },
    #[error("unknown identifier '{identifier}' for source '{source_name}'")]
    UnknownIdentifier {
        source_name: SourceName,
        identifier: Identifier,
    },
    #[error("input not found: {}. {hint}", .path.display())]
    MissingInput { path: PathBuf, hint: String },
    #[error("{} does not contain a '{column}' column", .path.display())]
    MissingColumn { path: PathBuf, column: String },
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Parquet(#[from] parquet::errors::ParquetError),
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

impl IngestError {
    /// Short type name reported at the CLI boundary.
    pub fn kind(&self) -> &'static str {
        match self {
            IngestError::Http { .. } => "HttpError",
            IngestError::HttpStatus { .. } => "HttpStatusError",
            IngestError::InvalidJson { .. } => "InvalidJsonError",
            IngestError::UnexpectedPayload { .. } => "UnexpectedPayloadError",
            IngestError::UnknownIdentifier { .. } => "UnknownIdentifierError",
            IngestError::MissingInput { .. } => "FileNotFoundError",
            IngestError::MissingColumn { .. } => "MissingColumnError",
            IngestError::Configuration(_) => "ConfigurationError",
            IngestError::Io(_) => "IoError",
            IngestError::Json(_) => "JsonError",
            IngestError::Parquet(_) => "ParquetError",
            IngestError::Yaml(_) => "YamlError",
        }
    }

    /// True for failures the fetch client may retry.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            IngestError::Http { .. } | IngestError::HttpStatus { .. } | IngestError::InvalidJson { .. }
        )
    }
}
