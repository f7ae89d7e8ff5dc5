//! Error types for manifest handling.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for manifest operations.
pub type SpecResult<T> = Result<T, SpecError>;

/// Errors that can occur while reading or validating manifests.
#[derive(Error, Debug)]
pub enum SpecError {
    #[error("Tile not found in repo: {name} {version}")]
    TileNotFound { name: String, version: String },

    #[error("Tile repo not found at path: {0}")]
    RepoNotFound(PathBuf),

    #[error("Tile already exists at path: {0}")]
    AlreadyExists(PathBuf),

    #[error("Invalid manifest in file {path}: {message}")]
    InvalidManifest { path: PathBuf, message: String },

    #[error("Manifest validation failed: {0}")]
    ValidationFailed(String),

    #[error("Unrecognized version string: {0}")]
    InvalidVersion(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}
