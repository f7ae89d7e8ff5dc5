//! Error types for the synthesis core.

use thiserror::Error;

/// Result type alias for synthesis operations.
pub type SynthResult<T> = Result<T, SynthError>;

/// Errors that can occur during template synthesis.
#[derive(Error, Debug)]
pub enum SynthError {
    #[error("Duplicate logical ID '{id}' in stack '{stack}'")]
    DuplicateLogicalId { stack: String, id: String },

    #[error("Duplicate output '{name}' in stack '{stack}'")]
    DuplicateOutput { stack: String, name: String },

    #[error("Duplicate export name: {0}")]
    DuplicateExport(String),

    #[error("Duplicate stack name: {0}")]
    DuplicateStack(String),

    #[error("Stack '{0}' declares no resources")]
    EmptyStack(String),

    #[error("Unknown stack: {0}")]
    UnknownStack(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON rendering error: {0}")]
    Json(#[from] serde_json::Error),
}
