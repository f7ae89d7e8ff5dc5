//! Error types for composition planning and generation.

use thiserror::Error;

/// Result type alias for generator operations.
pub type GenResult<T> = Result<T, GenError>;

/// Errors that can occur while building a composition plan.
#[derive(Error, Debug)]
pub enum GenError {
    #[error("No tile resolved for instance '{0}'")]
    UnresolvedInstance(String),

    #[error("Instance '{instance}' references unknown instance '{producer}'")]
    UnknownProducer { instance: String, producer: String },

    #[error("Instance '{instance}' references output '{output}' not declared by '{producer}'")]
    UndeclaredOutput {
        instance: String,
        producer: String,
        output: String,
    },

    #[error("Dependency cycle among instances: {}", .0.join(", "))]
    DependencyCycle(Vec<String>),

    #[error("Manifest error: {0}")]
    Spec(#[from] mosaic_spec::SpecError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
