//! # mosaic_spec
//!
//! Tile and deployment manifest management for Mosaic.
//!
//! A tile manifest declares a tile's identity, its named input
//! parameters and its output attributes; a deployment manifest selects
//! tile instances and wires producer outputs into consumer inputs with
//! `$(instance.output)` bindings. Both are definition-time contracts;
//! nothing here executes.

pub mod error;
pub mod models;
pub mod reader;
pub mod repo;
pub mod validator;
pub mod writer;

pub use error::{SpecError, SpecResult};
pub use models::{
    Category, DeploymentManifest, DeploymentSpec, DeploymentSummary, DeploymentTemplate,
    InputBinding, InputDependency, InputType, Metadata, OutputRef, OutputType, SummaryOutput,
    TileInput, TileInstance, TileManifest, TileOutput, TileSpecBody, API_VERSION,
};
pub use reader::SpecReader;
pub use repo::{TileRecord, TileRepo, TileVersion, TILE_MANIFEST_FILE};
pub use validator::{SpecValidator, ValidationResult};
pub use writer::SpecWriter;
