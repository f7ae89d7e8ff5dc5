//! Error types for the tile catalog.

use thiserror::Error;

/// Result type alias for tile construction.
pub type TileResult<T> = Result<T, TileError>;

/// Errors that can occur while declaring a tile's resources.
#[derive(Error, Debug)]
pub enum TileError {
    #[error("Unknown tile: {0}")]
    UnknownTile(String),

    #[error("Tile '{tile}' is missing required input '{input}'")]
    MissingInput { tile: String, input: String },

    #[error("Invalid value for input '{input}' on tile '{tile}': {message}")]
    InvalidInput {
        tile: String,
        input: String,
        message: String,
    },

    #[error("Synthesis error: {0}")]
    Synth(#[from] mosaic_synth::SynthError),
}
