//! Imagery error types.

use geode_render::RenderError;
use geode_terrain::TerrainError;
use geode_tiles::TileError;

/// Why a tile resource could not be produced.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("failed to read {url}")]
    Io {
        url: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode {url}")]
    Decode {
        url: String,
        #[source]
        source: image::ImageError,
    },

    /// The request was cancelled before its result was delivered.
    #[error("fetch cancelled")]
    Cancelled,

    #[error(transparent)]
    Locator(#[from] TileError),
}

#[derive(Debug, thiserror::Error)]
pub enum ImageryError {
    #[error("invalid imagery layer settings: {0}")]
    InvalidSettings(String),

    #[error(transparent)]
    Tiles(#[from] TileError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Terrain(#[from] TerrainError),

    #[error("failed to spawn retrieval worker")]
    Spawn(#[source] std::io::Error),
}
