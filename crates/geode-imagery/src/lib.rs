//! Tiled imagery draped over the terrain: per-frame tile selection with
//! ancestor fallback, prioritized asynchronous retrieval, and surface
//! rendering.

mod error;
mod layer;
mod loader;
mod queue;
mod renderer;
mod retriever;
mod texture_tile;
mod tile_image;

pub use error::{FetchError, ImageryError};
pub use layer::{ImageryLayerSettings, TiledImageLayer};
pub use loader::{FileSystemLoader, ResourceLoader};
pub use queue::RequestQueue;
pub use renderer::{SurfaceTexture, SurfaceTileRenderer};
pub use retriever::{FetchHandle, FetchOutcome, Retriever};
pub use texture_tile::{TextureTile, TileId, fallback_transform};
pub use tile_image::TileImage;
