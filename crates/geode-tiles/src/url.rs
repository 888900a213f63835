//! Turning tile addresses into resource locators.

use crate::{Tile, TileError};

/// Produces the locator a loader fetches a tile's resource from.
pub trait TileUrlBuilder: Send + Sync {
    fn url(&self, tile: &Tile) -> Result<String, TileError>;
}

impl<F> TileUrlBuilder for F
where
    F: Fn(&Tile) -> Result<String, TileError> + Send + Sync,
{
    fn url(&self, tile: &Tile) -> Result<String, TileError> {
        self(tile)
    }
}

/// Joins the level's service root and the tile path: `{service}/{path}`.
///
/// An empty service yields the bare path, which suits datasets on local disk.
#[derive(Clone, Copy, Debug, Default)]
pub struct PathUrlBuilder;

impl TileUrlBuilder for PathUrlBuilder {
    fn url(&self, tile: &Tile) -> Result<String, TileError> {
        let service = tile.level().service().trim_end_matches('/');
        if service.is_empty() {
            Ok(tile.path())
        } else {
            Ok(format!("{service}/{}", tile.path()))
        }
    }
}
