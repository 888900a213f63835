//! Imagery tiles and the texture fallback transform.

use geode_cull::{Cylinder, Extent, Frustum};
use geode_geo::{Globe, Region};
use geode_render::TextureHandle;
use geode_tiles::{Tile, TileKey};

use crate::TileImage;

/// Index of a [`TextureTile`] in its layer's arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileId(pub(crate) usize);

impl TileId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Scale and shift that map a tile's texture coordinates into the image of
/// an ancestor at `ancestor_level`.
///
/// With `n = key.level - ancestor_level`, `scale = 1 / 2^n` and
/// `shift = scale * (column mod 2^n, row mod 2^n)`.
pub fn fallback_transform(key: TileKey, ancestor_level: u32) -> (f64, [f64; 2]) {
    let n = key.level.saturating_sub(ancestor_level).min(31);
    let cells = 1u32 << n;
    let scale = 1.0 / f64::from(cells);
    let shift = [
        scale * f64::from(key.column % cells),
        scale * f64::from(key.row % cells),
    ];
    (scale, shift)
}

/// One node of an imagery pyramid.
///
/// Children are created on first descent and persist with the layer.
#[derive(Debug)]
pub struct TextureTile {
    tile: Tile,
    parent: Option<TileId>,
    children: Option<[TileId; 4]>,
    fallback: Option<TileId>,
    image: Option<TileImage>,
    texture: Option<TextureHandle>,
    extent: Option<(Cylinder, f64)>,
}

impl TextureTile {
    pub(crate) fn new(tile: Tile, parent: Option<TileId>) -> Self {
        Self {
            tile,
            parent,
            children: None,
            fallback: None,
            image: None,
            texture: None,
            extent: None,
        }
    }

    pub fn tile(&self) -> &Tile {
        &self.tile
    }

    pub fn key(&self) -> TileKey {
        self.tile.key()
    }

    pub fn level_number(&self) -> u32 {
        self.tile.level_number()
    }

    pub fn region(&self) -> &Region {
        self.tile.region()
    }

    pub fn parent(&self) -> Option<TileId> {
        self.parent
    }

    pub fn children(&self) -> Option<[TileId; 4]> {
        self.children
    }

    pub(crate) fn set_children(&mut self, children: [TileId; 4]) {
        self.children = Some(children);
    }

    /// The ancestor whose image stands in for this tile's, if any.
    pub fn fallback(&self) -> Option<TileId> {
        self.fallback
    }

    pub(crate) fn set_fallback(&mut self, fallback: Option<TileId>) {
        self.fallback = fallback;
    }

    /// Has image data, decoded or already uploaded.
    pub fn has_image(&self) -> bool {
        self.image.is_some() || self.texture.is_some()
    }

    pub fn image(&self) -> Option<&TileImage> {
        self.image.as_ref()
    }

    pub(crate) fn set_image(&mut self, image: TileImage) {
        self.image = Some(image);
    }

    pub fn texture(&self) -> Option<TextureHandle> {
        self.texture
    }

    /// Record the uploaded texture and drop the decoded pixels.
    pub(crate) fn set_texture(&mut self, texture: TextureHandle) -> Option<TileImage> {
        self.texture = Some(texture);
        self.image.take()
    }

    /// Bounding cylinder for the given exaggeration, rebuilt when it changes.
    pub(crate) fn extent(&mut self, globe: &Globe, exaggeration: f64) -> Cylinder {
        match self.extent {
            Some((cylinder, built_for)) if built_for == exaggeration => cylinder,
            _ => {
                let cylinder = Cylinder::from_region(globe, exaggeration, self.tile.region());
                self.extent = Some((cylinder, exaggeration));
                cylinder
            }
        }
    }

    pub(crate) fn is_visible(&mut self, globe: &Globe, exaggeration: f64, frustum: &Frustum) -> bool {
        self.extent(globe, exaggeration).intersects_frustum(frustum)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(level: u32, row: u32, column: u32) -> TileKey {
        TileKey { level, row, column }
    }

    /// Borrowing from the parent selects one quadrant.
    #[test]
    fn test_fallback_transform_one_level() {
        assert_eq!(fallback_transform(key(3, 4, 6), 2), (0.5, [0.0, 0.0]));
        assert_eq!(fallback_transform(key(3, 5, 7), 2), (0.5, [0.5, 0.5]));
        assert_eq!(fallback_transform(key(3, 4, 7), 2), (0.5, [0.5, 0.0]));
    }

    /// Three levels down selects one of 64 cells.
    #[test]
    fn test_fallback_transform_three_levels() {
        let (scale, shift) = fallback_transform(key(5, 13, 22), 2);
        assert_eq!(scale, 0.125);
        assert_eq!(shift, [0.125 * 6.0, 0.125 * 5.0]);
    }

    /// A tile falling back to its own level is the identity.
    #[test]
    fn test_fallback_transform_identity() {
        assert_eq!(fallback_transform(key(4, 9, 9), 4), (1.0, [0.0, 0.0]));
    }
}
