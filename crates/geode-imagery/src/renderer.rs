//! Drawing selected imagery onto terrain tiles.

use geode_geo::Region;
use geode_render::{GraphicsBackend, TextureHandle, UniformValue};
use geode_terrain::RectTile;

use crate::ImageryError;

/// A texture ready to drape over the terrain.
///
/// `region` is the area the texture covers on the ground. For tiles drawn
/// with an ancestor's image, `tex_scale` and `tex_shift` select the
/// sub-rectangle of that image.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceTexture {
    pub region: Region,
    pub texture: TextureHandle,
    pub tex_scale: f64,
    pub tex_shift: [f64; 2],
}

impl SurfaceTexture {
    /// Map from terrain-tile texture coordinates into this texture's region.
    ///
    /// Returns `(tile_offset, tile_scale)`.
    pub fn tile_transform(&self, terrain_region: &Region) -> ([f64; 2], [f64; 2]) {
        let r = &self.region;
        let offset = [
            (terrain_region.min_lon() - r.min_lon()) / r.delta_lon(),
            (terrain_region.min_lat() - r.min_lat()) / r.delta_lat(),
        ];
        let scale = [
            terrain_region.delta_lon() / r.delta_lon(),
            terrain_region.delta_lat() / r.delta_lat(),
        ];
        (offset, scale)
    }
}

/// Draws every intersecting texture once per terrain tile.
///
/// For each draw it sets `tile_offset` and `tile_scale` (terrain uv to
/// texture-region uv) and `tex_scale` and `tex_shift` (region uv to image uv).
#[derive(Clone, Copy, Debug, Default)]
pub struct SurfaceTileRenderer;

impl SurfaceTileRenderer {
    pub fn new() -> Self {
        Self
    }

    /// Returns the number of draws issued.
    pub fn render(
        &self,
        backend: &mut dyn GraphicsBackend,
        terrain: &[RectTile],
        textures: &[SurfaceTexture],
    ) -> Result<usize, ImageryError> {
        let mut draws = 0;
        for rect in terrain {
            let mut overlapping = textures
                .iter()
                .filter(|t| t.region.intersects(rect.region()))
                .peekable();
            if overlapping.peek().is_none() {
                continue;
            }
            let Some(count) = rect.bind(backend)? else {
                continue;
            };
            for texture in overlapping {
                let (offset, scale) = texture.tile_transform(rect.region());
                backend.bind_texture(0, texture.texture)?;
                backend.set_uniform("tile_offset", vec2(offset));
                backend.set_uniform("tile_scale", vec2(scale));
                backend.set_uniform("tex_scale", UniformValue::Float(texture.tex_scale as f32));
                backend.set_uniform("tex_shift", vec2(texture.tex_shift));
                rect.draw(backend, count)?;
                draws += 1;
            }
        }
        tracing::trace!(draws, "rendered surface tiles");
        Ok(draws)
    }
}

fn vec2(v: [f64; 2]) -> UniformValue {
    UniformValue::Vec2([v[0] as f32, v[1] as f32])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texture(region: Region) -> SurfaceTexture {
        SurfaceTexture {
            region,
            texture: TextureHandle(1),
            tex_scale: 1.0,
            tex_shift: [0.0, 0.0],
        }
    }

    /// A terrain tile in the north-east quarter of a texture maps to that quarter.
    #[test]
    fn test_tile_transform_quadrant() {
        let tex = texture(Region::new(0.0, 36.0, 0.0, 36.0).unwrap());
        let terrain = Region::new(18.0, 36.0, 18.0, 36.0).unwrap();
        assert_eq!(tex.tile_transform(&terrain), ([0.5, 0.5], [0.5, 0.5]));
    }

    /// A terrain tile larger than the texture scales past one.
    #[test]
    fn test_tile_transform_larger_terrain() {
        let tex = texture(Region::new(0.0, 9.0, 0.0, 9.0).unwrap());
        let terrain = Region::new(0.0, 36.0, -36.0, 0.0).unwrap();
        assert_eq!(tex.tile_transform(&terrain), ([-4.0, 0.0], [4.0, 4.0]));
    }
}
