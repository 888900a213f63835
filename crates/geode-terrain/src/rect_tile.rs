//! Terrain mesh patches.

use std::sync::Arc;

use geode_cull::{Cylinder, Extent, Frustum};
use geode_geo::{Globe, LatLon, Region};
use geode_render::{GraphicsBackend, PrimitiveType, UniformValue};
use geode_tiles::TileKey;
use glam::DVec3;

use crate::{RenderInfo, TerrainError};

/// One terrain patch: a region, its bounding cylinder, and once accepted
/// for a frame, its mesh.
#[derive(Clone, Debug)]
pub struct RectTile {
    region: Region,
    key: TileKey,
    density: u32,
    cell_size: f64,
    extent: Cylinder,
    exaggeration: f64,
    render_info: Option<Arc<RenderInfo>>,
}

impl RectTile {
    pub fn new(globe: &Globe, exaggeration: f64, region: Region, key: TileKey, density: u32) -> Self {
        Self {
            region,
            key,
            density,
            cell_size: region.delta_lat_radians() * globe.radius() / f64::from(density.max(1)),
            extent: Cylinder::from_region(globe, exaggeration, &region),
            exaggeration,
            render_info: None,
        }
    }

    pub fn region(&self) -> &Region {
        &self.region
    }

    pub fn key(&self) -> TileKey {
        self.key
    }

    pub fn level(&self) -> u32 {
        self.key.level
    }

    pub fn density(&self) -> u32 {
        self.density
    }

    /// Ground distance spanned by one mesh cell, in model units.
    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    pub fn extent(&self) -> &Cylinder {
        &self.extent
    }

    pub fn is_visible(&self, frustum: &Frustum) -> bool {
        self.extent.intersects_frustum(frustum)
    }

    /// Recompute the extent if the exaggeration it was built for is stale.
    pub fn update_extent(&mut self, globe: &Globe, exaggeration: f64) {
        if self.exaggeration != exaggeration {
            self.extent = Cylinder::from_region(globe, exaggeration, &self.region);
            self.exaggeration = exaggeration;
        }
    }

    /// Children in south-west, south-east, north-west, north-east order.
    pub fn subdivide(&self, globe: &Globe, exaggeration: f64) -> [RectTile; 4] {
        let [sw, se, nw, ne] = self.region.subdivide();
        let level = self.key.level + 1;
        let (row, column) = (2 * self.key.row, 2 * self.key.column);
        let child = |region: Region, row: u32, column: u32| {
            RectTile::new(globe, exaggeration, region, TileKey { level, row, column }, self.density)
        };
        [
            child(sw, row, column),
            child(se, row, column + 1),
            child(nw, row + 1, column),
            child(ne, row + 1, column + 1),
        ]
    }

    pub fn render_info(&self) -> Option<&Arc<RenderInfo>> {
        self.render_info.as_ref()
    }

    pub(crate) fn set_render_info(&mut self, info: Arc<RenderInfo>) {
        self.render_info = Some(info);
    }

    /// Interpolate the built mesh at a position inside the tile.
    pub fn surface_point(&self, position: LatLon) -> Option<DVec3> {
        let info = self.render_info.as_ref()?;
        if !self.region.contains(position) {
            return None;
        }
        let n = f64::from(info.density());
        let s = (position.longitude - self.region.min_lon()) / self.region.delta_lon() * n;
        let t = (position.latitude - self.region.min_lat()) / self.region.delta_lat() * n;
        let i = (s.floor() as u32).min(info.density() - 1);
        let j = (t.floor() as u32).min(info.density() - 1);
        let (fs, ft) = (s - f64::from(i), t - f64::from(j));

        // Offset past the skirt ring.
        let (i, j) = (i + 1, j + 1);
        let sw = info.vertex(i, j)?;
        let se = info.vertex(i + 1, j)?;
        let nw = info.vertex(i, j + 1)?;
        let ne = info.vertex(i + 1, j + 1)?;
        let south = sw.lerp(se, fs);
        let north = nw.lerp(ne, fs);
        Some(south.lerp(north, ft))
    }

    /// Upload the mesh if needed and bind it. Returns the index count to
    /// draw, or `None` when the tile has no mesh yet.
    pub fn bind(&self, backend: &mut dyn GraphicsBackend) -> Result<Option<u32>, TerrainError> {
        let Some(info) = self.render_info.as_ref() else {
            return Ok(None);
        };
        let mesh = info.upload(backend)?;
        let indices = info.indices().upload(backend)?;
        backend.bind_vertex_buffer(0, mesh.vertices)?;
        backend.bind_vertex_buffer(1, mesh.tex_coords)?;
        backend.bind_index_buffer(indices)?;
        backend.set_uniform("reference_center", UniformValue::from(info.reference_center()));
        Ok(Some(info.indices().count()))
    }

    pub fn draw(&self, backend: &mut dyn GraphicsBackend, count: u32) -> Result<(), TerrainError> {
        backend.draw_indexed(PrimitiveType::Triangles, count)?;
        Ok(())
    }

    /// Bind and draw in one step. Tiles without a mesh emit nothing.
    pub fn render(&self, backend: &mut dyn GraphicsBackend) -> Result<(), TerrainError> {
        if let Some(count) = self.bind(backend)? {
            self.draw(backend, count)?;
        }
        Ok(())
    }
}
