//! Tile mesh construction.
//!
//! A mesh of density `n` has `(n + 3)²` vertices: the `(n + 1)²` grid over
//! the tile plus one skirt ring duplicating the boundary.

use std::sync::{Arc, OnceLock};

use geode_geo::{Globe, LatLon, Region};
use geode_render::{BufferHandle, GraphicsBackend, RenderError};
use glam::DVec3;

/// Triangle-list indices shared by every mesh of one density.
#[derive(Debug)]
pub struct IndexBuffer {
    density: u32,
    indices: Vec<u32>,
    gpu: OnceLock<BufferHandle>,
}

impl IndexBuffer {
    pub fn new(density: u32) -> Self {
        let side = density + 3;
        let mut indices = Vec::with_capacity(((side - 1) * (side - 1) * 6) as usize);
        for j in 0..side - 1 {
            for i in 0..side - 1 {
                let k = j * side + i;
                // Counter-clockwise seen from outside the globe.
                indices.extend_from_slice(&[k, k + 1, k + side, k + 1, k + side + 1, k + side]);
            }
        }
        Self {
            density,
            indices,
            gpu: OnceLock::new(),
        }
    }

    pub fn density(&self) -> u32 {
        self.density
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn count(&self) -> u32 {
        self.indices.len() as u32
    }

    /// Upload on first use and return the backend handle.
    pub fn upload(&self, backend: &mut dyn GraphicsBackend) -> Result<BufferHandle, RenderError> {
        if let Some(handle) = self.gpu.get() {
            return Ok(*handle);
        }
        let handle = backend.create_index_buffer("terrain indices", &self.indices)?;
        Ok(*self.gpu.get_or_init(|| handle))
    }
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct GpuMesh {
    pub vertices: BufferHandle,
    pub tex_coords: BufferHandle,
}

/// A built tile mesh, positions relative to `reference_center`.
#[derive(Debug)]
pub struct RenderInfo {
    density: u32,
    resolution: f64,
    exaggeration: f64,
    reference_center: DVec3,
    vertices: Vec<f32>,
    tex_coords: Vec<f32>,
    indices: Arc<IndexBuffer>,
    gpu: OnceLock<GpuMesh>,
}

impl RenderInfo {
    /// Sample the globe over `region` at `indices.density()` cells per side.
    ///
    /// With skirts, the outer ring drops to the globe's minimum elevation;
    /// without, it coincides with the tile boundary.
    pub fn build(
        globe: &Globe,
        region: &Region,
        exaggeration: f64,
        resolution: f64,
        make_skirts: bool,
        indices: Arc<IndexBuffer>,
    ) -> Self {
        let density = indices.density();
        let side = density + 3;
        let reference_center = globe.point_at(region.centroid(), 0.0);
        let skirt_elevation = globe.min_elevation() * exaggeration;

        let d_lat = region.delta_lat() / f64::from(density);
        let d_lon = region.delta_lon() / f64::from(density);

        let grid = |k: u32, min: f64, max: f64, delta: f64| -> f64 {
            match k {
                0 => min,
                k if k >= density + 1 => max,
                k => min + f64::from(k - 1) * delta,
            }
        };

        let count = (side * side) as usize;
        let mut vertices = Vec::with_capacity(count * 3);
        let mut tex_coords = Vec::with_capacity(count * 2);
        for j in 0..side {
            let lat = grid(j, region.min_lat(), region.max_lat(), d_lat);
            for i in 0..side {
                let lon = grid(i, region.min_lon(), region.max_lon(), d_lon);
                let position = LatLon::new(lat, lon);
                let on_skirt = j == 0 || j == side - 1 || i == 0 || i == side - 1;
                let elevation = if make_skirts && on_skirt {
                    skirt_elevation
                } else {
                    globe.elevation(position) * exaggeration
                };
                let p = globe.point_at(position, elevation) - reference_center;
                vertices.extend_from_slice(&[p.x as f32, p.y as f32, p.z as f32]);
                tex_coords.extend_from_slice(&[
                    ((lon - region.min_lon()) / region.delta_lon()) as f32,
                    ((lat - region.min_lat()) / region.delta_lat()) as f32,
                ]);
            }
        }

        Self {
            density,
            resolution,
            exaggeration,
            reference_center,
            vertices,
            tex_coords,
            indices,
            gpu: OnceLock::new(),
        }
    }

    pub fn density(&self) -> u32 {
        self.density
    }

    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    pub fn exaggeration(&self) -> f64 {
        self.exaggeration
    }

    pub fn reference_center(&self) -> DVec3 {
        self.reference_center
    }

    /// Packed `xyz` positions relative to the reference center.
    pub fn vertices(&self) -> &[f32] {
        &self.vertices
    }

    /// Packed `uv`, with `u` eastward and `v` northward over the tile.
    pub fn tex_coords(&self) -> &[f32] {
        &self.tex_coords
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / 3
    }

    pub fn indices(&self) -> &Arc<IndexBuffer> {
        &self.indices
    }

    /// Whether this mesh can serve a request at `resolution` and `exaggeration`.
    pub fn satisfies(&self, density: u32, resolution: f64, exaggeration: f64) -> bool {
        self.density == density && self.resolution <= resolution && self.exaggeration == exaggeration
    }

    /// Absolute position of vertex `(i, j)` of the full grid, ring included.
    pub fn vertex(&self, i: u32, j: u32) -> Option<DVec3> {
        let side = self.density + 3;
        if i >= side || j >= side {
            return None;
        }
        let k = ((j * side + i) * 3) as usize;
        let v = &self.vertices[k..k + 3];
        Some(self.reference_center + DVec3::new(f64::from(v[0]), f64::from(v[1]), f64::from(v[2])))
    }

    pub(crate) fn upload(&self, backend: &mut dyn GraphicsBackend) -> Result<GpuMesh, RenderError> {
        if let Some(mesh) = self.gpu.get() {
            return Ok(*mesh);
        }
        let vertices = backend.create_vertex_buffer("terrain vertices", bytemuck::cast_slice(&self.vertices))?;
        let tex_coords =
            backend.create_vertex_buffer("terrain tex coords", bytemuck::cast_slice(&self.tex_coords))?;
        Ok(*self.gpu.get_or_init(|| GpuMesh {
            vertices,
            tex_coords,
        }))
    }

    pub(crate) fn uploaded(&self) -> Option<GpuMesh> {
        self.gpu.get().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Index count covers every quad of the ringed grid.
    #[test]
    fn test_index_buffer_size() {
        let ib = IndexBuffer::new(20);
        assert_eq!(ib.count(), 22 * 22 * 6);
        assert_eq!(ib.indices().iter().copied().max(), Some(23 * 23 - 1));
    }

    /// A mesh of density n has (n + 3)² vertices and matching tex coords.
    #[test]
    fn test_vertex_count() {
        let globe = Globe::wgs84_flat();
        let region = Region::new(10.0, 20.0, 30.0, 40.0).unwrap();
        let info = RenderInfo::build(&globe, &region, 1.0, 1.0, true, Arc::new(IndexBuffer::new(8)));
        assert_eq!(info.vertex_count(), 121);
        assert_eq!(info.tex_coords().len(), 121 * 2);
    }

    /// The inner grid spans the region corners.
    #[test]
    fn test_grid_spans_region() {
        let globe = Globe::wgs84_flat();
        let region = Region::new(10.0, 20.0, 30.0, 40.0).unwrap();
        let info = RenderInfo::build(&globe, &region, 1.0, 1.0, true, Arc::new(IndexBuffer::new(4)));
        let sw = info.vertex(1, 1).unwrap();
        let ne = info.vertex(5, 5).unwrap();
        let expect_sw = globe.point_at(LatLon::new(10.0, 30.0), 0.0);
        let expect_ne = globe.point_at(LatLon::new(20.0, 40.0), 0.0);
        assert!(sw.distance(expect_sw) < 1.0, "{sw} vs {expect_sw}");
        assert!(ne.distance(expect_ne) < 1.0, "{ne} vs {expect_ne}");
        assert!(info.vertex(7, 0).is_none());
    }

    /// Skirt vertices sit at the globe's minimum elevation.
    #[test]
    fn test_skirts_drop_to_min_elevation() {
        use geode_geo::{Ellipsoid, ElevationModel};

        struct Hills;
        impl ElevationModel for Hills {
            fn elevation(&self, _position: LatLon) -> f64 {
                500.0
            }
            fn min_elevation(&self) -> f64 {
                -1_000.0
            }
            fn max_elevation(&self) -> f64 {
                500.0
            }
        }

        let globe = Globe::new(Ellipsoid::WGS84, Arc::new(Hills));
        let region = Region::new(0.0, 1.0, 0.0, 1.0).unwrap();
        let info = RenderInfo::build(&globe, &region, 2.0, 1.0, true, Arc::new(IndexBuffer::new(4)));
        let skirt = info.vertex(0, 0).unwrap();
        let edge = info.vertex(1, 1).unwrap();
        let corner = LatLon::new(0.0, 0.0);
        assert!(skirt.distance(globe.point_at(corner, -2_000.0)) < 0.5);
        assert!(edge.distance(globe.point_at(corner, 1_000.0)) < 0.5);
    }

    /// Cached meshes serve equal or coarser requests at the same exaggeration.
    #[test]
    fn test_satisfies() {
        let globe = Globe::wgs84_flat();
        let region = Region::new(0.0, 1.0, 0.0, 1.0).unwrap();
        let info = RenderInfo::build(&globe, &region, 1.0, 100.0, true, Arc::new(IndexBuffer::new(4)));
        assert!(info.satisfies(4, 100.0, 1.0));
        assert!(info.satisfies(4, 200.0, 1.0));
        assert!(!info.satisfies(4, 50.0, 1.0));
        assert!(!info.satisfies(4, 100.0, 2.0));
        assert!(!info.satisfies(5, 100.0, 1.0));
    }
}
