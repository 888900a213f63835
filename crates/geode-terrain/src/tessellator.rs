//! Per-frame selection of terrain tiles.

use std::sync::Arc;

use geode_cull::Frustum;
use geode_geo::{Globe, LatLon, Region};
use geode_render::{BufferHandle, DrawContext, GraphicsBackend};
use geode_tiles::TileKey;
use glam::DVec3;
use rustc_hash::FxHashMap;

use crate::{IndexBuffer, RectTile, RenderInfo, TerrainError, TessellatorSettings, needs_to_split};

/// The tiles accepted for one frame and the region they cover.
#[derive(Clone, Debug, Default)]
pub struct TessellatedTerrain {
    tiles: Vec<RectTile>,
    visible_region: Region,
}

impl TessellatedTerrain {
    pub fn tiles(&self) -> &[RectTile] {
        &self.tiles
    }

    pub fn visible_region(&self) -> &Region {
        &self.visible_region
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Point on the rendered mesh at `position`, if some accepted tile covers it.
    pub fn surface_point(&self, position: LatLon) -> Option<DVec3> {
        self.tiles.iter().find_map(|tile| tile.surface_point(position))
    }

    pub fn render(&self, backend: &mut dyn GraphicsBackend) -> Result<(), TerrainError> {
        for tile in &self.tiles {
            tile.render(backend)?;
        }
        Ok(())
    }
}

/// Quadtree tessellator over an ellipsoidal globe.
///
/// Top-level tiles are a fixed latitude/longitude grid. Each frame they are
/// culled against the frustum and split while [`needs_to_split`] holds, up
/// to `max_level`. Meshes of accepted tiles are kept until a frame no longer
/// accepts them. Evicted meshes give up their buffers once no frame still
/// holds them.
pub struct EllipsoidRectangularTessellator {
    globe: Globe,
    settings: TessellatorSettings,
    top_level: Vec<RectTile>,
    exaggeration: f64,
    index_buffers: FxHashMap<u32, Arc<IndexBuffer>>,
    meshes: FxHashMap<TileKey, Arc<RenderInfo>>,
    evicted: Vec<Arc<RenderInfo>>,
    released: Vec<BufferHandle>,
}

impl EllipsoidRectangularTessellator {
    pub fn new(globe: Globe, settings: TessellatorSettings) -> Result<Self, TerrainError> {
        if let Err(e) = settings.validate() {
            tracing::error!(error = %e, "rejected tessellator settings");
            return Err(e);
        }
        let exaggeration = 1.0;
        let top_level = create_top_level_tiles(&globe, &settings, exaggeration);
        tracing::debug!(
            tiles = top_level.len(),
            density = settings.density,
            max_level = settings.max_level,
            "created tessellator"
        );
        Ok(Self {
            globe,
            settings,
            top_level,
            exaggeration,
            index_buffers: FxHashMap::default(),
            meshes: FxHashMap::default(),
            evicted: Vec::new(),
            released: Vec::new(),
        })
    }

    pub fn globe(&self) -> &Globe {
        &self.globe
    }

    pub fn settings(&self) -> &TessellatorSettings {
        &self.settings
    }

    pub fn top_level_tiles(&self) -> &[RectTile] {
        &self.top_level
    }

    /// Meshes currently cached across frames.
    pub fn cached_mesh_count(&self) -> usize {
        self.meshes.len()
    }

    /// Evicted meshes whose buffers wait for the last frame holding them.
    pub fn pending_release_count(&self) -> usize {
        self.evicted.len()
    }

    /// Select and mesh the tiles for the current frame.
    ///
    /// Writes the union of accepted regions into the draw context's visible
    /// sector.
    pub fn tessellate(&mut self, dc: &mut DrawContext) -> TessellatedTerrain {
        let exaggeration = dc.vertical_exaggeration();
        if exaggeration != self.exaggeration {
            for tile in &mut self.top_level {
                tile.update_extent(&self.globe, exaggeration);
            }
            self.exaggeration = exaggeration;
        }

        let selector = Selector {
            globe: &self.globe,
            settings: &self.settings,
            frustum: dc.frustum_in_model_coordinates(),
            eye: dc.eye_point(),
            exaggeration,
        };
        let mut tiles = Vec::new();
        for tile in &self.top_level {
            selector.select_visible_tiles(tile, &mut tiles);
        }

        let visible_region = Region::union_all(tiles.iter().map(RectTile::region));
        for tile in &mut tiles {
            let info = self.mesh_for(tile, exaggeration);
            tile.set_render_info(info);
        }
        self.retain_meshes(&tiles);
        self.collect_evicted();

        dc.set_visible_sector(visible_region);
        tracing::debug!(
            frame = dc.frame_number(),
            tiles = tiles.len(),
            cached_meshes = self.meshes.len(),
            pending_release = self.evicted.len(),
            "tessellated terrain"
        );
        TessellatedTerrain {
            tiles,
            visible_region,
        }
    }

    /// Hand buffers of evicted meshes back to the backend.
    pub fn release_buffers(&mut self, backend: &mut dyn GraphicsBackend) {
        self.collect_evicted();
        for buffer in self.released.drain(..) {
            backend.delete_buffer(buffer);
        }
    }

    fn index_buffer(&mut self, density: u32) -> Arc<IndexBuffer> {
        Arc::clone(
            self.index_buffers
                .entry(density)
                .or_insert_with(|| Arc::new(IndexBuffer::new(density))),
        )
    }

    fn mesh_for(&mut self, tile: &RectTile, exaggeration: f64) -> Arc<RenderInfo> {
        if let Some(info) = self.meshes.get(&tile.key()) {
            if info.satisfies(tile.density(), tile.cell_size(), exaggeration) {
                return Arc::clone(info);
            }
        }
        let indices = self.index_buffer(tile.density());
        let info = Arc::new(RenderInfo::build(
            &self.globe,
            tile.region(),
            exaggeration,
            tile.cell_size(),
            self.settings.make_skirts,
            indices,
        ));
        if let Some(stale) = self.meshes.insert(tile.key(), Arc::clone(&info)) {
            self.release(stale);
        }
        info
    }

    fn retain_meshes(&mut self, accepted: &[RectTile]) {
        let keep: FxHashMap<TileKey, ()> = accepted.iter().map(|t| (t.key(), ())).collect();
        let stale: Vec<TileKey> = self
            .meshes
            .keys()
            .filter(|key| !keep.contains_key(key))
            .copied()
            .collect();
        for key in stale {
            if let Some(info) = self.meshes.remove(&key) {
                self.release(info);
            }
        }
    }

    fn release(&mut self, info: Arc<RenderInfo>) {
        self.evicted.push(info);
    }

    /// A held frame may still upload an evicted mesh, so its handles are read
    /// only once this is the last reference.
    fn collect_evicted(&mut self) {
        let released = &mut self.released;
        self.evicted.retain(|info| {
            if Arc::strong_count(info) > 1 {
                return true;
            }
            if let Some(mesh) = info.uploaded() {
                released.push(mesh.vertices);
                released.push(mesh.tex_coords);
            }
            false
        });
    }
}

struct Selector<'a> {
    globe: &'a Globe,
    settings: &'a TessellatorSettings,
    frustum: &'a Frustum,
    eye: DVec3,
    exaggeration: f64,
}

impl Selector<'_> {
    fn select_visible_tiles(&self, tile: &RectTile, accepted: &mut Vec<RectTile>) {
        if !tile.is_visible(self.frustum) {
            return;
        }
        if tile.level() < self.settings.max_level && self.need_to_split(tile) {
            for child in tile.subdivide(self.globe, self.exaggeration) {
                self.select_visible_tiles(&child, accepted);
            }
            return;
        }
        tracing::trace!(key = %tile.key(), "accepted terrain tile");
        accepted.push(tile.clone());
    }

    fn need_to_split(&self, tile: &RectTile) -> bool {
        needs_to_split(
            self.globe,
            self.eye,
            self.exaggeration,
            tile.region(),
            tile.density(),
            self.settings.log10_resolution_target,
        )
    }
}

fn create_top_level_tiles(globe: &Globe, settings: &TessellatorSettings, exaggeration: f64) -> Vec<RectTile> {
    let n_lat = settings.num_lat_subdivisions;
    let n_lon = settings.num_lon_subdivisions;
    let d_lat = 180.0 / f64::from(n_lat);
    let d_lon = 360.0 / f64::from(n_lon);

    let mut tiles = Vec::with_capacity((n_lat * n_lon) as usize);
    for row in 0..n_lat {
        let min_lat = -90.0 + f64::from(row) * d_lat;
        let max_lat = if row + 1 == n_lat { 90.0 } else { min_lat + d_lat };
        for column in 0..n_lon {
            let min_lon = -180.0 + f64::from(column) * d_lon;
            let max_lon = if column + 1 == n_lon { 180.0 } else { min_lon + d_lon };
            let Ok(region) = Region::new(min_lat, max_lat, min_lon, max_lon) else {
                continue;
            };
            let key = TileKey {
                level: 0,
                row,
                column,
            };
            tiles.push(RectTile::new(globe, exaggeration, region, key, settings.density));
        }
    }
    tiles
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use geode_cull::Extent;
    use geode_geo::{Ellipsoid, ElevationModel};
    use geode_render::{LookAtView, RecordedCommand, RecordingBackend, View, Viewport};

    use super::*;

    fn context(globe: &Globe, position: LatLon, altitude: f64) -> DrawContext {
        let view = LookAtView::looking_down(globe, position, altitude, 45.0, Viewport::new(800.0, 600.0)).unwrap();
        let mut dc = DrawContext::new(globe.clone(), Arc::new(view));
        dc.begin_frame(Instant::now());
        dc
    }

    fn tessellator(settings: TessellatorSettings) -> EllipsoidRectangularTessellator {
        EllipsoidRectangularTessellator::new(Globe::wgs84_flat(), settings).unwrap()
    }

    fn max_level(terrain: &TessellatedTerrain) -> u32 {
        terrain.tiles().iter().map(RectTile::level).max().unwrap_or(0)
    }

    /// The default grid is 5 x 10 tiles of 36 degrees covering the globe.
    #[test]
    fn test_top_level_grid() {
        let t = tessellator(TessellatorSettings::default());
        assert_eq!(t.top_level_tiles().len(), 50);
        for tile in t.top_level_tiles() {
            assert_eq!(tile.region().delta_lat(), 36.0);
            assert_eq!(tile.region().delta_lon(), 36.0);
        }
        let union = Region::union_all(t.top_level_tiles().iter().map(RectTile::region));
        assert_eq!(union, Region::FULL_SPHERE);
    }

    /// Accepted tiles tile the visible region without overlap.
    #[test]
    fn test_coverage_without_overlap() {
        let globe = Globe::wgs84_flat();
        let mut t = tessellator(TessellatorSettings::default());
        let mut dc = context(&globe, LatLon::new(10.0, 20.0), 2.0e6);
        let terrain = t.tessellate(&mut dc);
        assert!(!terrain.is_empty());
        assert_eq!(dc.visible_sector(), terrain.visible_region());

        let tiles = terrain.tiles();
        for (i, a) in tiles.iter().enumerate() {
            for b in &tiles[i + 1..] {
                assert!(!a.region().intersects(b.region()), "{:?} overlaps {:?}", a.key(), b.key());
            }
        }
        let under_eye = LatLon::new(10.0, 20.0);
        assert!(tiles.iter().any(|tile| tile.region().contains(under_eye)));
    }

    /// No accepted tile lies outside the frustum.
    #[test]
    fn test_culled_tiles_not_accepted() {
        let globe = Globe::wgs84_flat();
        let mut t = tessellator(TessellatorSettings::default());
        let mut dc = context(&globe, LatLon::new(45.0, -100.0), 5.0e5);
        let terrain = t.tessellate(&mut dc);
        let frustum = dc.frustum_in_model_coordinates();
        for tile in terrain.tiles() {
            assert!(tile.extent().intersects_frustum(frustum));
        }
        let antipode = LatLon::new(-45.0, 80.0);
        assert!(terrain.tiles().iter().all(|tile| !tile.region().contains(antipode)));
    }

    /// Closer eyes produce finer tiles.
    #[test]
    fn test_refinement_increases_when_closer() {
        let globe = Globe::wgs84_flat();
        let mut t = tessellator(TessellatorSettings::default());
        let far = t.tessellate(&mut context(&globe, LatLon::new(0.0, 0.0), 1.0e7));
        let mid = t.tessellate(&mut context(&globe, LatLon::new(0.0, 0.0), 1.0e6));
        let near = t.tessellate(&mut context(&globe, LatLon::new(0.0, 0.0), 1.0e4));
        assert!(max_level(&far) <= max_level(&mid));
        assert!(max_level(&mid) < max_level(&near));
    }

    /// Refinement stops at the maximum level.
    #[test]
    fn test_max_level_respected() {
        let globe = Globe::wgs84_flat();
        let mut t = tessellator(TessellatorSettings {
            max_level: 3,
            ..Default::default()
        });
        let terrain = t.tessellate(&mut context(&globe, LatLon::new(0.0, 0.0), 100.0));
        assert_eq!(max_level(&terrain), 3);
    }

    /// Every accepted tile carries a (density + 3)² mesh.
    #[test]
    fn test_mesh_size() {
        let globe = Globe::wgs84_flat();
        let mut t = tessellator(TessellatorSettings {
            density: 10,
            ..Default::default()
        });
        let terrain = t.tessellate(&mut context(&globe, LatLon::new(0.0, 0.0), 1.0e6));
        for tile in terrain.tiles() {
            assert_eq!(tile.render_info().unwrap().vertex_count(), 13 * 13);
        }
    }

    /// Rendering uploads one shared index buffer and draws every tile once.
    #[test]
    fn test_render_commands() {
        let globe = Globe::wgs84_flat();
        let mut t = tessellator(TessellatorSettings::default());
        let terrain = t.tessellate(&mut context(&globe, LatLon::new(0.0, 0.0), 1.0e6));
        let mut backend = RecordingBackend::new();
        terrain.render(&mut backend).unwrap();

        assert_eq!(backend.draws().len(), terrain.len());
        assert!(backend.draws().iter().all(|d| d.count == 22 * 22 * 6));
        let index_uploads = backend
            .commands()
            .iter()
            .filter(|c| matches!(c, RecordedCommand::CreateIndexBuffer { .. }))
            .count();
        assert_eq!(index_uploads, 1);
        assert!(backend.draws()[0].uniform("reference_center").is_some());
    }

    /// Meshes are reused across frames and released once unused.
    #[test]
    fn test_mesh_cache_reuse_and_release() {
        let globe = Globe::wgs84_flat();
        let mut t = tessellator(TessellatorSettings::default());
        let mut backend = RecordingBackend::new();

        let mut dc = context(&globe, LatLon::new(0.0, 0.0), 1.0e5);
        let first = t.tessellate(&mut dc);
        first.render(&mut backend).unwrap();
        dc.begin_frame(Instant::now());
        let second = t.tessellate(&mut dc);
        assert_eq!(first.len(), second.len());
        for (a, b) in first.tiles().iter().zip(second.tiles()) {
            assert!(Arc::ptr_eq(a.render_info().unwrap(), b.render_info().unwrap()));
        }
        drop(first);
        drop(second);

        let _elsewhere = t.tessellate(&mut context(&globe, LatLon::new(0.0, 180.0), 1.0e5));
        t.release_buffers(&mut backend);
        assert_eq!(backend.buffer_count(), 1, "only the shared index buffer remains");
    }

    /// Evicted meshes of a frame still held by the caller are freed after it drops.
    #[test]
    fn test_release_waits_for_held_frame() {
        let globe = Globe::wgs84_flat();
        let mut t = tessellator(TessellatorSettings::default());
        let mut backend = RecordingBackend::new();

        let held = t.tessellate(&mut context(&globe, LatLon::new(0.0, 0.0), 1.0e5));
        held.render(&mut backend).unwrap();
        let uploaded = backend.buffer_count();
        assert!(uploaded > 1);

        let _elsewhere = t.tessellate(&mut context(&globe, LatLon::new(0.0, 180.0), 1.0e5));
        assert_eq!(t.pending_release_count(), held.len());
        t.release_buffers(&mut backend);
        assert_eq!(backend.buffer_count(), uploaded);

        drop(held);
        t.release_buffers(&mut backend);
        assert_eq!(t.pending_release_count(), 0);
        assert_eq!(backend.buffer_count(), 1, "only the shared index buffer remains");
    }

    /// Changing exaggeration rebuilds top-level extents.
    #[test]
    fn test_exaggeration_updates_extents() {
        struct Plateau;
        impl ElevationModel for Plateau {
            fn elevation(&self, _position: LatLon) -> f64 {
                2_000.0
            }
            fn min_elevation(&self) -> f64 {
                0.0
            }
            fn max_elevation(&self) -> f64 {
                2_000.0
            }
        }
        let globe = Globe::new(Ellipsoid::WGS84, Arc::new(Plateau));
        let mut t = EllipsoidRectangularTessellator::new(globe.clone(), TessellatorSettings::default()).unwrap();
        let before = t.top_level_tiles()[20].extent().height();

        let mut dc = context(&globe, LatLon::new(0.0, 0.0), 1.0e6);
        dc.set_vertical_exaggeration(10.0);
        let _ = t.tessellate(&mut dc);
        assert!(t.top_level_tiles()[20].extent().height() > before);
    }

    /// Invalid settings are rejected.
    #[test]
    fn test_invalid_settings() {
        let globe = Globe::wgs84_flat();
        for settings in [
            TessellatorSettings {
                density: 0,
                ..Default::default()
            },
            TessellatorSettings {
                num_lon_subdivisions: 0,
                ..Default::default()
            },
        ] {
            assert!(EllipsoidRectangularTessellator::new(globe.clone(), settings).is_err());
        }
    }

    /// The mesh surface point under the eye lies on the ellipsoid.
    #[test]
    fn test_surface_point_on_mesh() {
        let globe = Globe::wgs84_flat();
        let mut t = tessellator(TessellatorSettings::default());
        let mut dc = context(&globe, LatLon::new(5.0, 5.0), 1.0e6);
        let terrain = t.tessellate(&mut dc);
        let p = terrain.surface_point(LatLon::new(5.0, 5.0)).unwrap();
        let expected = globe.point_at(LatLon::new(5.0, 5.0), 0.0);
        assert!(p.distance(expected) / dc.view().eye_point().distance(expected) < 1e-2);
    }
}
