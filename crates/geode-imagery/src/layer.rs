//! Per-frame selection of imagery tiles over a level set.

use std::sync::Arc;
use std::time::Instant;

use geode_cull::Frustum;
use geode_geo::Globe;
use geode_render::{DrawContext, GraphicsBackend, TextureHandle};
use geode_terrain::{TessellatedTerrain, needs_to_split};
use geode_tiles::{LevelSet, Tile, TileKey};
use glam::DVec3;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::{
    FetchError, FetchHandle, ImageryError, RequestQueue, ResourceLoader, Retriever, SurfaceTexture,
    SurfaceTileRenderer, TextureTile, TileId, TileImage, fallback_transform,
};

/// Tuning for a [`TiledImageLayer`].
#[derive(Clone, Debug, PartialEq)]
pub struct ImageryLayerSettings {
    /// Load missing level-0 images synchronously during assembly.
    pub force_level_zero_loads: bool,
    /// Exempt level-0 fetches from out-of-view cancellation.
    pub retain_level_zero_tiles: bool,
    /// Mesh density assumed by the refinement test.
    pub split_density: u32,
    pub log10_resolution_target: f64,
    /// Cancel in-flight fetches for tiles not visited in the latest frame.
    pub cancel_out_of_view: bool,
    pub worker_threads: usize,
}

impl Default for ImageryLayerSettings {
    fn default() -> Self {
        Self {
            force_level_zero_loads: false,
            retain_level_zero_tiles: false,
            split_density: 20,
            log10_resolution_target: 1.3,
            cancel_out_of_view: false,
            worker_threads: num_cpus::get().clamp(1, 4),
        }
    }
}

struct Frame<'a> {
    globe: &'a Globe,
    frustum: &'a Frustum,
    eye: DVec3,
    exaggeration: f64,
    reference: DVec3,
    now: Instant,
}

/// An imagery pyramid with one arena of tiles, selected fresh each frame.
///
/// A selected tile either has its own image or borrows the nearest
/// ancestor image through its fallback, so nothing selected is drawn
/// untextured. Fetches for missing images are queued by distance to a
/// ground reference point and dispatched to the [`Retriever`] at the end of
/// assembly.
pub struct TiledImageLayer {
    name: String,
    level_set: LevelSet,
    settings: ImageryLayerSettings,
    loader: Arc<dyn ResourceLoader>,
    retriever: Retriever,
    renderer: SurfaceTileRenderer,
    tiles: Vec<TextureTile>,
    ids: FxHashMap<TileKey, TileId>,
    top_level: Vec<TileId>,
    current: Vec<TileId>,
    queue: RequestQueue,
    in_flight: FxHashMap<TileKey, FetchHandle>,
    visited: FxHashSet<TileKey>,
    reference_point: Option<DVec3>,
}

impl TiledImageLayer {
    pub fn new(
        name: impl Into<String>,
        level_set: LevelSet,
        loader: Arc<dyn ResourceLoader>,
        settings: ImageryLayerSettings,
    ) -> Result<Self, ImageryError> {
        let name = name.into();
        if settings.split_density == 0 || !settings.log10_resolution_target.is_finite() {
            let error = ImageryError::InvalidSettings(format!(
                "split density {} and resolution target {} must be positive and finite",
                settings.split_density, settings.log10_resolution_target
            ));
            tracing::error!(layer = %name, %error, "rejected imagery layer settings");
            return Err(error);
        }
        let retriever = Retriever::new(settings.worker_threads, Arc::clone(&loader))?;

        let mut layer = Self {
            name,
            level_set,
            settings,
            loader,
            retriever,
            renderer: SurfaceTileRenderer::new(),
            tiles: Vec::new(),
            ids: FxHashMap::default(),
            top_level: Vec::new(),
            current: Vec::new(),
            queue: RequestQueue::new(),
            in_flight: FxHashMap::default(),
            visited: FxHashSet::default(),
            reference_point: None,
        };
        for tile in layer.level_set.level_zero_tiles()? {
            let id = layer.insert(tile, None);
            layer.top_level.push(id);
        }
        tracing::debug!(
            layer = %layer.name,
            top_level = layer.top_level.len(),
            levels = layer.level_set.num_levels(),
            "created imagery layer"
        );
        Ok(layer)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn level_set(&self) -> &LevelSet {
        &self.level_set
    }

    pub fn settings(&self) -> &ImageryLayerSettings {
        &self.settings
    }

    pub fn tile(&self, id: TileId) -> Option<&TextureTile> {
        self.tiles.get(id.0)
    }

    pub fn tile_id(&self, key: &TileKey) -> Option<TileId> {
        self.ids.get(key).copied()
    }

    /// Tiles created so far, across all levels.
    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    pub fn top_level_tiles(&self) -> &[TileId] {
        &self.top_level
    }

    /// Tiles selected by the latest [`TiledImageLayer::assemble_tiles`].
    pub fn current_tiles(&self) -> &[TileId] {
        &self.current
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    pub fn is_in_flight(&self, key: &TileKey) -> bool {
        self.in_flight.contains_key(key)
    }

    /// The ground point fetches were prioritized against in the latest frame.
    pub fn reference_point(&self) -> Option<DVec3> {
        self.reference_point
    }

    /// Supply an image for an existing tile directly, bypassing retrieval.
    pub fn preload(&mut self, key: &TileKey, image: TileImage) -> bool {
        let Some(&id) = self.ids.get(key) else {
            return false;
        };
        let tile = &mut self.tiles[id.0];
        self.level_set.unmark_resource_absent(tile.tile());
        tile.set_image(image);
        true
    }

    /// Select the tiles to draw this frame and dispatch fetches for missing images.
    ///
    /// `terrain`, when given, refines the fetch reference point to the
    /// rendered surface. Returns the number of tiles selected.
    pub fn assemble_tiles(
        &mut self,
        dc: &DrawContext,
        terrain: Option<&TessellatedTerrain>,
    ) -> Result<usize, ImageryError> {
        self.current.clear();
        self.visited.clear();

        let reference = compute_reference_point(dc, terrain);
        self.reference_point = Some(reference);
        let frame = Frame {
            globe: dc.globe(),
            frustum: dc.frustum_in_model_coordinates(),
            eye: dc.eye_point(),
            exaggeration: dc.vertical_exaggeration(),
            reference,
            now: dc.frame_time(),
        };

        for index in 0..self.top_level.len() {
            let id = self.top_level[index];
            if self.is_visible(id, &frame) {
                self.add_tile_or_descendants(id, None, &frame)?;
            }
        }

        let dispatched = self.dispatch_requests();
        if self.settings.cancel_out_of_view {
            self.cancel_out_of_view();
        }

        tracing::debug!(
            layer = %self.name,
            frame = dc.frame_number(),
            selected = self.current.len(),
            dispatched,
            in_flight = self.in_flight.len(),
            tiles = self.tiles.len(),
            "assembled imagery tiles"
        );
        Ok(self.current.len())
    }

    /// Collect finished fetches: store images, and record failures as absences.
    ///
    /// Returns true if any new image arrived and the frame should be redrawn.
    pub fn process_completed(&mut self, now: Instant) -> bool {
        let mut redraw = false;
        for outcome in self.retriever.drain_completed() {
            self.in_flight.remove(&outcome.key);
            let Some(&id) = self.ids.get(&outcome.key) else {
                continue;
            };
            let tile = &mut self.tiles[id.0];
            match outcome.result {
                Ok(image) => {
                    self.level_set.unmark_resource_absent(tile.tile());
                    tile.set_image(image);
                    redraw = true;
                    tracing::trace!(key = %outcome.key, "tile image arrived");
                }
                Err(FetchError::Cancelled) => {
                    tracing::trace!(key = %outcome.key, "tile fetch cancelled");
                }
                Err(error) => {
                    let attempts = self.level_set.mark_resource_absent_at(tile.tile(), now);
                    tracing::warn!(
                        layer = %self.name,
                        key = %outcome.key,
                        url = %outcome.url,
                        attempts,
                        %error,
                        "tile fetch failed"
                    );
                }
            }
        }
        redraw
    }

    /// Drape the selected tiles over `terrain`. Returns the number of draws.
    pub fn render(
        &mut self,
        terrain: &TessellatedTerrain,
        backend: &mut dyn GraphicsBackend,
    ) -> Result<usize, ImageryError> {
        let mut textures = Vec::with_capacity(self.current.len());
        for index in 0..self.current.len() {
            let id = self.current[index];
            let tile = &self.tiles[id.0];
            let region = *tile.region();
            let (source, tex_scale, tex_shift) = match tile.fallback() {
                Some(ancestor) => {
                    let (scale, shift) = fallback_transform(tile.key(), self.tiles[ancestor.0].level_number());
                    (ancestor, scale, shift)
                }
                None => (id, 1.0, [0.0, 0.0]),
            };
            if let Some(texture) = self.upload(source, backend)? {
                textures.push(SurfaceTexture {
                    region,
                    texture,
                    tex_scale,
                    tex_shift,
                });
            }
        }
        self.renderer.render(backend, terrain.tiles(), &textures)
    }

    fn insert(&mut self, tile: Tile, parent: Option<TileId>) -> TileId {
        let id = TileId(self.tiles.len());
        self.ids.insert(tile.key(), id);
        self.tiles.push(TextureTile::new(tile, parent));
        id
    }

    fn children_of(&mut self, id: TileId) -> Result<[TileId; 4], ImageryError> {
        if let Some(children) = self.tiles[id.0].children() {
            return Ok(children);
        }
        let level = self.tiles[id.0].level_number();
        let next = Arc::clone(self.level_set.level(level + 1)?);
        let subtiles = self.tiles[id.0].tile().subdivide(&next)?;
        let mut children = [id; 4];
        for (slot, subtile) in children.iter_mut().zip(subtiles) {
            *slot = self.insert(subtile, Some(id));
        }
        self.tiles[id.0].set_children(children);
        Ok(children)
    }

    fn is_visible(&mut self, id: TileId, frame: &Frame<'_>) -> bool {
        let tile = &mut self.tiles[id.0];
        let visible = tile.is_visible(frame.globe, frame.exaggeration, frame.frustum);
        if visible {
            self.visited.insert(tile.key());
        }
        visible
    }

    /// Empty levels have nothing to fetch, so their tiles always refine
    /// unless the level is final.
    fn meets_render_criteria(&self, id: TileId, frame: &Frame<'_>) -> bool {
        let tile = &self.tiles[id.0];
        let level = tile.level_number();
        if self.level_set.is_final_level(level) {
            return true;
        }
        !self.level_set.is_level_empty(level)
            && !needs_to_split(
                frame.globe,
                frame.eye,
                frame.exaggeration,
                tile.region(),
                self.settings.split_density,
                self.settings.log10_resolution_target,
            )
    }

    /// `resource` is the nearest ancestor holding an image, threaded down the
    /// recursion so siblings never see each other's ancestors.
    fn add_tile_or_descendants(
        &mut self,
        id: TileId,
        resource: Option<TileId>,
        frame: &Frame<'_>,
    ) -> Result<(), ImageryError> {
        if self.meets_render_criteria(id, frame) {
            self.add_tile(id, resource, frame);
            return Ok(());
        }

        let resource = if self.tiles[id.0].has_image() {
            Some(id)
        } else {
            resource
        };
        for child in self.children_of(id)? {
            if self.is_visible(child, frame) {
                self.add_tile_or_descendants(child, resource, frame)?;
            }
        }
        Ok(())
    }

    fn add_tile(&mut self, id: TileId, resource: Option<TileId>, frame: &Frame<'_>) {
        self.tiles[id.0].set_fallback(None);
        if self.tiles[id.0].has_image() {
            self.current.push(id);
            return;
        }

        let level = self.tiles[id.0].level_number();
        let absent = self
            .level_set
            .is_resource_absent_at(self.tiles[id.0].tile(), frame.now);
        if level == 0 && self.settings.force_level_zero_loads && !absent {
            if self.load_now(id, frame.now) {
                self.current.push(id);
                return;
            }
        } else if !absent {
            self.request(id, frame);
        }

        if let Some(ancestor) = resource {
            self.tiles[id.0].set_fallback(Some(ancestor));
            self.current.push(id);
        }
    }

    fn load_now(&mut self, id: TileId, now: Instant) -> bool {
        let tile = &mut self.tiles[id.0];
        let result = tile
            .tile()
            .resource_url()
            .map_err(FetchError::from)
            .and_then(|url| {
                let bytes = self.loader.fetch(&url)?;
                TileImage::decode(&url, &bytes)
            });
        match result {
            Ok(image) => {
                self.level_set.unmark_resource_absent(tile.tile());
                tile.set_image(image);
                true
            }
            Err(error) => {
                let attempts = self.level_set.mark_resource_absent_at(tile.tile(), now);
                tracing::warn!(layer = %self.name, key = %tile.key(), attempts, %error, "level-zero load failed");
                false
            }
        }
    }

    fn request(&mut self, id: TileId, frame: &Frame<'_>) {
        let tile = &self.tiles[id.0];
        let key = tile.key();
        if self.in_flight.contains_key(&key) {
            return;
        }
        let center = frame
            .globe
            .surface_point(tile.region().centroid(), frame.exaggeration);
        self.queue.push(key, center.distance(frame.reference));
    }

    fn dispatch_requests(&mut self) -> usize {
        let mut dispatched = 0;
        for (key, distance) in self.queue.drain() {
            let Some(&id) = self.ids.get(&key) else {
                continue;
            };
            match self.tiles[id.0].tile().resource_url() {
                Ok(url) => {
                    if let Some(handle) = self.retriever.dispatch(key, url) {
                        tracing::trace!(%key, distance, "dispatched tile fetch");
                        self.in_flight.insert(key, handle);
                        dispatched += 1;
                    }
                }
                Err(error) => {
                    tracing::warn!(layer = %self.name, %key, %error, "no locator for tile");
                }
            }
        }
        dispatched
    }

    fn cancel_out_of_view(&self) {
        for (key, handle) in &self.in_flight {
            let retained = self.settings.retain_level_zero_tiles && key.level == 0;
            if !retained && !self.visited.contains(key) && !handle.is_cancelled() {
                tracing::trace!(%key, "cancelling out-of-view fetch");
                handle.cancel();
            }
        }
    }

    fn upload(
        &mut self,
        id: TileId,
        backend: &mut dyn GraphicsBackend,
    ) -> Result<Option<TextureHandle>, ImageryError> {
        let tile = &mut self.tiles[id.0];
        if let Some(texture) = tile.texture() {
            return Ok(Some(texture));
        }
        let Some(image) = tile.image() else {
            return Ok(None);
        };
        let label = format!("{}:{}", self.name, tile.key());
        let texture = backend.create_texture(&label, image.width(), image.height(), image.rgba())?;
        tile.set_texture(texture);
        Ok(Some(texture))
    }
}

/// The ground point under the viewport's vertical center line, searched from
/// the center downward; the eye point when no ray meets the globe.
fn compute_reference_point(dc: &DrawContext, terrain: Option<&TessellatedTerrain>) -> DVec3 {
    let view = dc.view();
    let globe = dc.globe();
    let viewport = view.viewport();
    let (x, center_y) = viewport.center();
    let bottom = viewport.y + viewport.height;

    let mut y = center_y;
    while y <= bottom {
        if let Some(position) = view.compute_position_from_screen_point(globe, x, y) {
            return terrain
                .and_then(|t| t.surface_point(position))
                .unwrap_or_else(|| globe.surface_point(position, dc.vertical_exaggeration()));
        }
        y += 1.0;
    }
    dc.eye_point()
}
