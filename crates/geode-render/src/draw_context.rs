//! Per-frame state shared by the tessellator and imagery layers.

use std::sync::Arc;
use std::time::Instant;

use geode_cull::Frustum;
use geode_geo::{Globe, Region};
use glam::DVec3;

use crate::View;

/// The frame's globe, camera snapshot, and visible sector.
///
/// [`DrawContext::begin_frame`] captures the view once so every traversal in
/// the frame sees the same frustum and eye point.
pub struct DrawContext {
    globe: Globe,
    view: Arc<dyn View>,
    vertical_exaggeration: f64,
    frustum: Frustum,
    eye_point: DVec3,
    visible_sector: Region,
    frame_time: Instant,
    frame_number: u64,
}

impl DrawContext {
    pub fn new(globe: Globe, view: Arc<dyn View>) -> Self {
        let frustum = view.frustum_in_model_coordinates();
        let eye_point = view.eye_point();
        Self {
            globe,
            view,
            vertical_exaggeration: 1.0,
            frustum,
            eye_point,
            visible_sector: Region::EMPTY,
            frame_time: Instant::now(),
            frame_number: 0,
        }
    }

    /// Start a frame at `now`: snapshot the view and clear the visible sector.
    pub fn begin_frame(&mut self, now: Instant) {
        self.frustum = self.view.frustum_in_model_coordinates();
        self.eye_point = self.view.eye_point();
        self.visible_sector = Region::EMPTY;
        self.frame_time = now;
        self.frame_number += 1;
        tracing::trace!(frame = self.frame_number, "begin frame");
    }

    /// Replace the camera. Takes effect at the next [`DrawContext::begin_frame`].
    pub fn set_view(&mut self, view: Arc<dyn View>) {
        self.view = view;
    }

    pub fn view(&self) -> &dyn View {
        self.view.as_ref()
    }

    pub fn globe(&self) -> &Globe {
        &self.globe
    }

    pub fn vertical_exaggeration(&self) -> f64 {
        self.vertical_exaggeration
    }

    pub fn set_vertical_exaggeration(&mut self, exaggeration: f64) {
        self.vertical_exaggeration = exaggeration;
    }

    pub fn frustum_in_model_coordinates(&self) -> &Frustum {
        &self.frustum
    }

    pub fn eye_point(&self) -> DVec3 {
        self.eye_point
    }

    pub fn visible_sector(&self) -> &Region {
        &self.visible_sector
    }

    pub fn set_visible_sector(&mut self, sector: Region) {
        self.visible_sector = sector;
    }

    pub fn frame_time(&self) -> Instant {
        self.frame_time
    }

    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }
}
