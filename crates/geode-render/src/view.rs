//! Cameras the engine can cull and refine against.

use geode_cull::{Frustum, Line, Sphere, ViewFrustum};
use geode_geo::{Ellipsoid, Globe, LatLon};
use glam::{DMat4, DVec3};

use crate::RenderError;

/// Screen rectangle in pixels; `y` grows downward from the top edge.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width,
            height,
        }
    }

    pub fn center(&self) -> (f64, f64) {
        (self.x + 0.5 * self.width, self.y + 0.5 * self.height)
    }
}

/// What the tessellator and imagery layer need to know about the camera.
pub trait View {
    fn eye_point(&self) -> DVec3;

    fn model_view(&self) -> DMat4;

    fn view_frustum(&self) -> &ViewFrustum;

    fn viewport(&self) -> Viewport;

    fn frustum_in_model_coordinates(&self) -> Frustum {
        self.view_frustum().in_model_coordinates(&self.model_view())
    }

    /// Ray from the eye through a screen point, in model coordinates.
    fn compute_ray_from_screen_point(&self, x: f64, y: f64) -> Option<Line> {
        let viewport = self.viewport();
        if viewport.width <= 0.0 || viewport.height <= 0.0 {
            return None;
        }
        let ndc_x = 2.0 * (x - viewport.x) / viewport.width - 1.0;
        let ndc_y = 1.0 - 2.0 * (y - viewport.y) / viewport.height;

        let tan_h = (0.5 * self.view_frustum().field_of_view().to_radians()).tan();
        let tan_v = tan_h * viewport.height / viewport.width;
        let eye_dir = DVec3::new(ndc_x * tan_h, ndc_y * tan_v, -1.0);

        let inverse = self.model_view().inverse();
        let direction = inverse.transform_vector3(eye_dir);
        if !direction.is_finite() {
            return None;
        }
        Some(Line::new(self.eye_point(), direction.normalize()))
    }

    /// Nearest point where the ray through a screen point meets the ellipsoid.
    fn compute_point_from_screen_point(&self, globe: &Globe, x: f64, y: f64) -> Option<DVec3> {
        let ray = self.compute_ray_from_screen_point(x, y)?;
        intersect_ellipsoid(globe.ellipsoid(), &ray)
    }

    /// Geographic position under a screen point, if the ray hits the globe.
    fn compute_position_from_screen_point(&self, globe: &Globe, x: f64, y: f64) -> Option<LatLon> {
        self.compute_point_from_screen_point(globe, x, y)
            .map(|p| globe.ellipsoid().position_of(p).0)
    }
}

/// Intersect a line with an ellipsoid by scaling the polar axis into a sphere.
fn intersect_ellipsoid(ellipsoid: &Ellipsoid, line: &Line) -> Option<DVec3> {
    let a = ellipsoid.equatorial_radius();
    let stretch = DVec3::new(1.0, a / ellipsoid.polar_radius(), 1.0);
    let scaled = Line::new(line.origin() * stretch, line.direction() * stretch);
    let sphere = Sphere::new(DVec3::ZERO, a).ok()?;
    let (t0, t1) = sphere.intersect_line(&scaled)?;
    let t = if t0 >= 0.0 {
        t0
    } else if t1 >= 0.0 {
        t1
    } else {
        return None;
    };
    Some(line.point_at(t))
}

/// A perspective camera placed at an eye point and aimed at a target.
#[derive(Clone, Debug)]
pub struct LookAtView {
    eye: DVec3,
    target: DVec3,
    up: DVec3,
    viewport: Viewport,
    view_frustum: ViewFrustum,
    model_view: DMat4,
}

impl LookAtView {
    /// `field_of_view` is horizontal, in degrees.
    pub fn new(
        eye: DVec3,
        target: DVec3,
        up: DVec3,
        field_of_view: f64,
        viewport: Viewport,
        near: f64,
        far: f64,
    ) -> Result<Self, RenderError> {
        let forward = target - eye;
        if forward.length_squared() == 0.0 || forward.cross(up).length_squared() < 1e-24 {
            return Err(RenderError::DegenerateOrientation);
        }
        let view_frustum = ViewFrustum::new(field_of_view, viewport.width, viewport.height, near, far)?;
        Ok(Self {
            eye,
            target,
            up,
            viewport,
            view_frustum,
            model_view: DMat4::look_at_rh(eye, target, up),
        })
    }

    /// Look straight down at `position` from `altitude` above the ellipsoid,
    /// with north at the top of the screen.
    ///
    /// Clip distances bracket the ground and the horizon.
    pub fn looking_down(
        globe: &Globe,
        position: LatLon,
        altitude: f64,
        field_of_view: f64,
        viewport: Viewport,
    ) -> Result<Self, RenderError> {
        let eye = globe.point_at(position, altitude);
        let target = globe.point_at(position, 0.0);
        let (lat, lon) = (position.latitude_radians(), position.longitude_radians());
        let north = DVec3::new(-lat.sin() * lon.sin(), lat.cos(), -lat.sin() * lon.cos());

        let radius = globe.maximum_radius();
        let horizon = (altitude * (2.0 * radius + altitude)).sqrt();
        let near = (0.1 * altitude).max(1.0);
        let far = (horizon + radius).max(near * 2.0);
        Self::new(eye, target, north, field_of_view, viewport, near, far)
    }

    /// Same camera with a different eye point, keeping aim and lens.
    pub fn with_eye(&self, eye: DVec3) -> Result<Self, RenderError> {
        Self::new(
            eye,
            self.target,
            self.up,
            self.view_frustum.field_of_view(),
            self.viewport,
            self.view_frustum.near_distance(),
            self.view_frustum.far_distance(),
        )
    }

    pub fn target(&self) -> DVec3 {
        self.target
    }

    pub fn up(&self) -> DVec3 {
        self.up
    }
}

impl View for LookAtView {
    fn eye_point(&self) -> DVec3 {
        self.eye
    }

    fn model_view(&self) -> DMat4 {
        self.model_view
    }

    fn view_frustum(&self) -> &ViewFrustum {
        &self.view_frustum
    }

    fn viewport(&self) -> Viewport {
        self.viewport
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view_over(lat: f64, lon: f64, altitude: f64) -> (Globe, LookAtView) {
        let globe = Globe::wgs84_flat();
        let view = LookAtView::looking_down(
            &globe,
            LatLon::new(lat, lon),
            altitude,
            45.0,
            Viewport::new(800.0, 600.0),
        )
        .unwrap();
        (globe, view)
    }

    /// The viewport center picks the point directly below the camera.
    #[test]
    fn test_center_pick_is_nadir() {
        let (globe, view) = view_over(30.0, 45.0, 100_000.0);
        let (cx, cy) = view.viewport().center();
        let pos = view.compute_position_from_screen_point(&globe, cx, cy).unwrap();
        assert!((pos.latitude - 30.0).abs() < 0.05, "{pos:?}");
        assert!((pos.longitude - 45.0).abs() < 1e-6, "{pos:?}");
    }

    /// North is up: the top of the screen sees higher latitudes.
    #[test]
    fn test_screen_orientation() {
        let (globe, view) = view_over(0.0, 0.0, 100_000.0);
        let top = view.compute_position_from_screen_point(&globe, 400.0, 100.0).unwrap();
        let bottom = view.compute_position_from_screen_point(&globe, 400.0, 500.0).unwrap();
        let right = view.compute_position_from_screen_point(&globe, 700.0, 300.0).unwrap();
        assert!(top.latitude > 0.0 && bottom.latitude < 0.0);
        assert!(right.longitude > 0.0);
    }

    /// Rays past the limb of the globe miss.
    #[test]
    fn test_ray_misses_past_limb() {
        let globe = Globe::wgs84_flat();
        let eye = DVec3::new(0.0, 0.0, 3.0e7);
        let view = LookAtView::new(
            eye,
            DVec3::ZERO,
            DVec3::Y,
            60.0,
            Viewport::new(800.0, 800.0),
            1.0e6,
            1.0e8,
        )
        .unwrap();
        assert!(view.compute_point_from_screen_point(&globe, 400.0, 400.0).is_some());
        assert!(view.compute_point_from_screen_point(&globe, 0.0, 0.0).is_none());
    }

    /// The ground under the camera is inside the model-space frustum.
    #[test]
    fn test_frustum_contains_ground() {
        let (globe, view) = view_over(-20.0, 120.0, 50_000.0);
        let frustum = view.frustum_in_model_coordinates();
        assert!(frustum.contains(globe.point_at(LatLon::new(-20.0, 120.0), 0.0)));
        assert!(!frustum.contains(globe.point_at(LatLon::new(20.0, -60.0), 0.0)));
    }

    /// Coincident eye and target are rejected.
    #[test]
    fn test_degenerate_orientation() {
        let err = LookAtView::new(
            DVec3::X,
            DVec3::X,
            DVec3::Y,
            45.0,
            Viewport::new(1.0, 1.0),
            1.0,
            10.0,
        );
        assert_eq!(err.unwrap_err(), RenderError::DegenerateOrientation);
    }
}
