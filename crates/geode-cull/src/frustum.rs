//! Six-plane view frustums in eye and model coordinates.

use glam::{DMat4, DVec3};

use crate::{CullError, Extent, Plane};

/// A view volume bounded by six inward-facing planes.
///
/// Tests visit the planes in the fixed order near, far, left, right, top,
/// bottom and stop at the first plane that separates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Frustum {
    near: Plane,
    far: Plane,
    left: Plane,
    right: Plane,
    top: Plane,
    bottom: Plane,
}

impl Frustum {
    pub fn new(near: Plane, far: Plane, left: Plane, right: Plane, top: Plane, bottom: Plane) -> Self {
        Self {
            near,
            far,
            left,
            right,
            top,
            bottom,
        }
    }

    /// Extract planes from a projection (or view-projection) matrix using the
    /// Gribb/Hartmann method with OpenGL clip-space depth (`-w <= z <= w`).
    pub fn from_projection_matrix(m: &DMat4) -> Self {
        let r0 = m.row(0);
        let r1 = m.row(1);
        let r2 = m.row(2);
        let r3 = m.row(3);
        Self {
            near: Plane::from_vec4(r3 + r2),
            far: Plane::from_vec4(r3 - r2),
            left: Plane::from_vec4(r3 + r0),
            right: Plane::from_vec4(r3 - r0),
            top: Plane::from_vec4(r3 - r1),
            bottom: Plane::from_vec4(r3 + r1),
        }
    }

    /// Build an eye-space frustum looking down -z.
    ///
    /// `horizontal_fov` is in degrees; the vertical extent follows from the
    /// viewport aspect ratio.
    pub fn from_perspective(
        horizontal_fov: f64,
        viewport_width: f64,
        viewport_height: f64,
        near: f64,
        far: f64,
    ) -> Result<Self, CullError> {
        if !(horizontal_fov > 0.0 && horizontal_fov < 180.0) {
            return Err(CullError::InvalidPerspective("field of view must be in (0, 180)"));
        }
        if !(viewport_width > 0.0 && viewport_height > 0.0) {
            return Err(CullError::InvalidPerspective("viewport must have positive size"));
        }
        if !(near > 0.0 && far > near) {
            return Err(CullError::InvalidPerspective("require 0 < near < far"));
        }

        let focal_length = 1.0 / (0.5 * horizontal_fov.to_radians()).tan();
        let aspect = viewport_height / viewport_width;
        let lr_len = (focal_length * focal_length + 1.0).sqrt();
        let bt_len = (focal_length * focal_length + aspect * aspect).sqrt();

        Ok(Self {
            near: Plane::new(0.0, 0.0, -1.0, -near),
            far: Plane::new(0.0, 0.0, 1.0, far),
            left: Plane::new(focal_length / lr_len, 0.0, -1.0 / lr_len, 0.0),
            right: Plane::new(-focal_length / lr_len, 0.0, -1.0 / lr_len, 0.0),
            top: Plane::new(0.0, -focal_length / bt_len, -aspect / bt_len, 0.0),
            bottom: Plane::new(0.0, focal_length / bt_len, -aspect / bt_len, 0.0),
        })
    }

    pub fn near(&self) -> &Plane {
        &self.near
    }

    pub fn far(&self) -> &Plane {
        &self.far
    }

    pub fn left(&self) -> &Plane {
        &self.left
    }

    pub fn right(&self) -> &Plane {
        &self.right
    }

    pub fn top(&self) -> &Plane {
        &self.top
    }

    pub fn bottom(&self) -> &Plane {
        &self.bottom
    }

    /// All planes in test order: near, far, left, right, top, bottom.
    pub fn planes(&self) -> [&Plane; 6] {
        [
            &self.near,
            &self.far,
            &self.left,
            &self.right,
            &self.top,
            &self.bottom,
        ]
    }

    /// Transform every plane by `matrix` (see [`Plane::transform_by`]).
    #[must_use]
    pub fn transform_by(&self, matrix: &DMat4) -> Frustum {
        Frustum {
            near: self.near.transform_by(matrix),
            far: self.far.transform_by(matrix),
            left: self.left.transform_by(matrix),
            right: self.right.transform_by(matrix),
            top: self.top.transform_by(matrix),
            bottom: self.bottom.transform_by(matrix),
        }
    }

    /// Carry an eye-space frustum into model space given the model-view matrix.
    #[must_use]
    pub fn to_model_coordinates(&self, model_view: &DMat4) -> Frustum {
        self.transform_by(&model_view.transpose())
    }

    /// True if `point` is on the inside of all six planes.
    pub fn contains(&self, point: DVec3) -> bool {
        self.planes().iter().all(|plane| plane.dot(point) >= 0.0)
    }

    /// True unless some plane proves the extent lies entirely outside.
    pub fn intersects(&self, extent: &dyn Extent) -> bool {
        extent.intersects_frustum(self)
    }

    /// True if any part of the segment `a..b` lies inside the frustum.
    pub fn intersects_segment(&self, a: DVec3, b: DVec3) -> bool {
        let mut a = a;
        let mut b = b;
        for plane in self.planes() {
            let da = plane.dot(a);
            let db = plane.dot(b);
            if da < 0.0 && db < 0.0 {
                return false;
            }
            if da < 0.0 || db < 0.0 {
                let Some(p) = plane.intersect_segment(a, b) else {
                    return false;
                };
                if da < 0.0 {
                    a = p;
                } else {
                    b = p;
                }
            }
        }
        true
    }
}

/// The eye-space frustum of a view together with its clip distances.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewFrustum {
    frustum: Frustum,
    near_distance: f64,
    far_distance: f64,
    field_of_view: f64,
}

impl ViewFrustum {
    /// Build from a horizontal field of view in degrees and viewport size.
    pub fn new(
        field_of_view: f64,
        viewport_width: f64,
        viewport_height: f64,
        near_distance: f64,
        far_distance: f64,
    ) -> Result<Self, CullError> {
        let frustum = Frustum::from_perspective(
            field_of_view,
            viewport_width,
            viewport_height,
            near_distance,
            far_distance,
        )?;
        Ok(Self {
            frustum,
            near_distance,
            far_distance,
            field_of_view,
        })
    }

    pub fn frustum(&self) -> &Frustum {
        &self.frustum
    }

    pub fn near_distance(&self) -> f64 {
        self.near_distance
    }

    pub fn far_distance(&self) -> f64 {
        self.far_distance
    }

    /// Horizontal field of view in degrees.
    pub fn field_of_view(&self) -> f64 {
        self.field_of_view
    }

    /// The frustum expressed in model coordinates for the given model-view matrix.
    pub fn in_model_coordinates(&self, model_view: &DMat4) -> Frustum {
        self.frustum.to_model_coordinates(model_view)
    }
}
