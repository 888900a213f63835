//! The cullable-volume interface shared by spheres and cylinders.

use glam::DVec3;

use crate::{Frustum, Line, Plane};

/// A bounding volume used as the cullable proxy for a tile.
pub trait Extent {
    fn center(&self) -> DVec3;

    /// Radius of a sphere that encloses the volume.
    fn radius(&self) -> f64;

    fn diameter(&self) -> f64 {
        2.0 * self.radius()
    }

    /// False only when some frustum plane proves the volume lies entirely outside.
    fn intersects_frustum(&self, frustum: &Frustum) -> bool;

    /// False when the volume lies entirely on the negative side of the plane.
    fn intersects_plane(&self, plane: &Plane) -> bool;

    fn intersects_line(&self, line: &Line) -> bool;

    /// Half-width of the volume's projection onto the plane normal.
    fn effective_radius(&self, plane: &Plane) -> f64;

    /// Distance from the volume center to `point`.
    fn distance_to(&self, point: DVec3) -> f64 {
        (self.center() - point).length()
    }
}
