//! Oriented planes and infinite lines.

use glam::{DMat4, DVec3, DVec4};

/// A plane `n·p + d = 0` with unit normal `n`.
///
/// The normal points to the positive ("inside") half-space, so
/// [`Plane::dot`] is the signed distance of a point from the plane.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Plane {
    v: DVec4,
}

impl Plane {
    /// Build a plane from normal components and distance, normalizing so
    /// the normal has unit length. A zero normal is kept as-is.
    pub fn new(nx: f64, ny: f64, nz: f64, d: f64) -> Self {
        Self::from_vec4(DVec4::new(nx, ny, nz, d))
    }

    pub fn from_vec4(v: DVec4) -> Self {
        let len = v.truncate().length();
        if len > 0.0 {
            Self { v: v / len }
        } else {
            Self { v }
        }
    }

    /// Plane through `point` facing `normal`.
    pub fn from_point_normal(point: DVec3, normal: DVec3) -> Self {
        let n = normal.normalize_or_zero();
        Self {
            v: n.extend(-n.dot(point)),
        }
    }

    pub fn normal(&self) -> DVec3 {
        self.v.truncate()
    }

    pub fn distance(&self) -> f64 {
        self.v.w
    }

    pub fn as_vec4(&self) -> DVec4 {
        self.v
    }

    /// Signed distance of `point`; positive on the side the normal faces.
    #[inline]
    pub fn dot(&self, point: DVec3) -> f64 {
        self.v.x * point.x + self.v.y * point.y + self.v.z * point.z + self.v.w
    }

    /// Transform the plane by `matrix`, treating it as a homogeneous 4-vector.
    ///
    /// To carry a plane from space A into space B, pass the transpose of the
    /// B-to-A point transform.
    #[must_use]
    pub fn transform_by(&self, matrix: &DMat4) -> Plane {
        Self::from_vec4(*matrix * self.v)
    }

    /// Point where the line crosses the plane, or `None` when parallel.
    pub fn intersect(&self, line: &Line) -> Option<DVec3> {
        let t = self.intersect_distance(line)?;
        Some(line.point_at(t))
    }

    /// Line parameter at the crossing point, or `None` when parallel.
    pub fn intersect_distance(&self, line: &Line) -> Option<f64> {
        let ldotv = self.normal().dot(line.direction());
        if ldotv.abs() < f64::EPSILON {
            return None;
        }
        Some(-self.dot(line.origin()) / ldotv)
    }

    /// Crossing point of the segment `a..b`, if the end points straddle the plane.
    pub fn intersect_segment(&self, a: DVec3, b: DVec3) -> Option<DVec3> {
        let da = self.dot(a);
        let db = self.dot(b);
        if da * db > 0.0 {
            return None;
        }
        if da == db {
            // Both ends on the plane.
            return Some(a);
        }
        let t = da / (da - db);
        Some(a + (b - a) * t)
    }
}

/// An infinite line `origin + t * direction`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Line {
    origin: DVec3,
    direction: DVec3,
}

impl Line {
    pub fn new(origin: DVec3, direction: DVec3) -> Self {
        Self { origin, direction }
    }

    /// Line through two points, directed from `a` toward `b`.
    pub fn from_segment(a: DVec3, b: DVec3) -> Self {
        Self::new(a, b - a)
    }

    pub fn origin(&self) -> DVec3 {
        self.origin
    }

    pub fn direction(&self) -> DVec3 {
        self.direction
    }

    pub fn point_at(&self, t: f64) -> DVec3 {
        self.origin + self.direction * t
    }

    /// Closest point on the line to `point`.
    pub fn nearest_point_to(&self, point: DVec3) -> DVec3 {
        let dd = self.direction.length_squared();
        if dd == 0.0 {
            return self.origin;
        }
        let t = (point - self.origin).dot(self.direction) / dd;
        self.point_at(t)
    }

    pub fn distance_to(&self, point: DVec3) -> f64 {
        (point - self.nearest_point_to(point)).length()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Constructor normalizes the normal and scales distance to match.
    #[test]
    fn test_normalizes() {
        let p = Plane::new(0.0, 0.0, 2.0, -4.0);
        assert_eq!(p.normal(), DVec3::Z);
        assert_eq!(p.distance(), -2.0);
        assert_eq!(p.dot(DVec3::new(5.0, 5.0, 2.0)), 0.0);
    }

    /// Line/plane crossing point and the parallel case.
    #[test]
    fn test_line_intersection() {
        let p = Plane::from_point_normal(DVec3::new(0.0, 0.0, 5.0), DVec3::Z);
        let line = Line::new(DVec3::ZERO, DVec3::new(1.0, 0.0, 1.0));
        assert_eq!(p.intersect(&line), Some(DVec3::new(5.0, 0.0, 5.0)));
        let parallel = Line::new(DVec3::ZERO, DVec3::X);
        assert_eq!(p.intersect(&parallel), None);
    }

    /// Segments that do not straddle the plane have no crossing.
    #[test]
    fn test_segment_intersection() {
        let p = Plane::from_point_normal(DVec3::ZERO, DVec3::Y);
        let hit = p.intersect_segment(DVec3::new(0.0, -1.0, 0.0), DVec3::new(0.0, 3.0, 0.0));
        assert_eq!(hit, Some(DVec3::ZERO));
        assert!(p.intersect_segment(DVec3::Y, DVec3::Y * 2.0).is_none());
    }

    /// Translating a plane with the transposed inverse keeps points on it.
    #[test]
    fn test_transform_by_translation() {
        let p = Plane::from_point_normal(DVec3::ZERO, DVec3::X);
        let move_x = DMat4::from_translation(DVec3::new(3.0, 0.0, 0.0));
        let moved = p.transform_by(&move_x.inverse().transpose());
        assert!(moved.dot(DVec3::new(3.0, 7.0, -2.0)).abs() < 1e-12);
        assert!(moved.dot(DVec3::new(4.0, 0.0, 0.0)) > 0.0);
    }

    /// Nearest point and distance from a line.
    #[test]
    fn test_line_distance() {
        let line = Line::new(DVec3::ZERO, DVec3::X * 2.0);
        assert_eq!(line.nearest_point_to(DVec3::new(3.0, 4.0, 0.0)), DVec3::new(3.0, 0.0, 0.0));
        assert!((line.distance_to(DVec3::new(3.0, 4.0, 0.0)) - 4.0).abs() < 1e-12);
    }
}
