//! Bounding spheres.

use glam::DVec3;

use crate::{CullError, Extent, Frustum, Line, Plane};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sphere {
    center: DVec3,
    radius: f64,
}

impl Sphere {
    pub fn new(center: DVec3, radius: f64) -> Result<Self, CullError> {
        if !(radius >= 0.0 && radius.is_finite()) {
            return Err(CullError::InvalidRadius(radius));
        }
        Ok(Self { center, radius })
    }

    /// Sphere centered on the midpoint of the points' axis-aligned extremes,
    /// with radius reaching the farthest point. `None` for an empty slice.
    pub fn from_points(points: &[DVec3]) -> Option<Self> {
        let first = *points.first()?;
        let (min, max) = points
            .iter()
            .fold((first, first), |(lo, hi), &p| (lo.min(p), hi.max(p)));
        let center = (min + max) * 0.5;
        let radius = points
            .iter()
            .map(|p| (*p - center).length())
            .fold(0.0_f64, f64::max);
        Some(Self { center, radius })
    }

    /// Line parameters where the line enters and leaves the sphere, nearest first.
    pub fn intersect_line(&self, line: &Line) -> Option<(f64, f64)> {
        let d = line.direction();
        let oc = line.origin() - self.center;
        let a = d.length_squared();
        if a == 0.0 {
            return None;
        }
        let b = 2.0 * d.dot(oc);
        let c = oc.length_squared() - self.radius * self.radius;
        let disc = b * b - 4.0 * a * c;
        if disc < 0.0 {
            return None;
        }
        let root = disc.sqrt();
        Some(((-b - root) / (2.0 * a), (-b + root) / (2.0 * a)))
    }
}

impl Extent for Sphere {
    fn center(&self) -> DVec3 {
        self.center
    }

    fn radius(&self) -> f64 {
        self.radius
    }

    fn intersects_frustum(&self, frustum: &Frustum) -> bool {
        for plane in frustum.planes() {
            if plane.dot(self.center) <= -self.radius {
                return false;
            }
        }
        true
    }

    fn intersects_plane(&self, plane: &Plane) -> bool {
        plane.dot(self.center) > -self.radius
    }

    fn intersects_line(&self, line: &Line) -> bool {
        line.distance_to(self.center) <= self.radius
    }

    fn effective_radius(&self, _plane: &Plane) -> f64 {
        self.radius
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// `from_points` encloses every input point.
    #[test]
    fn test_from_points_encloses() {
        let pts = [
            DVec3::new(1.0, 0.0, 0.0),
            DVec3::new(-1.0, 2.0, 0.0),
            DVec3::new(0.0, 1.0, 3.0),
        ];
        let s = Sphere::from_points(&pts).unwrap();
        for p in &pts {
            assert!((*p - s.center()).length() <= s.radius() + 1e-12);
        }
        assert!(Sphere::from_points(&[]).is_none());
    }

    /// A line through the center hits at distance ±radius.
    #[test]
    fn test_intersect_line() {
        let s = Sphere::new(DVec3::ZERO, 2.0).unwrap();
        let line = Line::new(DVec3::new(0.0, 0.0, 10.0), DVec3::NEG_Z);
        let (t0, t1) = s.intersect_line(&line).unwrap();
        assert!((t0 - 8.0).abs() < 1e-12);
        assert!((t1 - 12.0).abs() < 1e-12);
        let miss = Line::new(DVec3::new(5.0, 0.0, 10.0), DVec3::NEG_Z);
        assert!(s.intersect_line(&miss).is_none());
        assert!(!s.intersects_line(&miss));
    }

    /// Spheres fully behind a plane fail the frustum test; straddling ones pass.
    #[test]
    fn test_frustum() {
        let f = Frustum::from_perspective(90.0, 100.0, 100.0, 1.0, 100.0).unwrap();
        let inside = Sphere::new(DVec3::new(0.0, 0.0, -10.0), 1.0).unwrap();
        let behind = Sphere::new(DVec3::new(0.0, 0.0, 10.0), 1.0).unwrap();
        let straddle = Sphere::new(DVec3::new(0.0, 0.0, 0.0), 2.0).unwrap();
        assert!(f.intersects(&inside));
        assert!(!f.intersects(&behind));
        assert!(f.intersects(&straddle));
    }

    /// Negative radii are rejected.
    #[test]
    fn test_invalid_radius() {
        assert_eq!(
            Sphere::new(DVec3::ZERO, -1.0),
            Err(CullError::InvalidRadius(-1.0))
        );
    }
}
