//! Reference ellipsoid and geodetic/Cartesian conversion.
//!
//! Model coordinates are y-up: +y points to the north pole, +z toward
//! latitude 0 / longitude 0, and +x toward longitude 90° east.

use glam::DVec3;

use crate::{GeoError, LatLon};

/// An oblate ellipsoid of revolution.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ellipsoid {
    equatorial_radius: f64,
    polar_radius: f64,
    /// First eccentricity squared.
    es: f64,
}

impl Ellipsoid {
    /// The WGS84 ellipsoid, in meters.
    pub const WGS84: Ellipsoid = Ellipsoid {
        equatorial_radius: 6_378_137.0,
        polar_radius: 6_356_752.314_245,
        es: 0.006_694_379_990_141_316,
    };

    /// Create an ellipsoid from its radii.
    pub fn new(equatorial_radius: f64, polar_radius: f64) -> Result<Self, GeoError> {
        if !(equatorial_radius > 0.0 && polar_radius > 0.0 && polar_radius <= equatorial_radius)
        {
            return Err(GeoError::InvalidRadii {
                equatorial: equatorial_radius,
                polar: polar_radius,
            });
        }
        let ratio = polar_radius / equatorial_radius;
        Ok(Self {
            equatorial_radius,
            polar_radius,
            es: 1.0 - ratio * ratio,
        })
    }

    /// A perfect sphere.
    pub fn sphere(radius: f64) -> Result<Self, GeoError> {
        Self::new(radius, radius)
    }

    pub fn equatorial_radius(&self) -> f64 {
        self.equatorial_radius
    }

    pub fn polar_radius(&self) -> f64 {
        self.polar_radius
    }

    /// The larger of the two radii.
    pub fn maximum_radius(&self) -> f64 {
        self.equatorial_radius.max(self.polar_radius)
    }

    pub fn eccentricity_squared(&self) -> f64 {
        self.es
    }

    /// Cartesian point for a geodetic position at `height` meters above the ellipsoid.
    pub fn point_at(&self, position: LatLon, height: f64) -> DVec3 {
        let (sin_lat, cos_lat) = position.latitude_radians().sin_cos();
        let (sin_lon, cos_lon) = position.longitude_radians().sin_cos();
        let rpm = self.equatorial_radius / (1.0 - self.es * sin_lat * sin_lat).sqrt();
        DVec3::new(
            (rpm + height) * cos_lat * sin_lon,
            (rpm * (1.0 - self.es) + height) * sin_lat,
            (rpm + height) * cos_lat * cos_lon,
        )
    }

    /// Outward unit normal of the ellipsoid surface at a geodetic position.
    pub fn surface_normal(&self, position: LatLon) -> DVec3 {
        let (sin_lat, cos_lat) = position.latitude_radians().sin_cos();
        let (sin_lon, cos_lon) = position.longitude_radians().sin_cos();
        DVec3::new(cos_lat * sin_lon, sin_lat, cos_lat * cos_lon)
    }

    /// Geodetic position and height for a Cartesian point.
    ///
    /// Iterative; converges to sub-millimeter height within a few rounds for
    /// points near the surface.
    pub fn position_of(&self, point: DVec3) -> (LatLon, f64) {
        let p = (point.x * point.x + point.z * point.z).sqrt();
        let longitude = point.x.atan2(point.z).to_degrees();
        if p < 1e-9 {
            let latitude = if point.y >= 0.0 { 90.0 } else { -90.0 };
            return (
                LatLon::new(latitude, longitude),
                point.y.abs() - self.polar_radius,
            );
        }

        let mut lat = point.y.atan2(p * (1.0 - self.es));
        let mut height = 0.0;
        for _ in 0..6 {
            let sin_lat = lat.sin();
            let n = self.equatorial_radius / (1.0 - self.es * sin_lat * sin_lat).sqrt();
            height = p / lat.cos() - n;
            lat = point.y.atan2(p * (1.0 - self.es * n / (n + height)));
        }
        (LatLon::new(lat.to_degrees(), longitude), height)
    }
}

impl Default for Ellipsoid {
    fn default() -> Self {
        Self::WGS84
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The equator/prime-meridian point lies on +z at the equatorial radius.
    #[test]
    fn test_origin_point_on_positive_z() {
        let e = Ellipsoid::WGS84;
        let p = e.point_at(LatLon::new(0.0, 0.0), 0.0);
        assert!((p.z - e.equatorial_radius()).abs() < 1e-6);
        assert!(p.x.abs() < 1e-6 && p.y.abs() < 1e-6);
    }

    /// The north pole lies on +y at the polar radius.
    #[test]
    fn test_north_pole_on_positive_y() {
        let e = Ellipsoid::WGS84;
        let p = e.point_at(LatLon::new(90.0, 0.0), 0.0);
        assert!((p.y - e.polar_radius()).abs() < 1e-3);
    }

    /// Converting to Cartesian and back recovers the original position.
    #[test]
    fn test_position_of_inverts_point_at() {
        let e = Ellipsoid::WGS84;
        for &(lat, lon, h) in &[(45.0, 10.0, 0.0), (-33.0, -70.0, 2500.0), (80.0, 179.0, 10.0)] {
            let p = e.point_at(LatLon::new(lat, lon), h);
            let (pos, height) = e.position_of(p);
            assert!((pos.latitude - lat).abs() < 1e-7, "lat {lat} -> {}", pos.latitude);
            assert!((pos.longitude - lon).abs() < 1e-9);
            assert!((height - h).abs() < 1e-3);
        }
    }

    /// A sphere has zero eccentricity and equal radii.
    #[test]
    fn test_sphere() {
        let s = Ellipsoid::sphere(1000.0).unwrap();
        assert_eq!(s.eccentricity_squared(), 0.0);
        let p = s.point_at(LatLon::new(30.0, 60.0), 0.0);
        assert!((p.length() - 1000.0).abs() < 1e-9);
    }

    /// Invalid radii are rejected.
    #[test]
    fn test_invalid_radii() {
        assert!(Ellipsoid::new(0.0, 1.0).is_err());
        assert!(Ellipsoid::new(1.0, 2.0).is_err());
    }
}
