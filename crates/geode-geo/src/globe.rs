//! The globe: a reference ellipsoid with a pluggable elevation model.

use std::fmt;
use std::sync::Arc;

use glam::DVec3;

use crate::{Ellipsoid, LatLon, Region};

/// A source of terrain heights, in meters above the ellipsoid.
pub trait ElevationModel: Send + Sync {
    /// Height at a geodetic position.
    fn elevation(&self, position: LatLon) -> f64;

    /// Lowest height the model can return anywhere.
    fn min_elevation(&self) -> f64;

    /// Highest height the model can return anywhere.
    fn max_elevation(&self) -> f64;

    /// Height range within a region. Defaults to the global range.
    fn extreme_elevations(&self, _region: &Region) -> (f64, f64) {
        (self.min_elevation(), self.max_elevation())
    }
}

/// A flat model that reports zero everywhere.
#[derive(Clone, Copy, Debug, Default)]
pub struct ZeroElevation;

impl ElevationModel for ZeroElevation {
    fn elevation(&self, _position: LatLon) -> f64 {
        0.0
    }

    fn min_elevation(&self) -> f64 {
        0.0
    }

    fn max_elevation(&self) -> f64 {
        0.0
    }
}

/// A near-spherical body: the ellipsoid plus its terrain.
#[derive(Clone)]
pub struct Globe {
    ellipsoid: Ellipsoid,
    elevation: Arc<dyn ElevationModel>,
}

impl fmt::Debug for Globe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Globe")
            .field("ellipsoid", &self.ellipsoid)
            .field("min_elevation", &self.elevation.min_elevation())
            .field("max_elevation", &self.elevation.max_elevation())
            .finish()
    }
}

impl Globe {
    pub fn new(ellipsoid: Ellipsoid, elevation: Arc<dyn ElevationModel>) -> Self {
        Self {
            ellipsoid,
            elevation,
        }
    }

    /// A WGS84 globe with no terrain.
    pub fn wgs84_flat() -> Self {
        Self::new(Ellipsoid::WGS84, Arc::new(ZeroElevation))
    }

    pub fn ellipsoid(&self) -> &Ellipsoid {
        &self.ellipsoid
    }

    pub fn elevation_model(&self) -> &Arc<dyn ElevationModel> {
        &self.elevation
    }

    /// Equatorial radius; the radius used for cell-size estimates.
    pub fn radius(&self) -> f64 {
        self.ellipsoid.equatorial_radius()
    }

    pub fn maximum_radius(&self) -> f64 {
        self.ellipsoid.maximum_radius()
    }

    pub fn min_elevation(&self) -> f64 {
        self.elevation.min_elevation()
    }

    pub fn max_elevation(&self) -> f64 {
        self.elevation.max_elevation()
    }

    pub fn elevation(&self, position: LatLon) -> f64 {
        self.elevation.elevation(position)
    }

    /// Cartesian point at an explicit height.
    pub fn point_at(&self, position: LatLon, elevation: f64) -> DVec3 {
        self.ellipsoid.point_at(position, elevation)
    }

    /// Cartesian point on the terrain surface, with heights scaled by
    /// `vertical_exaggeration`.
    pub fn surface_point(&self, position: LatLon, vertical_exaggeration: f64) -> DVec3 {
        let h = self.elevation(position) * vertical_exaggeration;
        self.point_at(position, h)
    }

    pub fn surface_normal(&self, position: LatLon) -> DVec3 {
        self.ellipsoid.surface_normal(position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Constant(f64);

    impl ElevationModel for Constant {
        fn elevation(&self, _position: LatLon) -> f64 {
            self.0
        }
        fn min_elevation(&self) -> f64 {
            self.0
        }
        fn max_elevation(&self) -> f64 {
            self.0
        }
    }

    /// Surface points are lifted by the exaggerated elevation.
    #[test]
    fn test_surface_point_applies_exaggeration() {
        let globe = Globe::new(Ellipsoid::sphere(1000.0).unwrap(), Arc::new(Constant(10.0)));
        let p = globe.surface_point(LatLon::new(0.0, 0.0), 2.0);
        assert!((p.length() - 1020.0).abs() < 1e-9);
    }

    /// The flat globe reports zero elevation range.
    #[test]
    fn test_flat_globe() {
        let globe = Globe::wgs84_flat();
        assert_eq!(globe.min_elevation(), 0.0);
        assert_eq!(globe.max_elevation(), 0.0);
        assert_eq!(globe.radius(), Ellipsoid::WGS84.equatorial_radius());
    }
}
