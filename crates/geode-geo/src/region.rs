//! Axis-aligned latitude/longitude rectangles.

use serde::{Deserialize, Serialize};

use crate::angle::{normalized_latitude, normalized_longitude};
use crate::{GeoError, LatLon};

/// A rectangular range of latitude and longitude, in degrees.
///
/// Invariant: `min_lat <= max_lat` and `min_lon <= max_lon`, with latitudes in
/// `[-90, 90]` and longitudes in `[-180, 180]`. Regions are values; every
/// operation returns a new region.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Region {
    min_lat: f64,
    max_lat: f64,
    min_lon: f64,
    max_lon: f64,
}

impl Default for Region {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl Region {
    /// The distinguished zero-area region. Identity for [`Region::union`].
    pub const EMPTY: Region = Region {
        min_lat: 0.0,
        max_lat: 0.0,
        min_lon: 0.0,
        max_lon: 0.0,
    };

    /// The whole globe.
    pub const FULL_SPHERE: Region = Region {
        min_lat: -90.0,
        max_lat: 90.0,
        min_lon: -180.0,
        max_lon: 180.0,
    };

    /// Create a region from bounds in degrees.
    ///
    /// Bounds must be finite, ordered and within the latitude/longitude
    /// limits. A region whose bounds collapse on either axis is returned as
    /// [`Region::EMPTY`].
    pub fn new(min_lat: f64, max_lat: f64, min_lon: f64, max_lon: f64) -> Result<Self, GeoError> {
        for v in [min_lat, max_lat, min_lon, max_lon] {
            if !v.is_finite() {
                return Err(GeoError::NonFinite(v));
            }
        }
        check_range("latitude", min_lat, -90.0, 90.0)?;
        check_range("latitude", max_lat, -90.0, 90.0)?;
        check_range("longitude", min_lon, -180.0, 180.0)?;
        check_range("longitude", max_lon, -180.0, 180.0)?;
        if min_lat > max_lat {
            return Err(GeoError::InvertedRange {
                axis: "latitude",
                min: min_lat,
                max: max_lat,
            });
        }
        if min_lon > max_lon {
            return Err(GeoError::InvertedRange {
                axis: "longitude",
                min: min_lon,
                max: max_lon,
            });
        }
        if min_lat == max_lat || min_lon == max_lon {
            return Ok(Self::EMPTY);
        }
        Ok(Self {
            min_lat,
            max_lat,
            min_lon,
            max_lon,
        })
    }

    /// Normalize each bound into range, then validate as [`Region::new`].
    pub fn from_degrees(
        min_lat: f64,
        max_lat: f64,
        min_lon: f64,
        max_lon: f64,
    ) -> Result<Self, GeoError> {
        Self::new(
            normalized_latitude(min_lat),
            normalized_latitude(max_lat),
            normalized_longitude(min_lon),
            normalized_longitude(max_lon),
        )
    }

    /// Build a region from already-validated bounds, clamping into range.
    ///
    /// Used internally where the bounds are derived from a valid parent.
    pub(crate) fn from_trusted(min_lat: f64, max_lat: f64, min_lon: f64, max_lon: f64) -> Self {
        if min_lat >= max_lat || min_lon >= max_lon {
            return Self::EMPTY;
        }
        Self {
            min_lat: min_lat.max(-90.0),
            max_lat: max_lat.min(90.0),
            min_lon: min_lon.max(-180.0),
            max_lon: max_lon.min(180.0),
        }
    }

    /// The smallest region enclosing every position.
    pub fn bounding(positions: impl IntoIterator<Item = LatLon>) -> Self {
        let mut iter = positions.into_iter();
        let Some(first) = iter.next() else {
            return Self::EMPTY;
        };
        let first = first.normalized();
        let (mut min_lat, mut max_lat) = (first.latitude, first.latitude);
        let (mut min_lon, mut max_lon) = (first.longitude, first.longitude);
        for p in iter {
            let p = p.normalized();
            min_lat = min_lat.min(p.latitude);
            max_lat = max_lat.max(p.latitude);
            min_lon = min_lon.min(p.longitude);
            max_lon = max_lon.max(p.longitude);
        }
        Self::from_trusted(min_lat, max_lat, min_lon, max_lon)
    }

    pub fn min_lat(&self) -> f64 {
        self.min_lat
    }

    pub fn max_lat(&self) -> f64 {
        self.max_lat
    }

    pub fn min_lon(&self) -> f64 {
        self.min_lon
    }

    pub fn max_lon(&self) -> f64 {
        self.max_lon
    }

    /// Latitude span in degrees.
    pub fn delta_lat(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    /// Longitude span in degrees.
    pub fn delta_lon(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    pub fn delta_lat_radians(&self) -> f64 {
        self.delta_lat().to_radians()
    }

    pub fn delta_lon_radians(&self) -> f64 {
        self.delta_lon().to_radians()
    }

    /// True for the zero-area region.
    pub fn is_empty(&self) -> bool {
        self.delta_lat() <= 0.0 || self.delta_lon() <= 0.0
    }

    /// Midpoint of the region.
    pub fn centroid(&self) -> LatLon {
        LatLon::new(
            0.5 * (self.min_lat + self.max_lat),
            0.5 * (self.min_lon + self.max_lon),
        )
    }

    /// Corner positions ordered south-west, south-east, north-east, north-west.
    pub fn corners(&self) -> [LatLon; 4] {
        [
            LatLon::new(self.min_lat, self.min_lon),
            LatLon::new(self.min_lat, self.max_lon),
            LatLon::new(self.max_lat, self.max_lon),
            LatLon::new(self.max_lat, self.min_lon),
        ]
    }

    /// True if the position lies inside or on the boundary.
    pub fn contains(&self, position: LatLon) -> bool {
        !self.is_empty()
            && position.latitude >= self.min_lat
            && position.latitude <= self.max_lat
            && position.longitude >= self.min_lon
            && position.longitude <= self.max_lon
    }

    /// True if `other` lies entirely within this region.
    pub fn contains_region(&self, other: &Region) -> bool {
        !other.is_empty()
            && other.min_lat >= self.min_lat
            && other.max_lat <= self.max_lat
            && other.min_lon >= self.min_lon
            && other.max_lon <= self.max_lon
    }

    /// True if the two regions share positive area. Touching edges do not count.
    pub fn intersects(&self, other: &Region) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.min_lat < other.max_lat
            && self.max_lat > other.min_lat
            && self.min_lon < other.max_lon
            && self.max_lon > other.min_lon
    }

    /// Overlap of the two regions, or [`Region::EMPTY`] when they share no area.
    #[must_use]
    pub fn intersection(&self, other: &Region) -> Region {
        if !self.intersects(other) {
            return Self::EMPTY;
        }
        Self::from_trusted(
            self.min_lat.max(other.min_lat),
            self.max_lat.min(other.max_lat),
            self.min_lon.max(other.min_lon),
            self.max_lon.min(other.max_lon),
        )
    }

    /// Smallest region enclosing both. The empty region is the identity.
    #[must_use]
    pub fn union(&self, other: &Region) -> Region {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Self {
            min_lat: self.min_lat.min(other.min_lat),
            max_lat: self.max_lat.max(other.max_lat),
            min_lon: self.min_lon.min(other.min_lon),
            max_lon: self.max_lon.max(other.max_lon),
        }
    }

    /// Union of every region in the iterator.
    pub fn union_all<'a>(regions: impl IntoIterator<Item = &'a Region>) -> Region {
        regions
            .into_iter()
            .fold(Self::EMPTY, |acc, region| acc.union(region))
    }

    /// Split into four equal quadrants ordered south-west, south-east,
    /// north-west, north-east.
    ///
    /// The quadrants share the midpoint latitude and longitude exactly, so
    /// they partition the parent with no gap or overlap.
    pub fn subdivide(&self) -> [Region; 4] {
        let mid_lat = 0.5 * (self.min_lat + self.max_lat);
        let mid_lon = 0.5 * (self.min_lon + self.max_lon);
        [
            Self::from_trusted(self.min_lat, mid_lat, self.min_lon, mid_lon),
            Self::from_trusted(self.min_lat, mid_lat, mid_lon, self.max_lon),
            Self::from_trusted(mid_lat, self.max_lat, self.min_lon, mid_lon),
            Self::from_trusted(mid_lat, self.max_lat, mid_lon, self.max_lon),
        ]
    }
}

fn check_range(axis: &'static str, value: f64, min: f64, max: f64) -> Result<(), GeoError> {
    if value < min || value > max {
        return Err(GeoError::OutOfRange {
            axis,
            value,
            limit_min: min,
            limit_max: max,
        });
    }
    Ok(())
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({}°, {}°) .. ({}°, {}°)",
            self.min_lat, self.min_lon, self.max_lat, self.max_lon
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(min_lat: f64, max_lat: f64, min_lon: f64, max_lon: f64) -> Region {
        Region::new(min_lat, max_lat, min_lon, max_lon).unwrap()
    }

    /// Inverted bounds are rejected rather than silently reordered.
    #[test]
    fn test_inverted_bounds_rejected() {
        let err = Region::new(10.0, -10.0, 0.0, 1.0).unwrap_err();
        assert!(matches!(err, GeoError::InvertedRange { axis: "latitude", .. }));
        assert!(Region::new(0.0, 1.0, 5.0, 4.0).is_err());
    }

    /// Out-of-range and non-finite bounds are rejected.
    #[test]
    fn test_out_of_range_rejected() {
        assert!(matches!(
            Region::new(-91.0, 0.0, 0.0, 1.0),
            Err(GeoError::OutOfRange { .. })
        ));
        assert!(matches!(
            Region::new(0.0, f64::NAN, 0.0, 1.0),
            Err(GeoError::NonFinite(_))
        ));
    }

    /// Equal bounds on either axis collapse to the empty region.
    #[test]
    fn test_degenerate_is_empty() {
        let r = region(5.0, 5.0, 0.0, 10.0);
        assert_eq!(r, Region::EMPTY);
        assert!(r.is_empty());
    }

    /// `from_degrees` normalizes bounds before validating.
    #[test]
    fn test_from_degrees_normalizes() {
        let r = Region::from_degrees(0.0, 10.0, 190.0, 200.0).unwrap();
        assert!((r.min_lon() + 170.0).abs() < 1e-12);
        assert!((r.max_lon() + 160.0).abs() < 1e-12);
    }

    /// The four quadrants of a region partition it exactly.
    #[test]
    fn test_subdivide_partitions_parent() {
        let parent = region(-36.0, 0.0, 36.0, 72.0);
        let children = parent.subdivide();
        assert_eq!(Region::union_all(children.iter()), parent);
        for child in &children {
            assert!((child.delta_lat() - 18.0).abs() < 1e-12);
            assert!((child.delta_lon() - 18.0).abs() < 1e-12);
            assert!(parent.contains_region(child));
        }
        for i in 0..4 {
            for j in (i + 1)..4 {
                assert!(
                    !children[i].intersects(&children[j]),
                    "quadrants {i} and {j} overlap"
                );
            }
        }
        // Shared edges coincide at the midpoints.
        assert_eq!(children[0].max_lon(), children[1].min_lon());
        assert_eq!(children[0].max_lat(), children[2].min_lat());
    }

    /// The empty region is the identity for union.
    #[test]
    fn test_union_with_empty() {
        let r = region(0.0, 10.0, 0.0, 10.0);
        assert_eq!(r.union(&Region::EMPTY), r);
        assert_eq!(Region::EMPTY.union(&r), r);
    }

    /// Intersection of disjoint or edge-touching regions is empty.
    #[test]
    fn test_intersection() {
        let a = region(0.0, 10.0, 0.0, 10.0);
        let b = region(5.0, 15.0, 5.0, 15.0);
        assert_eq!(a.intersection(&b), region(5.0, 10.0, 5.0, 10.0));
        let touching = region(10.0, 20.0, 0.0, 10.0);
        assert!(a.intersection(&touching).is_empty());
        assert!(Region::EMPTY.intersection(&a).is_empty());
    }

    /// Centroid and corners follow the stored bounds.
    #[test]
    fn test_centroid_and_corners() {
        let r = region(-10.0, 30.0, 100.0, 120.0);
        assert_eq!(r.centroid(), LatLon::new(10.0, 110.0));
        let [sw, se, ne, nw] = r.corners();
        assert_eq!(sw, LatLon::new(-10.0, 100.0));
        assert_eq!(se, LatLon::new(-10.0, 120.0));
        assert_eq!(ne, LatLon::new(30.0, 120.0));
        assert_eq!(nw, LatLon::new(30.0, 100.0));
    }

    /// Bounding region over a set of positions.
    #[test]
    fn test_bounding() {
        let r = Region::bounding([
            LatLon::new(1.0, 2.0),
            LatLon::new(-3.0, 5.0),
            LatLon::new(4.0, -1.0),
        ]);
        assert_eq!(r, region(-3.0, 4.0, -1.0, 5.0));
        assert!(Region::bounding(std::iter::empty()).is_empty());
    }
}
