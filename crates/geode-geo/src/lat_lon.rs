//! A geographic position on the globe surface.

use serde::{Deserialize, Serialize};

use crate::angle::{normalized_latitude, normalized_longitude};

/// A latitude/longitude pair in degrees.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    /// Latitude in degrees, positive north.
    pub latitude: f64,
    /// Longitude in degrees, positive east.
    pub longitude: f64,
}

impl LatLon {
    /// Create a new position from degrees. No normalization is applied.
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Latitude in radians.
    pub fn latitude_radians(&self) -> f64 {
        self.latitude.to_radians()
    }

    /// Longitude in radians.
    pub fn longitude_radians(&self) -> f64 {
        self.longitude.to_radians()
    }

    /// Return this position folded into `[-90, 90]` x `[-180, 180]`.
    ///
    /// A latitude past a pole lands on the opposite meridian.
    #[must_use]
    pub fn normalized(&self) -> Self {
        let wrapped = self.latitude % 360.0;
        let crosses_pole = wrapped.abs() > 90.0 && wrapped.abs() < 270.0;
        let longitude = if crosses_pole {
            self.longitude + 180.0
        } else {
            self.longitude
        };
        Self {
            latitude: normalized_latitude(self.latitude),
            longitude: normalized_longitude(longitude),
        }
    }
}
