//! Angle normalization helpers. All angles are in degrees.

/// Fold a latitude into `[-90, 90]`, reflecting across the poles.
pub fn normalized_latitude(degrees: f64) -> f64 {
    let lat = degrees % 180.0;
    if lat > 90.0 {
        180.0 - lat
    } else if lat < -90.0 {
        -180.0 - lat
    } else {
        lat
    }
}

/// Wrap a longitude into `[-180, 180]`.
pub fn normalized_longitude(degrees: f64) -> f64 {
    let lon = degrees % 360.0;
    if lon > 180.0 {
        lon - 360.0
    } else if lon < -180.0 {
        360.0 + lon
    } else {
        lon
    }
}
