//! Geographic error types.

/// Errors raised when constructing geographic values.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeoError {
    /// A coordinate was NaN or infinite.
    #[error("non-finite coordinate: {0}")]
    NonFinite(f64),

    /// A minimum bound exceeded its maximum.
    #[error("inverted {axis} range: {min} > {max}")]
    InvertedRange {
        /// Which axis was inverted ("latitude" or "longitude").
        axis: &'static str,
        /// The offending minimum.
        min: f64,
        /// The offending maximum.
        max: f64,
    },

    /// A coordinate lay outside its valid range.
    #[error("{axis} {value} outside [{limit_min}, {limit_max}]")]
    OutOfRange {
        /// Which axis was out of range.
        axis: &'static str,
        /// The offending value.
        value: f64,
        /// Lower limit of the axis.
        limit_min: f64,
        /// Upper limit of the axis.
        limit_max: f64,
    },

    /// Ellipsoid radii must be positive with the polar radius not exceeding the equatorial.
    #[error("invalid ellipsoid radii: equatorial {equatorial}, polar {polar}")]
    InvalidRadii {
        /// Equatorial radius in meters.
        equatorial: f64,
        /// Polar radius in meters.
        polar: f64,
    },
}
