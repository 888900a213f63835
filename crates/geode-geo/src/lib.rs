//! Geographic primitives: latitude/longitude regions, the reference ellipsoid,
//! and the globe (ellipsoid plus a pluggable elevation model).

mod angle;
mod ellipsoid;
mod error;
mod globe;
mod lat_lon;
mod region;

pub use angle::{normalized_latitude, normalized_longitude};
pub use ellipsoid::Ellipsoid;
pub use error::GeoError;
pub use globe::{ElevationModel, Globe, ZeroElevation};
pub use lat_lon::LatLon;
pub use region::Region;
