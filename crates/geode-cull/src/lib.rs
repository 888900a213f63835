//! Bounding volumes and view-frustum predicates used to cull and refine tiles.

mod cylinder;
mod error;
mod extent;
mod frustum;
mod plane;
mod sphere;

pub use cylinder::Cylinder;
pub use error::CullError;
pub use extent::Extent;
pub use frustum::{Frustum, ViewFrustum};
pub use plane::{Line, Plane};
pub use sphere::Sphere;
