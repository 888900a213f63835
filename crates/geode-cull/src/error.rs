//! Errors raised when constructing bounding volumes and frustums.

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CullError {
    /// A radius was negative or non-finite.
    #[error("invalid radius: {0}")]
    InvalidRadius(f64),

    /// A cylinder's end points coincide, so it has no axis.
    #[error("cylinder end points coincide")]
    DegenerateAxis,

    /// Perspective parameters cannot describe a frustum.
    #[error("invalid perspective: {0}")]
    InvalidPerspective(&'static str),
}
