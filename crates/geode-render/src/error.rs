//! Render seam error types.

use geode_cull::CullError;

use crate::{BufferHandle, TextureHandle};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RenderError {
    /// Texture data length does not match its dimensions.
    #[error("texture data is {actual} bytes, expected {expected} for {width}x{height} RGBA")]
    TextureSize {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    #[error("unknown buffer {0:?}")]
    UnknownBuffer(BufferHandle),

    #[error("unknown texture {0:?}")]
    UnknownTexture(TextureHandle),

    /// A draw was issued without an index buffer bound.
    #[error("no index buffer bound")]
    NoIndexBuffer,

    /// A draw asked for more indices than the bound buffer holds.
    #[error("draw of {requested} indices exceeds bound buffer of {available}")]
    IndexRange { requested: u32, available: u32 },

    /// The camera parameters do not form a valid view volume.
    #[error("invalid view: {0}")]
    InvalidView(#[from] CullError),

    /// Eye and target coincide, or up is parallel to the view direction.
    #[error("degenerate look-at orientation")]
    DegenerateOrientation,
}
