//! Terrain error types.

use geode_render::RenderError;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TerrainError {
    #[error("invalid tessellator settings: {0}")]
    InvalidSettings(String),

    #[error(transparent)]
    Render(#[from] RenderError),
}
