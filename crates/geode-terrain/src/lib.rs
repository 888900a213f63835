//! Adaptive terrain tessellation: a quadtree of rectangular mesh patches
//! refined by distance to the eye.

mod error;
mod mesh;
mod rect_tile;
mod settings;
mod split;
mod tessellator;

pub use error::TerrainError;
pub use mesh::{IndexBuffer, RenderInfo};
pub use rect_tile::RectTile;
pub use settings::TessellatorSettings;
pub use split::{needs_to_split, split_samples};
pub use tessellator::{EllipsoidRectangularTessellator, TessellatedTerrain};
