//! Tile pyramid addressing: levels, level sets, tiles, and tracking of
//! resources known to be unreachable.

mod absent;
mod error;
mod level;
mod level_set;
mod tile;
mod url;

pub use absent::{AbsentResourceList, DEFAULT_MAX_ABSENT_ATTEMPTS, DEFAULT_MIN_CHECK_INTERVAL};
pub use error::TileError;
pub use level::Level;
pub use level_set::{LevelSet, LevelSetParams};
pub use tile::{Tile, TileKey};
pub use url::{PathUrlBuilder, TileUrlBuilder};
