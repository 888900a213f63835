//! Tile addressing error types.

use geode_geo::GeoError;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TileError {
    /// A level set parameter was out of range.
    #[error("invalid level set parameter: {0}")]
    InvalidParameter(String),

    /// A derived tile region was not a valid region.
    #[error(transparent)]
    Geo(#[from] GeoError),

    /// Empty levels have no fetchable resources.
    #[error("level {0} is empty and has no resources")]
    EmptyLevel(u32),

    /// A level number beyond the set was requested.
    #[error("level {level} out of range (level set has {num_levels} levels)")]
    LevelOutOfRange {
        /// Requested level.
        level: u32,
        /// Number of levels in the set.
        num_levels: u32,
    },

    /// The URL builder could not produce a locator.
    #[error("could not build tile url: {0}")]
    UrlBuilder(String),
}
