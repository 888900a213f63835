//! Addressed cells of the tile pyramid.

use std::fmt;
use std::sync::Arc;

use geode_geo::{LatLon, Region};
use serde::{Deserialize, Serialize};

use crate::{Level, TileError};

/// Default grid origin: the south-west corner of the globe.
pub(crate) const DEFAULT_ORIGIN: LatLon = LatLon::new(-90.0, -180.0);

/// `(level, row, column)` identity of a tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileKey {
    pub level: u32,
    pub row: u32,
    pub column: u32,
}

impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.level, self.row, self.column)
    }
}

/// A region at a level, with its row and column in that level's grid.
///
/// Rows count northward from the grid origin; columns count eastward.
#[derive(Clone)]
pub struct Tile {
    region: Region,
    level: Arc<Level>,
    row: u32,
    column: u32,
}

impl Tile {
    /// Build a tile, deriving row and column from the region's south-west corner.
    pub fn new(region: Region, level: Arc<Level>) -> Self {
        let delta = level.tile_delta();
        let row = Self::compute_row(delta.latitude, region.min_lat());
        let column = Self::compute_column(delta.longitude, region.min_lon());
        Self {
            region,
            level,
            row,
            column,
        }
    }

    pub fn with_address(region: Region, level: Arc<Level>, row: u32, column: u32) -> Self {
        Self {
            region,
            level,
            row,
            column,
        }
    }

    /// Row containing `latitude` for a grid of `delta` degree rows starting at -90.
    ///
    /// A latitude exactly on the northern limit maps to the last row.
    pub fn compute_row(delta: f64, latitude: f64) -> u32 {
        Self::compute_row_from(delta, latitude, DEFAULT_ORIGIN.latitude)
    }

    pub fn compute_row_from(delta: f64, latitude: f64, origin: f64) -> u32 {
        grid_index(delta, latitude - origin, 90.0 - origin)
    }

    /// Column containing `longitude` for a grid of `delta` degree columns starting at -180.
    ///
    /// A longitude exactly on the eastern limit maps to the last column.
    pub fn compute_column(delta: f64, longitude: f64) -> u32 {
        Self::compute_column_from(delta, longitude, DEFAULT_ORIGIN.longitude)
    }

    pub fn compute_column_from(delta: f64, longitude: f64, origin: f64) -> u32 {
        grid_index(delta, longitude - origin, 180.0 - origin)
    }

    /// The region covered by `(row, column)` at `level`, for the default origin.
    pub fn compute_region(row: u32, column: u32, level: &Level) -> Result<Region, TileError> {
        Self::compute_region_from(row, column, level, DEFAULT_ORIGIN)
    }

    pub fn compute_region_from(
        row: u32,
        column: u32,
        level: &Level,
        origin: LatLon,
    ) -> Result<Region, TileError> {
        let delta = level.tile_delta();
        let min_lat = origin.latitude + f64::from(row) * delta.latitude;
        let min_lon = origin.longitude + f64::from(column) * delta.longitude;
        let max_lat = (min_lat + delta.latitude).min(90.0);
        let max_lon = (min_lon + delta.longitude).min(180.0);
        Ok(Region::new(min_lat, max_lat, min_lon, max_lon)?)
    }

    pub fn region(&self) -> &Region {
        &self.region
    }

    pub fn level(&self) -> &Arc<Level> {
        &self.level
    }

    pub fn level_number(&self) -> u32 {
        self.level.level_number()
    }

    pub fn row(&self) -> u32 {
        self.row
    }

    pub fn column(&self) -> u32 {
        self.column
    }

    pub fn key(&self) -> TileKey {
        TileKey {
            level: self.level.level_number(),
            row: self.row,
            column: self.column,
        }
    }

    /// `{level path}/{row}/{row}_{column}{suffix}`; tiles on empty levels carry no suffix.
    pub fn path(&self) -> String {
        let suffix = if self.level.is_empty() {
            ""
        } else {
            self.level.format_suffix()
        };
        format!(
            "{}/{}/{}_{}{}",
            self.level.path(),
            self.row,
            self.row,
            self.column,
            suffix
        )
    }

    pub fn resource_url(&self) -> Result<String, TileError> {
        self.level.tile_resource_url(self)
    }

    /// Split into four children at `next_level`, ordered south-west,
    /// south-east, north-west, north-east.
    pub fn subdivide(&self, next_level: &Arc<Level>) -> Result<[Tile; 4], TileError> {
        if next_level.level_number() != self.level.level_number() + 1 {
            return Err(TileError::InvalidParameter(format!(
                "cannot subdivide level {} tile into level {}",
                self.level.level_number(),
                next_level.level_number()
            )));
        }
        let [sw, se, nw, ne] = self.region.subdivide();
        let row = 2 * self.row;
        let col = 2 * self.column;
        Ok([
            Tile::with_address(sw, Arc::clone(next_level), row, col),
            Tile::with_address(se, Arc::clone(next_level), row, col + 1),
            Tile::with_address(nw, Arc::clone(next_level), row + 1, col),
            Tile::with_address(ne, Arc::clone(next_level), row + 1, col + 1),
        ])
    }

    /// Texel count of the tile's image.
    pub fn size_in_texels(&self) -> u64 {
        u64::from(self.level.tile_width()) * u64::from(self.level.tile_height())
    }
}

impl fmt::Debug for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tile")
            .field("key", &self.key())
            .field("region", &self.region)
            .finish()
    }
}

fn grid_index(delta: f64, offset: f64, span: f64) -> u32 {
    if offset >= span {
        return ((span / delta).ceil() as u32).saturating_sub(1);
    }
    (offset / delta).floor().max(0.0) as u32
}
