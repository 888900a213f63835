//! The full pyramid of levels covering a region.

use std::sync::Arc;
use std::time::{Duration, Instant};

use geode_geo::{LatLon, Region};
use serde::{Deserialize, Serialize};

use crate::absent::{DEFAULT_MAX_ABSENT_ATTEMPTS, DEFAULT_MIN_CHECK_INTERVAL};
use crate::level::LevelDescriptor;
use crate::tile::DEFAULT_ORIGIN;
use crate::{Level, PathUrlBuilder, Tile, TileError, TileUrlBuilder};

/// Construction parameters for a [`LevelSet`].
///
/// The URL builder is not part of the serialized form; pass one to
/// [`LevelSet::with_url_builder`] or accept the [`PathUrlBuilder`] default.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelSetParams {
    /// Coverage of the dataset.
    pub sector: Region,
    /// Tile size at level 0 in degrees.
    pub level_zero_tile_delta: LatLon,
    /// South-west corner of the tile grid.
    pub tile_origin: LatLon,
    pub num_levels: u32,
    /// Levels `0..num_empty_levels` hold no data.
    pub num_empty_levels: u32,
    pub tile_width: u32,
    pub tile_height: u32,
    /// Root locator of the tile service.
    pub service: String,
    pub dataset_name: String,
    pub format_suffix: String,
    pub max_absent_tile_attempts: u32,
    pub min_absent_tile_check_interval_ms: u64,
}

impl Default for LevelSetParams {
    fn default() -> Self {
        Self {
            sector: Region::FULL_SPHERE,
            level_zero_tile_delta: LatLon::new(36.0, 36.0),
            tile_origin: DEFAULT_ORIGIN,
            num_levels: 10,
            num_empty_levels: 0,
            tile_width: 512,
            tile_height: 512,
            service: String::new(),
            dataset_name: String::new(),
            format_suffix: ".png".to_owned(),
            max_absent_tile_attempts: DEFAULT_MAX_ABSENT_ATTEMPTS,
            min_absent_tile_check_interval_ms: DEFAULT_MIN_CHECK_INTERVAL.as_millis() as u64,
        }
    }
}

impl LevelSetParams {
    fn validate(&self) -> Result<(), TileError> {
        let delta = self.level_zero_tile_delta;
        if !(delta.latitude > 0.0 && delta.latitude <= 180.0) {
            return Err(TileError::InvalidParameter(format!(
                "level zero latitude delta {} not in (0, 180]",
                delta.latitude
            )));
        }
        if !(delta.longitude > 0.0 && delta.longitude <= 360.0) {
            return Err(TileError::InvalidParameter(format!(
                "level zero longitude delta {} not in (0, 360]",
                delta.longitude
            )));
        }
        if self.num_levels == 0 {
            return Err(TileError::InvalidParameter("num_levels must be positive".into()));
        }
        if self.num_empty_levels > self.num_levels {
            return Err(TileError::InvalidParameter(format!(
                "num_empty_levels {} exceeds num_levels {}",
                self.num_empty_levels, self.num_levels
            )));
        }
        if self.tile_width == 0 || self.tile_height == 0 {
            return Err(TileError::InvalidParameter("tile size must be positive".into()));
        }
        // Re-validate in case the sector came from deserialization.
        let s = self.sector;
        let sector = Region::new(s.min_lat(), s.max_lat(), s.min_lon(), s.max_lon())?;
        if sector.is_empty() {
            return Err(TileError::InvalidParameter("sector is empty".into()));
        }
        Ok(())
    }
}

/// An ordered pyramid of levels, each halving the tile size of the previous.
///
/// Cloning is shallow: clones share their levels and absence records.
#[derive(Clone, Debug)]
pub struct LevelSet {
    sector: Region,
    level_zero_tile_delta: LatLon,
    tile_origin: LatLon,
    levels: Vec<Arc<Level>>,
}

impl LevelSet {
    pub fn new(params: &LevelSetParams) -> Result<Self, TileError> {
        Self::with_url_builder(params, Arc::new(PathUrlBuilder))
    }

    pub fn with_url_builder(
        params: &LevelSetParams,
        url_builder: Arc<dyn TileUrlBuilder>,
    ) -> Result<Self, TileError> {
        if let Err(error) = params.validate() {
            tracing::error!(dataset = %params.dataset_name, %error, "rejected level set parameters");
            return Err(error);
        }

        let interval = Duration::from_millis(params.min_absent_tile_check_interval_ms);
        let levels = (0..params.num_levels)
            .map(|n| {
                let scale = f64::from(1u32 << n.min(31));
                Arc::new(Level::new(LevelDescriptor {
                    level_number: n,
                    empty: n < params.num_empty_levels,
                    tile_delta: LatLon::new(
                        params.level_zero_tile_delta.latitude / scale,
                        params.level_zero_tile_delta.longitude / scale,
                    ),
                    tile_width: params.tile_width,
                    tile_height: params.tile_height,
                    service: &params.service,
                    dataset_name: &params.dataset_name,
                    format_suffix: &params.format_suffix,
                    max_absent_attempts: params.max_absent_tile_attempts,
                    min_absent_check_interval: interval,
                    url_builder: Arc::clone(&url_builder),
                }))
            })
            .collect::<Vec<_>>();

        tracing::debug!(
            dataset = %params.dataset_name,
            num_levels = params.num_levels,
            num_empty_levels = params.num_empty_levels,
            "created level set"
        );

        Ok(Self {
            sector: params.sector,
            level_zero_tile_delta: params.level_zero_tile_delta,
            tile_origin: params.tile_origin,
            levels,
        })
    }

    pub fn sector(&self) -> &Region {
        &self.sector
    }

    pub fn level_zero_tile_delta(&self) -> LatLon {
        self.level_zero_tile_delta
    }

    pub fn tile_origin(&self) -> LatLon {
        self.tile_origin
    }

    pub fn levels(&self) -> &[Arc<Level>] {
        &self.levels
    }

    pub fn level(&self, level_number: u32) -> Result<&Arc<Level>, TileError> {
        self.levels
            .get(level_number as usize)
            .ok_or(TileError::LevelOutOfRange {
                level: level_number,
                num_levels: self.num_levels(),
            })
    }

    pub fn first_level(&self) -> &Arc<Level> {
        &self.levels[0]
    }

    pub fn last_level(&self) -> &Arc<Level> {
        &self.levels[self.levels.len() - 1]
    }

    pub fn num_levels(&self) -> u32 {
        self.levels.len() as u32
    }

    pub fn is_final_level(&self, level_number: u32) -> bool {
        level_number + 1 >= self.num_levels()
    }

    /// Out-of-range levels count as empty.
    pub fn is_level_empty(&self, level_number: u32) -> bool {
        self.levels
            .get(level_number as usize)
            .is_none_or(|level| level.is_empty())
    }

    /// The coarsest level whose texels are at most `texel_size` radians.
    ///
    /// Returns the last level when every level is coarser, and `None` when the
    /// first qualifying level is empty.
    pub fn target_level(&self, texel_size: f64) -> Option<&Arc<Level>> {
        let last = self.last_level();
        if last.average_texel_size() >= texel_size {
            return Some(last);
        }
        match self
            .levels
            .iter()
            .find(|level| level.average_texel_size() <= texel_size)
        {
            Some(level) if level.is_empty() => None,
            Some(level) => Some(level),
            None => Some(last),
        }
    }

    /// Columns spanning 360 degrees at `level`.
    pub fn num_columns_in_level(&self, level: &Level) -> u64 {
        let level_zero = (360.0 / self.level_zero_tile_delta.longitude).ceil() as u64;
        level_zero << level.level_number().min(63)
    }

    /// Row-major resource number of a tile within its level.
    pub fn tile_number(&self, tile: &Tile) -> u64 {
        u64::from(tile.row()) * self.num_columns_in_level(tile.level()) + u64::from(tile.column())
    }

    /// The level-0 grid clipped to the sector.
    pub fn level_zero_tiles(&self) -> Result<Vec<Tile>, TileError> {
        let level = self.first_level();
        let delta = level.tile_delta();
        let origin = self.tile_origin;

        let first_row = Tile::compute_row_from(delta.latitude, self.sector.min_lat(), origin.latitude);
        let last_row = Tile::compute_row_from(delta.latitude, self.sector.max_lat(), origin.latitude);
        let first_col =
            Tile::compute_column_from(delta.longitude, self.sector.min_lon(), origin.longitude);
        let last_col =
            Tile::compute_column_from(delta.longitude, self.sector.max_lon(), origin.longitude);

        let mut tiles = Vec::new();
        for row in first_row..=last_row {
            for column in first_col..=last_col {
                let region = Tile::compute_region_from(row, column, level, origin)?;
                if region.intersects(&self.sector) {
                    tiles.push(Tile::with_address(region, Arc::clone(level), row, column));
                }
            }
        }
        Ok(tiles)
    }

    pub fn is_resource_absent_at(&self, tile: &Tile, now: Instant) -> bool {
        let level = tile.level();
        level.is_empty()
            || level
                .absent_resources()
                .is_absent_at(self.tile_number(tile), now)
    }

    /// True for tiles on empty levels and for tiles in their failure cool-down.
    pub fn is_resource_absent(&self, tile: &Tile) -> bool {
        self.is_resource_absent_at(tile, Instant::now())
    }

    pub fn mark_resource_absent_at(&self, tile: &Tile, now: Instant) -> u32 {
        tile.level()
            .absent_resources()
            .mark_at(self.tile_number(tile), now)
    }

    pub fn mark_resource_absent(&self, tile: &Tile) -> u32 {
        self.mark_resource_absent_at(tile, Instant::now())
    }

    pub fn unmark_resource_absent(&self, tile: &Tile) {
        tile.level().absent_resources().unmark(self.tile_number(tile));
    }
}
