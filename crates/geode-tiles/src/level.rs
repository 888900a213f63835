//! A single resolution step of a tile pyramid.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use geode_geo::LatLon;

use crate::{AbsentResourceList, Tile, TileError, TileUrlBuilder};

/// One level of a [`LevelSet`](crate::LevelSet).
///
/// Levels are shared behind `Arc` by every tile addressed at them, so the
/// absence record is shared as well.
pub struct Level {
    level_number: u32,
    level_name: String,
    tile_delta: LatLon,
    tile_width: u32,
    tile_height: u32,
    service: String,
    dataset_name: String,
    format_suffix: String,
    path: String,
    average_texel_size: f64,
    absent: AbsentResourceList,
    url_builder: Arc<dyn TileUrlBuilder>,
}

pub(crate) struct LevelDescriptor<'a> {
    pub level_number: u32,
    pub empty: bool,
    pub tile_delta: LatLon,
    pub tile_width: u32,
    pub tile_height: u32,
    pub service: &'a str,
    pub dataset_name: &'a str,
    pub format_suffix: &'a str,
    pub max_absent_attempts: u32,
    pub min_absent_check_interval: Duration,
    pub url_builder: Arc<dyn TileUrlBuilder>,
}

impl Level {
    pub(crate) fn new(desc: LevelDescriptor<'_>) -> Self {
        let level_name = if desc.empty {
            String::new()
        } else {
            desc.level_number.to_string()
        };
        let path = format!("{}/{}", desc.dataset_name, level_name);

        let average_tile_size = 0.5 * f64::from(desc.tile_width + desc.tile_height);
        let average_tile_delta =
            0.5 * (desc.tile_delta.latitude_radians() + desc.tile_delta.longitude_radians());

        Self {
            level_number: desc.level_number,
            level_name,
            tile_delta: desc.tile_delta,
            tile_width: desc.tile_width,
            tile_height: desc.tile_height,
            service: desc.service.to_owned(),
            dataset_name: desc.dataset_name.to_owned(),
            format_suffix: desc.format_suffix.to_owned(),
            path,
            average_texel_size: average_tile_delta / average_tile_size,
            absent: AbsentResourceList::new(
                desc.max_absent_attempts,
                desc.min_absent_check_interval,
            ),
            url_builder: desc.url_builder,
        }
    }

    pub fn level_number(&self) -> u32 {
        self.level_number
    }

    /// Empty string for empty levels.
    pub fn level_name(&self) -> &str {
        &self.level_name
    }

    /// Empty levels never hold data and are never fetched.
    pub fn is_empty(&self) -> bool {
        self.level_name.is_empty()
    }

    /// Angular size of a tile at this level, in degrees.
    pub fn tile_delta(&self) -> LatLon {
        self.tile_delta
    }

    pub fn tile_width(&self) -> u32 {
        self.tile_width
    }

    pub fn tile_height(&self) -> u32 {
        self.tile_height
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn dataset_name(&self) -> &str {
        &self.dataset_name
    }

    pub fn format_suffix(&self) -> &str {
        &self.format_suffix
    }

    /// `{dataset_name}/{level_name}`.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Mean angular size of one texel, in radians.
    pub fn average_texel_size(&self) -> f64 {
        self.average_texel_size
    }

    /// Texel size in model units on a body of the given radius.
    pub fn texel_size(&self, radius: f64) -> f64 {
        radius * self.average_texel_size
    }

    pub fn absent_resources(&self) -> &AbsentResourceList {
        &self.absent
    }

    /// The locator for a tile at this level.
    pub fn tile_resource_url(&self, tile: &Tile) -> Result<String, TileError> {
        if self.is_empty() {
            return Err(TileError::EmptyLevel(self.level_number));
        }
        self.url_builder.url(tile)
    }
}

impl fmt::Debug for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Level")
            .field("level_number", &self.level_number)
            .field("level_name", &self.level_name)
            .field("tile_delta", &self.tile_delta)
            .field("tile_width", &self.tile_width)
            .field("tile_height", &self.tile_height)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}
