//! Configuration sections and RON persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const CONFIG_FILE: &str = "config.ron";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub globe: GlobeConfig,
    pub terrain: TerrainConfig,
    pub imagery: ImageryConfig,
    pub view: ViewConfig,
    pub debug: DebugConfig,
}

/// The reference body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GlobeConfig {
    pub equatorial_radius_m: f64,
    pub polar_radius_m: f64,
    /// Multiplier applied to every terrain height.
    pub vertical_exaggeration: f64,
}

/// Terrain tessellation tuning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TerrainConfig {
    /// Grid cells along each tile edge.
    pub density: u32,
    pub max_level: u32,
    /// Refine while a cell spans more than `10^target` meters-per-meter of distance.
    pub log10_resolution_target: f64,
    pub num_lat_subdivisions: u32,
    pub num_lon_subdivisions: u32,
    pub make_skirts: bool,
}

/// The imagery dataset and its loading policy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ImageryConfig {
    /// Directory holding `{dataset_name}/{level}/{row}/{row}_{column}{suffix}` files.
    pub dataset_root: PathBuf,
    pub dataset_name: String,
    pub format_suffix: String,
    pub num_levels: u32,
    pub num_empty_levels: u32,
    pub level_zero_tile_delta_deg: f64,
    pub tile_size: u32,
    pub force_level_zero_loads: bool,
    pub retain_level_zero_tiles: bool,
    pub cancel_out_of_view: bool,
    /// Loader threads; 0 picks one per core, up to four.
    pub worker_threads: usize,
    pub max_absent_tile_attempts: u32,
    pub min_absent_tile_check_interval_ms: u64,
}

/// The scripted camera the demo flies.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ViewConfig {
    pub width: u32,
    pub height: u32,
    /// Horizontal field of view in degrees.
    pub field_of_view_deg: f64,
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub start_altitude_m: f64,
    pub end_altitude_m: f64,
    pub frames: u32,
}

/// Debug/development settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log filter override (e.g. "debug", "info,geode_imagery=trace").
    pub log_level: String,
    /// Also write JSON logs under the config directory.
    pub log_to_file: bool,
}

impl Default for GlobeConfig {
    fn default() -> Self {
        Self {
            equatorial_radius_m: 6_378_137.0,
            polar_radius_m: 6_356_752.314_245,
            vertical_exaggeration: 1.0,
        }
    }
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            density: 20,
            max_level: 12,
            log10_resolution_target: 1.3,
            num_lat_subdivisions: 5,
            num_lon_subdivisions: 10,
            make_skirts: true,
        }
    }
}

impl Default for ImageryConfig {
    fn default() -> Self {
        Self {
            dataset_root: PathBuf::from("tiles"),
            dataset_name: "earth".to_string(),
            format_suffix: ".png".to_string(),
            num_levels: 5,
            num_empty_levels: 0,
            level_zero_tile_delta_deg: 36.0,
            tile_size: 512,
            force_level_zero_loads: false,
            retain_level_zero_tiles: false,
            cancel_out_of_view: false,
            worker_threads: 0,
            max_absent_tile_attempts: 2,
            min_absent_tile_check_interval_ms: 10_000,
        }
    }
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            field_of_view_deg: 45.0,
            latitude_deg: 46.5,
            longitude_deg: 7.5,
            start_altitude_m: 2.0e7,
            end_altitude_m: 5.0e3,
            frames: 60,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_to_file: false,
        }
    }
}

impl Config {
    /// The platform's per-user directory for geode settings.
    pub fn default_dir() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| dir.join("geode"))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE);

        if config_path.exists() {
            let config = Self::read(&config_path)?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::WriteError)?;

        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);
        let serialized = ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;

        std::fs::write(config_dir.join(CONFIG_FILE), serialized).map_err(ConfigError::WriteError)?;
        Ok(())
    }

    /// Re-read the file; `Some` only when its contents differ from `self`.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let new_config = Self::read(&config_dir.join(CONFIG_FILE))?;
        if &new_config != self {
            log::info!("Config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }

    fn read(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        ron::from_str(&contents).map_err(ConfigError::ParseError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Default config serializes and shows its section values.
    #[test]
    fn test_default_config_serializes() {
        let ron_str = ron::ser::to_string_pretty(&Config::default(), ron::ser::PrettyConfig::new().depth_limit(3))
            .unwrap();
        assert!(ron_str.contains("density: 20"));
        assert!(ron_str.contains("dataset_name: \"earth\""));
    }

    /// Missing sections take their defaults.
    #[test]
    fn test_missing_section_uses_default() {
        let config: Config = ron::from_str("(terrain: (density: 32))").unwrap();
        assert_eq!(config.terrain.density, 32);
        assert_eq!(config.terrain.max_level, 12);
        assert_eq!(config.imagery, ImageryConfig::default());
    }

    /// Unknown fields are ignored.
    #[test]
    fn test_extra_field_ignored() {
        let result: Result<Config, _> = ron::from_str("(future_setting: true, view: (frames: 3))");
        assert_eq!(result.unwrap().view.frames, 3);
    }

    /// A first load writes the default file; later loads read it back.
    #[test]
    fn test_load_or_create() {
        let dir = tempfile::tempdir().unwrap();
        let created = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(created, Config::default());
        assert!(dir.path().join(CONFIG_FILE).exists());

        let mut config = created.clone();
        config.imagery.dataset_root = PathBuf::from("/data/tiles");
        config.globe.vertical_exaggeration = 3.0;
        config.save(dir.path()).unwrap();
        assert_eq!(Config::load_or_create(dir.path()).unwrap(), config);
    }

    /// Reload reports changes and stays quiet otherwise.
    #[test]
    fn test_reload() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        config.save(dir.path()).unwrap();
        assert!(config.reload(dir.path()).unwrap().is_none());

        let mut modified = config.clone();
        modified.terrain.max_level = 4;
        modified.save(dir.path()).unwrap();
        assert_eq!(config.reload(dir.path()).unwrap().unwrap().terrain.max_level, 4);
    }

    /// Malformed files surface a parse error.
    #[test]
    fn test_invalid_ron_produces_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "{{not valid}}").unwrap();
        assert!(matches!(Config::load_or_create(dir.path()), Err(ConfigError::ParseError(_))));
    }
}
