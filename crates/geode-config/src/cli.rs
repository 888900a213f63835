//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// geode command-line arguments. Values override `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "geode", about = "Adaptive globe terrain and imagery")]
pub struct CliArgs {
    /// Terrain grid cells per tile edge.
    #[arg(long)]
    pub density: Option<u32>,

    /// Deepest terrain level.
    #[arg(long)]
    pub max_level: Option<u32>,

    /// Directory holding the imagery tiles.
    #[arg(long)]
    pub dataset_root: Option<PathBuf>,

    /// Number of frames to run.
    #[arg(long)]
    pub frames: Option<u32>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(density) = args.density {
            self.terrain.density = density;
        }
        if let Some(max_level) = args.max_level {
            self.terrain.max_level = max_level;
        }
        if let Some(ref root) = args.dataset_root {
            self.imagery.dataset_root = root.clone();
        }
        if let Some(frames) = args.frames {
            self.view.frames = frames;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Given flags replace config values; the rest keep their defaults.
    #[test]
    fn test_cli_override() {
        let mut config = Config::default();
        let args = CliArgs::parse_from(["geode", "--density", "32", "--dataset-root", "/srv/tiles", "--frames", "5"]);
        config.apply_cli_overrides(&args);
        assert_eq!(config.terrain.density, 32);
        assert_eq!(config.imagery.dataset_root, PathBuf::from("/srv/tiles"));
        assert_eq!(config.view.frames, 5);
        assert_eq!(config.terrain.max_level, 12);
        assert_eq!(config.debug.log_level, "info");
    }

    /// No flags leaves the config untouched.
    #[test]
    fn test_cli_no_override() {
        let mut config = Config::default();
        config.apply_cli_overrides(&CliArgs::default());
        assert_eq!(config, Config::default());
    }
}
