//! Runtime configuration for geode.
//!
//! Settings persist to disk as `config.ron` and can be overridden from the
//! command line. Every section tolerates missing and unknown fields so
//! older files keep loading.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{Config, DebugConfig, GlobeConfig, ImageryConfig, TerrainConfig, ViewConfig};
pub use error::ConfigError;
