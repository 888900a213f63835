//! Structured logging for geode.
//!
//! Console output with uptime timestamps and targets, filtered by
//! `RUST_LOG` or the configured level, plus an optional JSON file layer
//! for post-mortem analysis of loader and selection traces.

use std::path::{Path, PathBuf};

use geode_config::Config;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "info";
const LOG_FILE: &str = "geode.log";

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` wins over the config's `debug.log_level`. The JSON file layer
/// is added when `debug_build` or the config's `debug.log_to_file` asks for
/// it and `log_dir` can be created. Returns the log file path if one was
/// opened.
///
/// ```no_run
/// use geode_config::Config;
/// use geode_log::init_logging;
///
/// let config = Config::default();
/// init_logging(Some(std::path::Path::new("./logs")), cfg!(debug_assertions), Some(&config));
/// ```
pub fn init_logging(log_dir: Option<&Path>, debug_build: bool, config: Option<&Config>) -> Option<PathBuf> {
    let filter_str = filter_string(config);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    let console_layer = fmt::layer()
        .with_target(true)
        .with_thread_names(true)
        .with_level(true)
        .with_timer(fmt::time::uptime());

    let subscriber = tracing_subscriber::registry().with(env_filter).with(console_layer);

    let to_file = debug_build || config.is_some_and(|c| c.debug.log_to_file);
    if to_file {
        if let Some(log_dir) = log_dir {
            let path = log_dir.join(LOG_FILE);
            if std::fs::create_dir_all(log_dir).is_ok() {
                if let Ok(log_file) = std::fs::File::create(&path) {
                    let file_layer = fmt::layer()
                        .with_writer(log_file)
                        .with_ansi(false)
                        .with_target(true)
                        .with_thread_names(true)
                        .with_timer(fmt::time::uptime())
                        .json();
                    subscriber.with(file_layer).init();
                    return Some(path);
                }
            }
        }
    }

    subscriber.init();
    None
}

/// The filter used when `RUST_LOG` is unset.
pub fn filter_string(config: Option<&Config>) -> String {
    match config {
        Some(config) if !config.debug.log_level.is_empty() => config.debug.log_level.clone(),
        _ => DEFAULT_FILTER.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The configured level is used, and an empty one falls back to the default.
    #[test]
    fn test_filter_string_from_config() {
        let mut config = Config::default();
        config.debug.log_level = "warn,geode_imagery=trace".into();
        assert_eq!(filter_string(Some(&config)), "warn,geode_imagery=trace");

        config.debug.log_level.clear();
        assert_eq!(filter_string(Some(&config)), DEFAULT_FILTER);
        assert_eq!(filter_string(None), DEFAULT_FILTER);
    }

    /// Per-crate filter directives parse.
    #[test]
    fn test_subsystem_filter() {
        for directive in ["info", "debug,geode_terrain=trace", "warn,geode_imagery=debug,geode_tiles=trace"] {
            assert!(EnvFilter::try_new(directive).is_ok(), "failed to parse {directive}");
        }
        assert!(EnvFilter::try_new(DEFAULT_FILTER).is_ok());
    }

    /// The JSON log lands in the requested directory.
    #[test]
    fn test_file_logging() {
        let dir = tempfile::tempdir().unwrap();
        let log_dir = dir.path().join("logs");
        let path = init_logging(Some(&log_dir), true, None).unwrap();
        assert_eq!(path, log_dir.join(LOG_FILE));
        assert!(path.exists());
        tracing::info!(frame = 1, "logging initialized");
    }
}
