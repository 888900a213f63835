//! Headless geode demo: flies a descending camera over a tiled dataset and
//! reports what the terrain and imagery layers select each frame.

mod flight;

use std::error::Error;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use geode_config::{CliArgs, Config};
use geode_geo::{Ellipsoid, Globe, LatLon, ZeroElevation};
use geode_imagery::{FileSystemLoader, ImageryLayerSettings, TiledImageLayer};
use geode_render::{DrawContext, RecordingBackend};
use geode_terrain::{EllipsoidRectangularTessellator, TessellatorSettings};
use geode_tiles::{LevelSet, LevelSetParams};

use crate::flight::Descent;

const FRAME_PERIOD: Duration = Duration::from_millis(16);
/// Frames between checks of the config file for edits.
const RELOAD_PERIOD: u32 = 30;

fn main() -> ExitCode {
    let args = CliArgs::parse();

    let config_dir = match args.config.clone().map_or_else(Config::default_dir, Ok) {
        Ok(dir) => dir,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let mut config = Config::load_or_create(&config_dir).unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e}, using defaults");
        Config::default()
    });
    config.apply_cli_overrides(&args);

    let log_dir = config_dir.join("logs");
    geode_log::init_logging(Some(&log_dir), cfg!(debug_assertions), Some(&config));

    match run(&config, Some(&config_dir)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "demo failed");
            ExitCode::FAILURE
        }
    }
}

fn globe(config: &Config) -> Result<Globe, Box<dyn Error>> {
    let ellipsoid = Ellipsoid::new(config.globe.equatorial_radius_m, config.globe.polar_radius_m)?;
    Ok(Globe::new(ellipsoid, Arc::new(ZeroElevation)))
}

fn tessellator_settings(config: &Config) -> TessellatorSettings {
    let terrain = &config.terrain;
    TessellatorSettings {
        density: terrain.density,
        max_level: terrain.max_level,
        log10_resolution_target: terrain.log10_resolution_target,
        num_lat_subdivisions: terrain.num_lat_subdivisions,
        num_lon_subdivisions: terrain.num_lon_subdivisions,
        make_skirts: terrain.make_skirts,
    }
}

fn level_set_params(config: &Config) -> LevelSetParams {
    let imagery = &config.imagery;
    let delta = imagery.level_zero_tile_delta_deg;
    LevelSetParams {
        level_zero_tile_delta: LatLon::new(delta, delta),
        num_levels: imagery.num_levels,
        num_empty_levels: imagery.num_empty_levels,
        tile_width: imagery.tile_size,
        tile_height: imagery.tile_size,
        dataset_name: imagery.dataset_name.clone(),
        format_suffix: imagery.format_suffix.clone(),
        max_absent_tile_attempts: imagery.max_absent_tile_attempts,
        min_absent_tile_check_interval_ms: imagery.min_absent_tile_check_interval_ms,
        ..Default::default()
    }
}

fn layer_settings(config: &Config) -> ImageryLayerSettings {
    let imagery = &config.imagery;
    let mut settings = ImageryLayerSettings {
        force_level_zero_loads: imagery.force_level_zero_loads,
        retain_level_zero_tiles: imagery.retain_level_zero_tiles,
        split_density: config.terrain.density,
        log10_resolution_target: config.terrain.log10_resolution_target,
        cancel_out_of_view: imagery.cancel_out_of_view,
        ..Default::default()
    };
    if imagery.worker_threads > 0 {
        settings.worker_threads = imagery.worker_threads;
    }
    settings
}

/// Re-read the config file and return the new vertical exaggeration if the
/// file changed. Other sections only take effect on restart.
fn reload_exaggeration(live: &mut Config, config_dir: &Path) -> Option<f64> {
    match live.reload(config_dir) {
        Ok(Some(new)) => {
            *live = new;
            Some(live.globe.vertical_exaggeration)
        }
        Ok(None) => None,
        Err(e) => {
            tracing::warn!(error = %e, "config reload failed");
            None
        }
    }
}

fn run(config: &Config, config_dir: Option<&Path>) -> Result<(), Box<dyn Error>> {
    let globe = globe(config)?;
    let descent = Descent::from_config(&config.view);

    let mut tessellator = EllipsoidRectangularTessellator::new(globe.clone(), tessellator_settings(config))?;
    let level_set = LevelSet::new(&level_set_params(config))?;
    let loader = Arc::new(FileSystemLoader::new(&config.imagery.dataset_root));
    let mut layer = TiledImageLayer::new(
        config.imagery.dataset_name.clone(),
        level_set,
        loader,
        layer_settings(config),
    )?;

    let mut dc = DrawContext::new(globe.clone(), Arc::new(descent.view(&globe, 0)?));
    dc.set_vertical_exaggeration(config.globe.vertical_exaggeration);
    let mut backend = RecordingBackend::new();
    let mut live = config.clone();

    tracing::info!(
        frames = descent.frames(),
        root = %config.imagery.dataset_root.display(),
        "starting descent"
    );

    for frame in 0..descent.frames() {
        if let Some(dir) = config_dir.filter(|_| frame > 0 && frame % RELOAD_PERIOD == 0) {
            if let Some(exaggeration) = reload_exaggeration(&mut live, dir) {
                tracing::info!(exaggeration, "applied vertical exaggeration from config");
                dc.set_vertical_exaggeration(exaggeration);
            }
        }
        dc.set_view(Arc::new(descent.view(&globe, frame)?));
        let now = Instant::now();
        dc.begin_frame(now);

        let arrived = layer.process_completed(now);
        let terrain = tessellator.tessellate(&mut dc);
        let selected = layer.assemble_tiles(&dc, Some(&terrain))?;

        backend.clear_log();
        terrain.render(&mut backend)?;
        let draws = layer.render(&terrain, &mut backend)?;

        println!(
            "frame {frame:3}  altitude {:>12.0} m  terrain {:4}  imagery {:4}  draws {:5}  in flight {:3}{}",
            descent.altitude(frame),
            terrain.len(),
            selected,
            draws,
            layer.in_flight_count(),
            if arrived { "  +images" } else { "" },
        );

        let elapsed = now.elapsed();
        if elapsed < FRAME_PERIOD {
            std::thread::sleep(FRAME_PERIOD - elapsed);
        }
    }

    tessellator.release_buffers(&mut backend);
    tracing::info!(
        tiles = layer.tile_count(),
        textures = backend.texture_count(),
        buffers = backend.buffer_count(),
        "descent finished"
    );
    Ok(())
}
