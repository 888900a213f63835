//! End-to-end: files on disk through the retriever into drawn terrain.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use geode_geo::{Globe, LatLon};
use geode_imagery::{FileSystemLoader, ImageryLayerSettings, TiledImageLayer};
use geode_render::{DrawContext, LookAtView, RecordingBackend, UniformValue, Viewport};
use geode_terrain::{EllipsoidRectangularTessellator, TessellatorSettings};
use geode_tiles::{LevelSet, LevelSetParams};

fn write_png(root: &Path, relative: &str, color: [u8; 4]) {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    image::RgbaImage::from_pixel(8, 8, image::Rgba(color))
        .save(&path)
        .unwrap();
}

fn write_level(root: &Path, level: u32, rows: u32, columns: u32) {
    for row in 0..rows {
        for column in 0..columns {
            let shade = (40 * level + row * 3 + column) as u8;
            write_png(root, &format!("earth/{level}/{row}/{row}_{column}.png"), [shade, 100, 200, 255]);
        }
    }
}

fn level_set() -> LevelSet {
    LevelSet::new(&LevelSetParams {
        dataset_name: "earth".into(),
        num_levels: 3,
        tile_width: 8,
        tile_height: 8,
        ..Default::default()
    })
    .unwrap()
}

fn context(globe: &Globe, altitude: f64) -> DrawContext {
    let view = LookAtView::looking_down(globe, LatLon::new(5.0, 10.0), altitude, 45.0, Viewport::new(640.0, 480.0))
        .unwrap();
    let mut dc = DrawContext::new(globe.clone(), Arc::new(view));
    dc.begin_frame(Instant::now());
    dc
}

fn settle(layer: &mut TiledImageLayer, now: Instant) -> bool {
    let start = Instant::now();
    let mut arrived = false;
    while layer.in_flight_count() > 0 {
        arrived |= layer.process_completed(now);
        assert!(start.elapsed() < Duration::from_secs(10), "timed out waiting for tiles");
        std::thread::sleep(Duration::from_millis(2));
    }
    arrived
}

/// A descending camera first sees level-zero imagery, then refined tiles
/// drawn from their own images or their ancestors'.
#[test]
fn test_descending_camera_draws_imagery() {
    let dir = tempfile::tempdir().unwrap();
    write_level(dir.path(), 0, 5, 10);
    // Level 1 exists on disk; level 2 does not.
    write_level(dir.path(), 1, 10, 20);

    let globe = Globe::wgs84_flat();
    let mut tessellator = EllipsoidRectangularTessellator::new(globe.clone(), TessellatorSettings::default()).unwrap();
    let loader = Arc::new(FileSystemLoader::new(dir.path()));
    let settings = ImageryLayerSettings {
        worker_threads: 2,
        ..Default::default()
    };
    let mut layer = TiledImageLayer::new("earth", level_set(), loader, settings).unwrap();
    let mut backend = RecordingBackend::new();

    // Far away: nothing is selectable until level zero arrives.
    let mut dc = context(&globe, 2.0e7);
    let terrain = tessellator.tessellate(&mut dc);
    assert_eq!(layer.assemble_tiles(&dc, Some(&terrain)).unwrap(), 0);
    assert!(settle(&mut layer, dc.frame_time()));

    let mut dc = context(&globe, 2.0e7);
    let terrain = tessellator.tessellate(&mut dc);
    let selected = layer.assemble_tiles(&dc, Some(&terrain)).unwrap();
    assert!(selected > 0);
    let draws = layer.render(&terrain, &mut backend).unwrap();
    assert!(draws > 0);
    for draw in backend.draws() {
        assert_eq!(draw.uniform("tex_scale"), Some(UniformValue::Float(1.0)));
    }

    // Close in, down to the final level.
    backend.clear_log();
    let mut dc = context(&globe, 1.0e5);
    let terrain = tessellator.tessellate(&mut dc);
    layer.assemble_tiles(&dc, Some(&terrain)).unwrap();
    settle(&mut layer, dc.frame_time());

    let mut dc = context(&globe, 1.0e5);
    let terrain = tessellator.tessellate(&mut dc);
    let selected = layer.assemble_tiles(&dc, Some(&terrain)).unwrap();
    assert!(selected > 0);
    for &id in layer.current_tiles() {
        let tile = layer.tile(id).unwrap();
        assert!(tile.has_image() || tile.fallback().is_some());
        if let Some(fallback) = tile.fallback() {
            assert!(layer.tile(fallback).unwrap().has_image());
        }
    }
    // Level-2 files never existed, so final-level tiles borrow ancestors.
    assert!(layer.current_tiles().iter().any(|&id| {
        let tile = layer.tile(id).unwrap();
        tile.level_number() == 2 && tile.fallback().is_some()
    }));

    let draws = layer.render(&terrain, &mut backend).unwrap();
    assert!(draws > 0);
    assert!(backend.draws().iter().any(|d| match d.uniform("tex_scale") {
        Some(UniformValue::Float(scale)) => scale < 1.0,
        _ => false,
    }));
}
