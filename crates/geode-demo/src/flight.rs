//! A scripted camera descent.

use geode_config::ViewConfig;
use geode_geo::{Globe, LatLon};
use geode_render::{LookAtView, RenderError, Viewport};

/// Altitudes fall geometrically from the start to the end altitude, so
/// every frame refines by a similar factor.
#[derive(Clone, Debug)]
pub struct Descent {
    position: LatLon,
    start_altitude: f64,
    end_altitude: f64,
    frames: u32,
    field_of_view: f64,
    viewport: Viewport,
}

impl Descent {
    pub fn from_config(view: &ViewConfig) -> Self {
        Self {
            position: LatLon::new(view.latitude_deg, view.longitude_deg),
            start_altitude: view.start_altitude_m.max(1.0),
            end_altitude: view.end_altitude_m.max(1.0),
            frames: view.frames,
            field_of_view: view.field_of_view_deg,
            viewport: Viewport::new(f64::from(view.width.max(1)), f64::from(view.height.max(1))),
        }
    }

    pub fn frames(&self) -> u32 {
        self.frames
    }

    pub fn altitude(&self, frame: u32) -> f64 {
        if self.frames <= 1 {
            return self.start_altitude;
        }
        let t = f64::from(frame.min(self.frames - 1)) / f64::from(self.frames - 1);
        self.start_altitude * (self.end_altitude / self.start_altitude).powf(t)
    }

    pub fn view(&self, globe: &Globe, frame: u32) -> Result<LookAtView, RenderError> {
        LookAtView::looking_down(globe, self.position, self.altitude(frame), self.field_of_view, self.viewport)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The descent hits both end altitudes and never climbs.
    #[test]
    fn test_altitudes_descend() {
        let config = ViewConfig {
            start_altitude_m: 1.0e7,
            end_altitude_m: 1.0e3,
            frames: 5,
            ..Default::default()
        };
        let descent = Descent::from_config(&config);
        assert!((descent.altitude(0) - 1.0e7).abs() < 1e-3);
        assert!((descent.altitude(4) - 1.0e3).abs() < 1e-6);
        assert!((descent.altitude(2) - 1.0e5).abs() < 1e-3);
        for frame in 1..5 {
            assert!(descent.altitude(frame) < descent.altitude(frame - 1));
        }
    }

    /// A single-frame flight stays at the start altitude.
    #[test]
    fn test_single_frame() {
        let config = ViewConfig {
            frames: 1,
            ..Default::default()
        };
        let descent = Descent::from_config(&config);
        assert_eq!(descent.altitude(0), config.start_altitude_m);
        assert!(descent.view(&Globe::wgs84_flat(), 0).is_ok());
    }
}
