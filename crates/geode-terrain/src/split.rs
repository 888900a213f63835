//! The distance-based refinement test shared by terrain and imagery.

use geode_geo::{Globe, LatLon, Region};
use glam::DVec3;

/// The five points whose distance to the eye drives refinement: the four
/// corners followed by the centroid.
pub fn split_samples(region: &Region) -> [LatLon; 5] {
    let [sw, se, ne, nw] = region.corners();
    [sw, se, ne, nw, region.centroid()]
}

/// True if a region's cells are too coarse for its distance from the eye.
///
/// `cell_size = delta_lat_radians * radius / density` is compared to the
/// nearest sample distance in log space: split when
/// `log10(cell_size) > log10(min_distance) - log10_target`.
pub fn needs_to_split(
    globe: &Globe,
    eye: DVec3,
    vertical_exaggeration: f64,
    region: &Region,
    density: u32,
    log10_target: f64,
) -> bool {
    let min_distance = split_samples(region)
        .into_iter()
        .map(|p| eye.distance(globe.surface_point(p, vertical_exaggeration)))
        .fold(f64::MAX, f64::min);
    let cell_size = region.delta_lat_radians() * globe.radius() / f64::from(density.max(1));
    // Eye on the surface: always refine.
    if min_distance <= 0.0 {
        return true;
    }
    cell_size.log10() > min_distance.log10() - log10_target
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region() -> Region {
        Region::new(0.0, 10.0, 0.0, 10.0).unwrap()
    }

    fn eye_above(globe: &Globe, altitude: f64) -> DVec3 {
        globe.point_at(region().centroid(), altitude)
    }

    /// A nearby eye splits; a far one does not.
    #[test]
    fn test_split_by_distance() {
        let globe = Globe::wgs84_flat();
        assert!(needs_to_split(&globe, eye_above(&globe, 10_000.0), 1.0, &region(), 20, 1.3));
        assert!(!needs_to_split(&globe, eye_above(&globe, 1.0e8), 1.0, &region(), 20, 1.3));
    }

    /// If a far tile splits, a nearer identical tile splits too.
    #[test]
    fn test_monotonic_in_distance() {
        let globe = Globe::wgs84_flat();
        let mut previous = true;
        for k in 0..60 {
            let altitude = 1_000.0 * 1.3f64.powi(k);
            let split = needs_to_split(&globe, eye_above(&globe, altitude), 1.0, &region(), 20, 1.3);
            assert!(previous || !split, "split resumed at altitude {altitude}");
            previous = split;
        }
    }

    /// Raising density makes cells smaller and delays splitting.
    #[test]
    fn test_density_lowers_cell_size() {
        let globe = Globe::wgs84_flat();
        // cell size at density 20 is ~55.6 km; 10^1.3 times that is ~1.1e6 m.
        let eye = eye_above(&globe, 1.5e6);
        assert!(!needs_to_split(&globe, eye, 1.0, &region(), 20, 1.3));
        assert!(needs_to_split(&globe, eye, 1.0, &region(), 5, 1.3));
    }
}
