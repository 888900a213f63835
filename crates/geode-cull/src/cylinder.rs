//! Bounding cylinders aligned with the local surface normal of a region.

use geode_geo::{Globe, LatLon, Region};
use glam::DVec3;

use crate::{CullError, Extent, Frustum, Line, Plane};

/// Minimum height of a region cylinder when the terrain is flat.
const MIN_REGION_CYLINDER_HEIGHT: f64 = 10.0;

/// A finite right circular cylinder.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Cylinder {
    bottom_center: DVec3,
    top_center: DVec3,
    radius: f64,
    axis: DVec3,
    height: f64,
}

impl Cylinder {
    pub fn new(bottom_center: DVec3, top_center: DVec3, radius: f64) -> Result<Self, CullError> {
        if !(radius >= 0.0 && radius.is_finite()) {
            return Err(CullError::InvalidRadius(radius));
        }
        let span = top_center - bottom_center;
        let height = span.length();
        if height == 0.0 || !height.is_finite() {
            return Err(CullError::DegenerateAxis);
        }
        Ok(Self {
            bottom_center,
            top_center,
            radius,
            axis: span / height,
            height,
        })
    }

    /// The minimal cylinder around a region's surface between its lowest and
    /// highest (exaggerated) terrain.
    ///
    /// The axis follows the surface normal at the region centroid. Regions
    /// wider than a hemisphere in longitude get a cylinder around the whole
    /// globe instead.
    pub fn from_region(globe: &Globe, vertical_exaggeration: f64, region: &Region) -> Self {
        let (min_elev, max_elev) = globe.elevation_model().extreme_elevations(region);
        let mut min_h = min_elev * vertical_exaggeration;
        let mut max_h = max_elev * vertical_exaggeration;
        if min_h > max_h {
            std::mem::swap(&mut min_h, &mut max_h);
        }
        if max_h - min_h < MIN_REGION_CYLINDER_HEIGHT {
            max_h = min_h + MIN_REGION_CYLINDER_HEIGHT;
        }

        if region.delta_lon() > 180.0 || region.is_empty() {
            tracing::trace!(?region, "bounding whole globe");
            let r = globe.maximum_radius() + max_h.max(0.0);
            return Self {
                bottom_center: DVec3::new(0.0, -r, 0.0),
                top_center: DVec3::new(0.0, r, 0.0),
                radius: r,
                axis: DVec3::Y,
                height: 2.0 * r,
            };
        }

        let centroid = region.centroid();
        let axis = globe.surface_normal(centroid);
        let origin = globe.point_at(centroid, 0.0);

        let [sw, se, ne, nw] = region.corners();
        let samples = [
            sw,
            se,
            ne,
            nw,
            centroid,
            LatLon::new(region.min_lat(), centroid.longitude),
            LatLon::new(region.max_lat(), centroid.longitude),
            LatLon::new(centroid.latitude, region.min_lon()),
            LatLon::new(centroid.latitude, region.max_lon()),
        ];

        let mut min_axial = f64::MAX;
        let mut max_axial = f64::MIN;
        let mut max_perp: f64 = 0.0;
        for position in samples {
            for h in [min_h, max_h] {
                let offset = globe.point_at(position, h) - origin;
                let axial = offset.dot(axis);
                let perp = (offset - axis * axial).length();
                min_axial = min_axial.min(axial);
                max_axial = max_axial.max(axial);
                max_perp = max_perp.max(perp);
            }
        }

        Self {
            bottom_center: origin + axis * min_axial,
            top_center: origin + axis * max_axial,
            radius: max_perp,
            axis,
            height: max_axial - min_axial,
        }
    }

    pub fn bottom_center(&self) -> DVec3 {
        self.bottom_center
    }

    pub fn top_center(&self) -> DVec3 {
        self.top_center
    }

    /// Radius of the circular cross-section.
    pub fn cylinder_radius(&self) -> f64 {
        self.radius
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    /// Unit direction from bottom to top.
    pub fn axis(&self) -> DVec3 {
        self.axis
    }

    /// Distance between the endpoints at which the cylinder still reaches the
    /// positive side of `plane`, truncating `endpoints` to that side.
    ///
    /// Returns a negative value when both end caps are at least
    /// `effective_radius` behind the plane and `0.0` when the endpoints lie on
    /// the same side with nothing to truncate.
    fn intersects_at(&self, plane: &Plane, effective_radius: f64, endpoints: &mut [DVec3; 2]) -> f64 {
        let dq1 = plane.dot(endpoints[0]);
        let bq1 = dq1 <= -effective_radius;
        let dq2 = plane.dot(endpoints[1]);
        let bq2 = dq2 <= -effective_radius;

        if bq1 && bq2 {
            return -1.0;
        }
        if bq1 == bq2 {
            return 0.0;
        }

        let t = (effective_radius + dq1) / plane.normal().dot(endpoints[0] - endpoints[1]);
        let new_end = endpoints[0] + (endpoints[1] - endpoints[0]) * t;
        if bq1 {
            endpoints[0] = new_end;
        } else {
            endpoints[1] = new_end;
        }
        t
    }

    /// Parameters along `line` where it enters and leaves the cylinder.
    pub fn intersect_line(&self, line: &Line) -> Option<(f64, f64)> {
        let a = self.axis;
        let d = line.direction();
        let ao = line.origin() - self.bottom_center;
        let d_par = d.dot(a);
        let o_par = ao.dot(a);
        let d_perp = d - a * d_par;
        let o_perp = ao - a * o_par;

        let mut hits: Vec<f64> = Vec::with_capacity(4);

        let qa = d_perp.length_squared();
        if qa > f64::EPSILON {
            let qb = 2.0 * d_perp.dot(o_perp);
            let qc = o_perp.length_squared() - self.radius * self.radius;
            let disc = qb * qb - 4.0 * qa * qc;
            if disc >= 0.0 {
                let root = disc.sqrt();
                for t in [(-qb - root) / (2.0 * qa), (-qb + root) / (2.0 * qa)] {
                    let along = o_par + t * d_par;
                    if (0.0..=self.height).contains(&along) {
                        hits.push(t);
                    }
                }
            }
        }

        if d_par.abs() > f64::EPSILON {
            for cap in [0.0, self.height] {
                let t = (cap - o_par) / d_par;
                if (o_perp + d_perp * t).length() <= self.radius {
                    hits.push(t);
                }
            }
        }

        let lo = hits.iter().copied().reduce(f64::min)?;
        let hi = hits.iter().copied().reduce(f64::max)?;
        Some((lo, hi))
    }
}

impl Extent for Cylinder {
    fn center(&self) -> DVec3 {
        (self.bottom_center + self.top_center) * 0.5
    }

    fn radius(&self) -> f64 {
        let half = 0.5 * self.height;
        (self.radius * self.radius + half * half).sqrt()
    }

    /// Plane-by-plane test carrying truncated endpoints from one plane to the
    /// next. Near and far share an effective radius, as do each side pair.
    fn intersects_frustum(&self, frustum: &Frustum) -> bool {
        let mut endpoints = [self.bottom_center, self.top_center];

        let r = self.effective_radius(frustum.near());
        if self.intersects_at(frustum.near(), r, &mut endpoints) < 0.0 {
            return false;
        }
        let r = self.effective_radius(frustum.far());
        if self.intersects_at(frustum.far(), r, &mut endpoints) < 0.0 {
            return false;
        }

        let r = self.effective_radius(frustum.left());
        if self.intersects_at(frustum.left(), r, &mut endpoints) < 0.0 {
            return false;
        }
        let r = self.effective_radius(frustum.right());
        if self.intersects_at(frustum.right(), r, &mut endpoints) < 0.0 {
            return false;
        }

        let r = self.effective_radius(frustum.top());
        if self.intersects_at(frustum.top(), r, &mut endpoints) < 0.0 {
            return false;
        }
        let r = self.effective_radius(frustum.bottom());
        self.intersects_at(frustum.bottom(), r, &mut endpoints) >= 0.0
    }

    fn intersects_plane(&self, plane: &Plane) -> bool {
        let mut endpoints = [self.bottom_center, self.top_center];
        let r = self.effective_radius(plane);
        self.intersects_at(plane, r, &mut endpoints) >= 0.0
    }

    fn intersects_line(&self, line: &Line) -> bool {
        self.intersect_line(line).is_some()
    }

    /// `radius * sqrt(1 - (n·axis)^2)`; equals the full radius when the axis
    /// lies in the plane and zero when it is parallel to the normal.
    fn effective_radius(&self, plane: &Plane) -> f64 {
        let n_dot_a = plane.normal().dot(self.axis).abs();
        self.radius * (1.0 - n_dot_a * n_dot_a).max(0.0).sqrt()
    }
}
