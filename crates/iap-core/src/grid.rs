//! Protection-area grid generation.

use crate::error::{IapError, Result};
use crate::models::ProtectionPoint;

const ARCSEC_PER_DEG: f64 = 3600.0;

/// Produces the protection points of an area incumbent.
pub trait GridSampler: Send + Sync {
    /// Points inside `polygon` (`[lat, lon]` vertices) at the given resolution.
    fn grid_points(&self, polygon: &[[f64; 2]], resolution_arcsec: f64)
        -> Result<Vec<ProtectionPoint>>;
}

/// Lat/lon lattice over the polygon's bounding box, filtered by ray casting.
///
/// Lattice nodes are aligned to whole multiples of the resolution so that
/// neighbouring areas share grid points.
#[derive(Debug, Clone, Default)]
pub struct PolygonGridSampler;

impl GridSampler for PolygonGridSampler {
    fn grid_points(
        &self,
        polygon: &[[f64; 2]],
        resolution_arcsec: f64,
    ) -> Result<Vec<ProtectionPoint>> {
        let ring = open_ring(polygon);
        if ring.len() < 3 {
            return Err(IapError::DegeneratePolygon(ring.len()));
        }
        if !(resolution_arcsec.is_finite() && resolution_arcsec > 0.0) {
            return Err(IapError::InvalidRule {
                rule: "iap",
                field: "grid_resolution_arcsec",
                value: resolution_arcsec,
            });
        }
        let step = resolution_arcsec / ARCSEC_PER_DEG;

        let (mut min_lat, mut max_lat) = (f64::MAX, f64::MIN);
        let (mut min_lon, mut max_lon) = (f64::MAX, f64::MIN);
        for [lat, lon] in ring {
            min_lat = min_lat.min(*lat);
            max_lat = max_lat.max(*lat);
            min_lon = min_lon.min(*lon);
            max_lon = max_lon.max(*lon);
        }

        let lat_start = (min_lat / step).ceil() as i64;
        let lat_end = (max_lat / step).floor() as i64;
        let lon_start = (min_lon / step).ceil() as i64;
        let lon_end = (max_lon / step).floor() as i64;

        let mut points = Vec::new();
        for i in lat_start..=lat_end {
            let lat = i as f64 * step;
            for j in lon_start..=lon_end {
                let lon = j as f64 * step;
                if polygon_contains(polygon, lat, lon) {
                    points.push(ProtectionPoint::new(lat, lon));
                }
            }
        }

        // Sliver polygons smaller than one cell still get protected.
        if points.is_empty() {
            let n = ring.len() as f64;
            let (sum_lat, sum_lon) = ring
                .iter()
                .fold((0.0, 0.0), |acc, v| (acc.0 + v[0], acc.1 + v[1]));
            points.push(ProtectionPoint::new(sum_lat / n, sum_lon / n));
        }

        Ok(points)
    }
}

/// Drop the repeated closing vertex, if any.
fn open_ring(polygon: &[[f64; 2]]) -> &[[f64; 2]] {
    match polygon {
        [first, .., last] if first == last => &polygon[..polygon.len() - 1],
        _ => polygon,
    }
}

/// Check if a point is inside a `[lat, lon]` polygon.
/// Uses ray casting algorithm.
pub fn polygon_contains(polygon: &[[f64; 2]], lat: f64, lon: f64) -> bool {
    let n = polygon.len();
    if n < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let yi = polygon[i][0];
        let xi = polygon[i][1];
        let yj = polygon[j][0];
        let xj = polygon[j][1];

        if ((yi > lat) != (yj > lat)) && (lon < (xj - xi) * (lat - yi) / (yj - yi) + xi) {
            inside = !inside;
        }
        j = i;
    }

    inside
}
