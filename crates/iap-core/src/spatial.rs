//! Spatial math and fixed-precision point keys.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Mean Earth radius used by the great-circle helpers.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Micro-degrees per degree.
const MICRO: f64 = 1.0e6;

/// Map key for a protection point.
///
/// Latitude and longitude are stored as rounded micro-degrees so that two
/// evaluations of the same point always land on the same entry, regardless
/// of floating-point noise in the grid generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PointKey {
    pub lat_micro: i64,
    pub lon_micro: i64,
}

impl PointKey {
    pub fn from_degrees(latitude: f64, longitude: f64) -> Self {
        Self {
            lat_micro: to_micro(latitude),
            lon_micro: to_micro(longitude),
        }
    }

    pub fn latitude(&self) -> f64 {
        from_micro(self.lat_micro)
    }

    pub fn longitude(&self) -> f64 {
        from_micro(self.lon_micro)
    }
}

impl fmt::Display for PointKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.latitude(), self.longitude())
    }
}

pub fn to_micro(degrees: f64) -> i64 {
    (degrees * MICRO).round() as i64
}

pub fn from_micro(micro: i64) -> f64 {
    micro as f64 / MICRO
}

/// Great-circle distance in meters between two points given in degrees.
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (p1, p2) = (lat1.to_radians(), lat2.to_radians());
    let half_dlat = (p2 - p1) / 2.0;
    let half_dlon = (lon2 - lon1).to_radians() / 2.0;
    let h = half_dlat.sin().powi(2) + p1.cos() * p2.cos() * half_dlon.sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}

/// Initial bearing from point 1 to point 2 in degrees, 0 = north, clockwise, in [0, 360).
pub fn bearing_deg(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (p1, p2) = (lat1.to_radians(), lat2.to_radians());
    let dlon = (lon2 - lon1).to_radians();

    let east = dlon.sin() * p2.cos();
    let north = p1.cos() * p2.sin() - p1.sin() * p2.cos() * dlon.cos();
    east.atan2(north).to_degrees().rem_euclid(360.0)
}

/// Destination reached from (`lat`, `lon`) after `distance_m` along
/// `bearing_rad` (radians, 0 = north, clockwise). Longitude is wrapped to
/// [-180, 180).
pub fn offset_by_bearing(lat: f64, lon: f64, distance_m: f64, bearing_rad: f64) -> (f64, f64) {
    if distance_m == 0.0 {
        return (lat, lon);
    }
    let delta = distance_m / EARTH_RADIUS_M;
    let p1 = lat.to_radians();

    let sin_p2 = (p1.sin() * delta.cos() + p1.cos() * delta.sin() * bearing_rad.cos())
        .clamp(-1.0, 1.0);
    let p2 = sin_p2.asin();
    let dlon = (bearing_rad.sin() * delta.sin() * p1.cos()).atan2(delta.cos() - p1.sin() * sin_p2);

    let lon2 = (lon + dlon.to_degrees() + 180.0).rem_euclid(360.0) - 180.0;
    (p2.to_degrees(), lon2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_degree_of_latitude() {
        let dist = haversine_distance(36.0, -121.0, 37.0, -121.0);
        assert!((dist - 111_195.0).abs() < 5.0, "got {dist}");
        assert_eq!(haversine_distance(36.0, -121.0, 36.0, -121.0), 0.0);
    }

    #[test]
    fn offset_wraps_the_antimeridian() {
        let (_, lon) = offset_by_bearing(0.0, 179.99, 5_000.0, std::f64::consts::FRAC_PI_2);
        assert!(lon < -179.9, "got {lon}");
    }

    #[test]
    fn test_bearing_cardinal_directions() {
        assert!(bearing_deg(0.0, 0.0, 1.0, 0.0).abs() < 1e-6);
        assert!((bearing_deg(0.0, 0.0, 0.0, 1.0) - 90.0).abs() < 1e-6);
        assert!((bearing_deg(0.0, 0.0, -1.0, 0.0) - 180.0).abs() < 1e-6);
        assert!((bearing_deg(0.0, 0.0, 0.0, -1.0) - 270.0).abs() < 1e-6);
    }

    #[test]
    fn offset_then_measure_round_trips_distance() {
        let (lat, lon) = offset_by_bearing(37.0, -122.0, 5_000.0, 1.0);
        let dist = haversine_distance(37.0, -122.0, lat, lon);
        assert!((dist - 5_000.0).abs() < 0.5, "got {dist}");
    }

    #[test]
    fn point_key_absorbs_float_noise() {
        let a = PointKey::from_degrees(37.123456, -122.654321);
        let b = PointKey::from_degrees(37.123456 + 1e-10, -122.654321 - 1e-10);
        assert_eq!(a, b);
        assert_eq!(a.lat_micro, 37_123_456);
        assert_eq!(a.lon_micro, -122_654_321);
        assert!((a.latitude() - 37.123456).abs() < 1e-9);
    }
}
