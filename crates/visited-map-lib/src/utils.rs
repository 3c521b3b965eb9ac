//! Utility functions for coordinate conversions
//!
//! Clustering works in normalized Web Mercator space: the whole world maps onto the unit
//! square, with x growing eastwards and y growing southwards (tile order). At zoom `z` the
//! square is `extent * 2^z` pixels wide.

use geo::Point;
use std::f64::consts::PI;

/// Maximum latitude that can be represented in Web Mercator
pub const MAX_LATITUDE: f64 = 85.05112878;

/// Convert a longitude in degrees to normalized x in `[0, 1]`
#[inline(always)]
pub fn lng_to_x(lng: f64) -> f64 {
    lng / 360.0 + 0.5
}

/// Convert a latitude in degrees to normalized y in `[0, 1]`
///
/// Latitudes beyond the Web Mercator limit saturate to the square's edges.
#[inline(always)]
pub fn lat_to_y(lat: f64) -> f64 {
    let sin = (lat.clamp(-MAX_LATITUDE, MAX_LATITUDE) * PI / 180.0).sin();
    let y = 0.5 - 0.25 * ((1.0 + sin) / (1.0 - sin)).ln() / PI;
    y.clamp(0.0, 1.0)
}

/// Convert normalized x back to a longitude in degrees
#[inline(always)]
pub fn x_to_lng(x: f64) -> f64 {
    (x - 0.5) * 360.0
}

/// Convert normalized y back to a latitude in degrees
#[inline(always)]
pub fn y_to_lat(y: f64) -> f64 {
    let y2 = (180.0 - y * 360.0) * PI / 180.0;
    360.0 * y2.exp().atan() / PI - 90.0
}

/// Project a WGS84 point (x = lon, y = lat) into the unit square
#[inline(always)]
pub fn project(point: Point<f64>) -> [f64; 2] {
    [lng_to_x(point.x()), lat_to_y(point.y())]
}

/// Inverse of [`project`]
#[inline(always)]
pub fn unproject(xy: [f64; 2]) -> Point<f64> {
    Point::new(x_to_lng(xy[0]), y_to_lat(xy[1]))
}

/// Wrap a longitude into `[-180, 180)`
#[inline(always)]
pub fn wrap_longitude(lng: f64) -> f64 {
    (lng + 180.0).rem_euclid(360.0) - 180.0
}
