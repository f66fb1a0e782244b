//! Spherical geometry helpers shared by obfuscation, tracking and path processing.
//!
//! All helpers use a single spherical model in which one degree of latitude is
//! exactly [`METERS_PER_DEGREE`]. Keeping the noise generator and the distance
//! measurement on the same model means a noise radius of `r` meters really is
//! at most `r` meters when measured back.

use std::f64::consts::PI;

use super::types::Coordinate;

/// Meters spanned by one degree of latitude (about 111 km).
pub const METERS_PER_DEGREE: f64 = 111_000.0;

/// Sphere radius consistent with [`METERS_PER_DEGREE`].
pub const EARTH_RADIUS_METERS: f64 = METERS_PER_DEGREE * 180.0 / PI;

/// Wraps a longitude in degrees into `[-180, 180]`.
///
/// Values already in range are returned unchanged.
#[must_use]
pub fn normalize_longitude(longitude: f64) -> f64 {
    if (-180.0..=180.0).contains(&longitude) {
        longitude
    } else {
        (longitude + 180.0).rem_euclid(360.0) - 180.0
    }
}

/// Great-circle distance between two coordinates in meters (haversine).
///
/// # Examples
///
/// ```
/// use whereabouts_core::location::{geo::great_circle_distance, Coordinate};
///
/// let a = Coordinate::new(35.0000, 139.0);
/// let b = Coordinate::new(35.0010, 139.0);
/// let meters = great_circle_distance(a, b);
/// assert!((meters - 111.0).abs() < 1.0);
/// ```
#[must_use]
pub fn great_circle_distance(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_METERS * h.sqrt().min(1.0).asin()
}

/// Point reached by travelling `distance_m` meters from `origin` along the
/// great circle with initial `bearing` (radians, clockwise from north).
///
/// Works on unit vectors, so it stays accurate next to the poles: paths over
/// a pole come back down the other side, and longitudes wrap at the
/// antimeridian. The result is always a valid coordinate.
#[must_use]
pub fn destination_point(origin: Coordinate, bearing: f64, distance_m: f64) -> Coordinate {
    if distance_m == 0.0 {
        return origin;
    }

    let (sin_lat, cos_lat) = origin.latitude.to_radians().sin_cos();
    let (sin_lon, cos_lon) = origin.longitude.to_radians().sin_cos();
    let (sin_b, cos_b) = bearing.sin_cos();
    let (sin_d, cos_d) = (distance_m / EARTH_RADIUS_METERS).sin_cos();

    let start = [cos_lat * cos_lon, cos_lat * sin_lon, sin_lat];
    let north = [-sin_lat * cos_lon, -sin_lat * sin_lon, cos_lat];
    let east = [-sin_lon, cos_lon, 0.0];

    let [x, y, z]: [f64; 3] = std::array::from_fn(|i| {
        let heading = north[i].mul_add(cos_b, east[i] * sin_b);
        start[i].mul_add(cos_d, heading * sin_d)
    });

    Coordinate::new(
        z.atan2(x.hypot(y)).to_degrees().clamp(-90.0, 90.0),
        normalize_longitude(y.atan2(x).to_degrees()),
    )
}

/// Projects `point` onto a local plane centered at `origin`, returning
/// `(east, north)` offsets in meters.
///
/// Equirectangular projection; accurate for the short spans of a recorded path.
/// The longitude difference takes the short way round, so spans crossing the
/// antimeridian stay short.
#[must_use]
pub fn local_offset_meters(origin: Coordinate, point: Coordinate) -> (f64, f64) {
    let east = wrap_delta(point.longitude - origin.longitude)
        * METERS_PER_DEGREE
        * origin.latitude.to_radians().cos();
    let north = (point.latitude - origin.latitude) * METERS_PER_DEGREE;
    (east, north)
}

/// Wraps a longitude difference into `[-180, 180)`.
fn wrap_delta(delta: f64) -> f64 {
    (delta + 180.0).rem_euclid(360.0) - 180.0
}

/// Distance in meters from `point` to the line through `start` and `end`.
///
/// Falls back to the point-to-point distance when `start` and `end` coincide.
#[must_use]
pub fn perpendicular_distance(point: Coordinate, start: Coordinate, end: Coordinate) -> f64 {
    let (px, py) = local_offset_meters(start, point);
    let (ex, ey) = local_offset_meters(start, end);

    let chord = ex.hypot(ey);
    if chord == 0.0 {
        return px.hypot(py);
    }

    (ex * py - ey * px).abs() / chord
}
