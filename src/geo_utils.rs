//! # Geographic Utilities
//!
//! Pure geometry for the matching filter - no network, no state.
//!
//! | Function | Description |
//! |----------|-------------|
//! | [`haversine_distance_km`] | Great-circle distance between two points |
//! | [`path_length_km`] | Total length of a driving path |
//! | [`segment_detour_km`] | Excess distance of a detour through a point |
//! | [`is_point_near_path`] | Whether a point lies approximately on a path |
//!
//! Distances are kilometers on a sphere of radius 6371 km; the path
//! tolerance used by the proximity check is defined against exactly this
//! formula, so the kernel is written out rather than delegated.
//!
//! ## Example
//!
//! ```rust
//! use waypoint_matcher::{geo_utils, GeoPoint};
//!
//! let bucharest = GeoPoint::new(44.4268, 26.1025);
//! let ploiesti = GeoPoint::new(44.9469, 26.0360);
//!
//! let km = geo_utils::haversine_distance_km(&bucharest, &ploiesti);
//! assert!(km > 50.0 && km < 65.0);
//! ```

use crate::GeoPoint;

/// Earth radius in kilometers.
const EARTH_RADIUS_KM: f64 = 6371.0;

// =============================================================================
// Distance Functions
// =============================================================================

/// Great-circle distance between two points in kilometers.
///
/// Haversine formula: convert both points to radians, then
/// `a = sin²(Δlat/2) + cos(lat1)·cos(lat2)·sin²(Δlon/2)` and
/// `d = 2·R·atan2(√a, √(1−a))`. Accurate to ~0.3%, well inside the
/// kilometer-scale tolerances the filter works with.
#[inline]
pub fn haversine_distance_km(p1: &GeoPoint, p2: &GeoPoint) -> f64 {
    let lat1 = p1.latitude.to_radians();
    let lat2 = p2.latitude.to_radians();
    let d_lat = (p2.latitude - p1.latitude).to_radians();
    let d_lon = (p2.longitude - p1.longitude).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_KM * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Total length of a path in kilometers.
///
/// Sums the haversine distance between consecutive points. Empty and
/// single-point paths have length zero.
pub fn path_length_km(points: &[GeoPoint]) -> f64 {
    points
        .windows(2)
        .map(|w| haversine_distance_km(&w[0], &w[1]))
        .sum()
}

// =============================================================================
// Path Proximity
// =============================================================================

/// Excess distance incurred by travelling `a -> point -> b` instead of
/// `a -> b` directly, in kilometers.
///
/// Zero when the point lies on the segment; grows with lateral offset.
#[inline]
pub fn segment_detour_km(a: &GeoPoint, point: &GeoPoint, b: &GeoPoint) -> f64 {
    haversine_distance_km(a, point) + haversine_distance_km(point, b)
        - haversine_distance_km(a, b)
}

/// Whether `point` lies approximately on `path`.
///
/// Scans consecutive path points and accepts on the first edge whose detour
/// through the point is strictly below `tolerance_km`; a detour of exactly
/// the tolerance does not match. A path with fewer than two points never
/// matches.
pub fn is_point_near_path(point: &GeoPoint, path: &[GeoPoint], tolerance_km: f64) -> bool {
    path.windows(2)
        .any(|w| segment_detour_km(&w[0], point, &w[1]) < tolerance_km)
}

// =============================================================================
// Unit Tests
// =============================================================================
