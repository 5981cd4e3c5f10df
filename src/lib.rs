//! # Waypoint Matcher
//!
//! Route matching for the MoveAround carpooling service.
//!
//! Given a rider's requested sub-trip (a [`Waypoint`]) and the driver routes
//! offered for that date, this library decides which routes can take the
//! rider along and enriches the survivors with human-readable addresses:
//!
//! 1. **Coordinate-order validation** - four road-travel-duration lookups
//!    cheaply reject routes that run the wrong way relative to the rider's
//!    segment.
//! 2. **Path proximity** - the route's actual driving path is fetched once,
//!    and both rider endpoints must lie within a tolerance of it.
//! 3. **Address resolution** - surviving routes are reverse-geocoded for
//!    display.
//!
//! All network lookups sit behind the [`MapsApi`] and [`RouteSource`] traits,
//! so the pipeline and the geometry are testable without a network.
//!
//! ## Quick Start
//!
//! ```rust
//! use waypoint_matcher::{geo_utils, polyline, GeoPoint};
//!
//! // Driving path between a route's endpoints, as returned by a
//! // directions lookup.
//! let path = polyline::decode("_p~iF~ps|U_ulLnnqC_mqNvxq`@").unwrap();
//! assert_eq!(path.len(), 3);
//!
//! // Is a rider pickup point close enough to that path?
//! let pickup = GeoPoint::new(38.5, -120.2);
//! assert!(geo_utils::is_point_near_path(&pickup, &path, 5.0));
//! ```

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

pub mod error;
pub mod geo_utils;
pub mod http;
pub mod matching;
pub mod polyline;

pub use error::LookupError;
pub use http::{BackendClient, GoogleMapsClient, MapsConfig};
pub use matching::{
    find_matching_routes, passes_coordinate_order, passes_path_proximity, MapsApi, RouteSource,
    TravelEstimate,
};

// ============================================================================
// Core Types
// ============================================================================

/// A geographic coordinate in decimal degrees (WGS84).
///
/// # Example
/// ```
/// use waypoint_matcher::GeoPoint;
/// let point = GeoPoint::new(44.4268, 26.1025); // Bucharest
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    /// Create a new geographic point.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// A rider-requested sub-trip: pickup point, drop-off point, and the desired
/// departure. Created per search, never persisted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Waypoint {
    pub start: GeoPoint,
    pub stop: GeoPoint,
    /// Desired departure, timezone-naive (the backend speaks local
    /// `YYYY-MM-DD HH:mm` strings).
    pub start_date: NaiveDateTime,
}

impl Waypoint {
    pub fn new(start: GeoPoint, stop: GeoPoint, start_date: NaiveDateTime) -> Self {
        Self { start, stop, start_date }
    }
}

/// A driver-offered trip fetched from the MoveAround backend.
///
/// The coordinates drive the matching; the remaining fields are
/// backend-supplied metadata carried through untouched for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateRoute {
    pub id: i64,
    pub start_latitude: f64,
    pub start_longitude: f64,
    pub stop_latitude: f64,
    pub stop_longitude: f64,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub available_seats: u32,
    /// Departure as the backend formats it (`YYYY-MM-DD HH:mm`).
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub user: Option<RouteUser>,
}

impl CandidateRoute {
    /// The route's origin.
    pub fn start(&self) -> GeoPoint {
        GeoPoint::new(self.start_latitude, self.start_longitude)
    }

    /// The route's destination.
    pub fn stop(&self) -> GeoPoint {
        GeoPoint::new(self.stop_latitude, self.stop_longitude)
    }
}

/// The driver who offered a route, as the backend embeds them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteUser {
    pub id: i64,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(rename = "profilePictureURL", default)]
    pub profile_picture_url: Option<String>,
}

/// A candidate that passed both filter stages, augmented with resolved
/// endpoint addresses. This is what the route list renders.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedRoute {
    #[serde(flatten)]
    pub route: CandidateRoute,
    pub start_address: String,
    pub stop_address: String,
}

/// Configuration for the matching pipeline.
#[derive(Debug, Clone)]
pub struct FilterConfig {
    /// Maximum excess path length for a rider point to count as lying on the
    /// route's driving path, in kilometers. Points at exactly this detour are
    /// excluded. Default: 5.0
    pub tolerance_km: f64,

    /// Maximum number of candidates evaluated in flight at once.
    /// Default: 8
    pub max_concurrency: usize,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            tolerance_km: 5.0,
            max_concurrency: 8,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geo_point_validation() {
        assert!(GeoPoint::new(44.4268, 26.1025).is_valid());
        assert!(!GeoPoint::new(91.0, 0.0).is_valid());
        assert!(!GeoPoint::new(0.0, 181.0).is_valid());
        assert!(!GeoPoint::new(f64::NAN, 0.0).is_valid());
    }

    #[test]
    fn test_candidate_route_wire_format() {
        let json = r#"{
            "id": 17,
            "startLatitude": 44.40,
            "startLongitude": 26.05,
            "stopLatitude": 44.55,
            "stopLongitude": 26.25,
            "price": 25.0,
            "availableSeats": 3,
            "startDate": "2024-06-01 09:30",
            "user": {
                "id": 4,
                "firstName": "Andrei",
                "profilePictureURL": "https://example.com/a.png"
            }
        }"#;

        let route: CandidateRoute = serde_json::from_str(json).unwrap();
        assert_eq!(route.id, 17);
        assert_eq!(route.start(), GeoPoint::new(44.40, 26.05));
        assert_eq!(route.stop(), GeoPoint::new(44.55, 26.25));
        assert_eq!(route.available_seats, 3);
        assert_eq!(route.start_date.as_deref(), Some("2024-06-01 09:30"));
        assert_eq!(route.user.as_ref().unwrap().first_name.as_deref(), Some("Andrei"));
    }

    #[test]
    fn test_candidate_route_minimal_payload() {
        // Older backend rows carry only the id and coordinates.
        let json = r#"{
            "id": 1,
            "startLatitude": 44.0,
            "startLongitude": 26.0,
            "stopLatitude": 45.0,
            "stopLongitude": 27.0
        }"#;

        let route: CandidateRoute = serde_json::from_str(json).unwrap();
        assert_eq!(route.price, 0.0);
        assert_eq!(route.available_seats, 0);
        assert!(route.user.is_none());
    }

    #[test]
    fn test_enriched_route_flattens_candidate() {
        let route = CandidateRoute {
            id: 5,
            start_latitude: 44.0,
            start_longitude: 26.0,
            stop_latitude: 45.0,
            stop_longitude: 27.0,
            price: 10.0,
            available_seats: 2,
            start_date: None,
            user: None,
        };
        let enriched = EnrichedRoute {
            route,
            start_address: "Str. Exemplu 1, Bucharest".to_string(),
            stop_address: "Str. Exemplu 2, Ploiesti".to_string(),
        };

        let value: serde_json::Value = serde_json::to_value(&enriched).unwrap();
        assert_eq!(value["id"], 5);
        assert_eq!(value["startAddress"], "Str. Exemplu 1, Bucharest");
        assert_eq!(value["stopAddress"], "Str. Exemplu 2, Ploiesti");
    }

    #[test]
    fn test_filter_config_defaults() {
        let config = FilterConfig::default();
        assert_eq!(config.tolerance_km, 5.0);
        assert_eq!(config.max_concurrency, 8);
    }
}
