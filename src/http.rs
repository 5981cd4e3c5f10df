//! HTTP clients for the external services the filter depends on.
//!
//! - [`GoogleMapsClient`]: distance-matrix, directions and reverse-geocoding
//!   lookups, with connection pooling and a request timeout.
//! - [`BackendClient`]: the MoveAround backend's candidate-route source.
//!
//! Clients are constructed explicitly with their configuration (API key,
//! language, token); nothing is initialized process-wide. Payloads are
//! parsed by pure functions so the wire handling is testable offline.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use log::debug;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::error::LookupError;
use crate::matching::{MapsApi, RouteSource, TravelEstimate};
use crate::polyline;
use crate::{CandidateRoute, GeoPoint};

const DEFAULT_MAPS_BASE_URL: &str = "https://maps.googleapis.com/maps/api";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(60);

/// The backend speaks naive local date-times in this shape.
const BACKEND_DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Configuration for [`GoogleMapsClient`].
#[derive(Debug, Clone)]
pub struct MapsConfig {
    /// API key sent with every request.
    pub api_key: String,
    /// Response language for resolved addresses. Default: "en"
    pub language: String,
}

impl MapsConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            language: "en".to_string(),
        }
    }
}

/// Client for the Google Maps Web APIs used by the filter.
pub struct GoogleMapsClient {
    client: Client,
    config: MapsConfig,
    base_url: String,
}

impl GoogleMapsClient {
    /// Create a client with a pooled connection and request timeout.
    pub fn new(config: MapsConfig) -> Result<Self, LookupError> {
        let client = Client::builder()
            .pool_idle_timeout(POOL_IDLE_TIMEOUT)
            .tcp_keepalive(Duration::from_secs(30))
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            config,
            base_url: DEFAULT_MAPS_BASE_URL.to_string(),
        })
    }

    /// Point the client at a different host, e.g. a local stub.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Whether the road network offers any driving route between two points.
    ///
    /// Mirrors the pre-submit check the app runs before offering a route: a
    /// distance-matrix element status of `ZERO_RESULTS` means "no".
    pub async fn route_exists(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
    ) -> Result<bool, LookupError> {
        let body = self
            .fetch(self.distance_matrix_url(origin, destination))
            .await?;
        parse_element_status(&body).map(|status| status != "ZERO_RESULTS")
    }

    fn distance_matrix_url(&self, origin: GeoPoint, destination: GeoPoint) -> String {
        format!(
            "{}/distancematrix/json?units=metric&origins={}&destinations={}&language={}&key={}",
            self.base_url,
            coord_param(origin),
            coord_param(destination),
            self.config.language,
            self.config.api_key
        )
    }

    fn directions_url(&self, origin: GeoPoint, destination: GeoPoint) -> String {
        format!(
            "{}/directions/json?origin={}&destination={}&key={}",
            self.base_url,
            coord_param(origin),
            coord_param(destination),
            self.config.api_key
        )
    }

    fn geocode_url(&self, point: GeoPoint) -> String {
        format!(
            "{}/geocode/json?latlng={}&language={}&key={}",
            self.base_url,
            coord_param(point),
            self.config.language,
            self.config.api_key
        )
    }

    async fn fetch(&self, url: String) -> Result<Vec<u8>, LookupError> {
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(LookupError::Status(status));
        }
        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl MapsApi for GoogleMapsClient {
    async fn travel_estimate(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
    ) -> Result<TravelEstimate, LookupError> {
        debug!(
            "distance-matrix lookup {} -> {}",
            coord_param(origin),
            coord_param(destination)
        );
        let body = self
            .fetch(self.distance_matrix_url(origin, destination))
            .await?;
        parse_distance_matrix(&body)
    }

    async fn road_path(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
    ) -> Result<Vec<GeoPoint>, LookupError> {
        debug!(
            "directions lookup {} -> {}",
            coord_param(origin),
            coord_param(destination)
        );
        let body = self.fetch(self.directions_url(origin, destination)).await?;
        parse_directions(&body)
    }

    async fn reverse_geocode(&self, point: GeoPoint) -> Result<String, LookupError> {
        debug!("reverse geocode {}", coord_param(point));
        let body = self.fetch(self.geocode_url(point)).await?;
        parse_geocode(&body)
    }
}

/// Client for the MoveAround backend's route endpoints.
pub struct BackendClient {
    client: Client,
    base_url: String,
    token: String,
}

impl BackendClient {
    /// `token` is the caller's session token, passed through on every
    /// request as the `Authorization` header.
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Result<Self, LookupError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            token: token.into(),
        })
    }
}

#[async_trait]
impl RouteSource for BackendClient {
    async fn matching_routes(
        &self,
        departure: NaiveDateTime,
    ) -> Result<Vec<CandidateRoute>, LookupError> {
        let url = format!(
            "{}/routes/matching/{}",
            self.base_url,
            departure.format(BACKEND_DATE_FORMAT)
        );
        debug!("fetching candidate routes for {}", departure);

        let response = self
            .client
            .get(&url)
            .header("Authorization", &self.token)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(LookupError::Status(status));
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|err| LookupError::Malformed(err.to_string()))
    }
}

// ============================================================================
// Wire Formats
// ============================================================================

fn coord_param(point: GeoPoint) -> String {
    format!("{},{}", point.latitude, point.longitude)
}

#[derive(Debug, Deserialize)]
struct DistanceMatrixResponse {
    status: String,
    #[serde(default)]
    origin_addresses: Vec<String>,
    #[serde(default)]
    destination_addresses: Vec<String>,
    #[serde(default)]
    rows: Vec<MatrixRow>,
}

#[derive(Debug, Deserialize)]
struct MatrixRow {
    elements: Vec<MatrixElement>,
}

#[derive(Debug, Deserialize)]
struct MatrixElement {
    status: String,
    duration: Option<TextValue>,
    distance: Option<TextValue>,
}

#[derive(Debug, Deserialize)]
struct TextValue {
    text: String,
    value: u64,
}

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    status: String,
    #[serde(default)]
    routes: Vec<DirectionsRoute>,
}

#[derive(Debug, Deserialize)]
struct DirectionsRoute {
    overview_polyline: OverviewPolyline,
}

#[derive(Debug, Deserialize)]
struct OverviewPolyline {
    points: String,
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    formatted_address: String,
}

fn first_element(data: &DistanceMatrixResponse) -> Result<&MatrixElement, LookupError> {
    if data.status != "OK" {
        return Err(LookupError::Service(data.status.clone()));
    }
    data.rows
        .first()
        .and_then(|row| row.elements.first())
        .ok_or_else(|| LookupError::Malformed("empty distance-matrix rows".to_string()))
}

fn parse_distance_matrix(body: &[u8]) -> Result<TravelEstimate, LookupError> {
    let data: DistanceMatrixResponse =
        serde_json::from_slice(body).map_err(|err| LookupError::Malformed(err.to_string()))?;
    let element = first_element(&data)?;
    if element.status != "OK" {
        return Err(LookupError::Service(element.status.clone()));
    }

    let duration = element
        .duration
        .as_ref()
        .ok_or_else(|| LookupError::Malformed("element missing duration".to_string()))?;
    let distance = element
        .distance
        .as_ref()
        .ok_or_else(|| LookupError::Malformed("element missing distance".to_string()))?;

    Ok(TravelEstimate {
        duration_secs: duration.value,
        distance_text: distance.text.clone(),
        origin_address: data.origin_addresses.first().cloned().unwrap_or_default(),
        destination_address: data
            .destination_addresses
            .first()
            .cloned()
            .unwrap_or_default(),
    })
}

fn parse_element_status(body: &[u8]) -> Result<String, LookupError> {
    let data: DistanceMatrixResponse =
        serde_json::from_slice(body).map_err(|err| LookupError::Malformed(err.to_string()))?;
    first_element(&data).map(|element| element.status.clone())
}

fn parse_directions(body: &[u8]) -> Result<Vec<GeoPoint>, LookupError> {
    let data: DirectionsResponse =
        serde_json::from_slice(body).map_err(|err| LookupError::Malformed(err.to_string()))?;
    if data.status != "OK" {
        return Err(LookupError::Service(data.status));
    }
    let route = data
        .routes
        .first()
        .ok_or_else(|| LookupError::Malformed("no routes in response".to_string()))?;
    polyline::decode(&route.overview_polyline.points)
}

fn parse_geocode(body: &[u8]) -> Result<String, LookupError> {
    let data: GeocodeResponse =
        serde_json::from_slice(body).map_err(|err| LookupError::Malformed(err.to_string()))?;
    if data.status != "OK" {
        return Err(LookupError::Service(data.status));
    }
    data.results
        .into_iter()
        .next()
        .map(|result| result.formatted_address)
        .ok_or_else(|| LookupError::Malformed("no geocoding results".to_string()))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_distance_matrix() {
        let body = br#"{
            "status": "OK",
            "origin_addresses": ["Strada Exemplu 1, Bucharest"],
            "destination_addresses": ["Strada Exemplu 2, Ploiesti"],
            "rows": [{
                "elements": [{
                    "status": "OK",
                    "duration": { "text": "22 mins", "value": 1320 },
                    "distance": { "text": "12.4 km", "value": 12400 }
                }]
            }]
        }"#;

        let estimate = parse_distance_matrix(body).unwrap();
        assert_eq!(estimate.duration_secs, 1320);
        assert_eq!(estimate.distance_text, "12.4 km");
        assert_eq!(estimate.origin_address, "Strada Exemplu 1, Bucharest");
        assert_eq!(estimate.destination_address, "Strada Exemplu 2, Ploiesti");
    }

    #[test]
    fn test_parse_distance_matrix_zero_results_element() {
        let body = br#"{
            "status": "OK",
            "origin_addresses": [""],
            "destination_addresses": [""],
            "rows": [{ "elements": [{ "status": "ZERO_RESULTS" }] }]
        }"#;

        let err = parse_distance_matrix(body).unwrap_err();
        assert!(matches!(err, LookupError::Service(status) if status == "ZERO_RESULTS"));
    }

    #[test]
    fn test_parse_distance_matrix_denied() {
        let body = br#"{ "status": "REQUEST_DENIED", "rows": [] }"#;
        let err = parse_distance_matrix(body).unwrap_err();
        assert!(matches!(err, LookupError::Service(status) if status == "REQUEST_DENIED"));
    }

    #[test]
    fn test_parse_distance_matrix_garbage() {
        let err = parse_distance_matrix(b"not json").unwrap_err();
        assert!(matches!(err, LookupError::Malformed(_)));
    }

    #[test]
    fn test_parse_element_status_reports_zero_results() {
        let body = br#"{
            "status": "OK",
            "rows": [{ "elements": [{ "status": "ZERO_RESULTS" }] }]
        }"#;
        assert_eq!(parse_element_status(body).unwrap(), "ZERO_RESULTS");
    }

    #[test]
    fn test_parse_directions_decodes_overview_polyline() {
        let body = br#"{
            "status": "OK",
            "routes": [{
                "overview_polyline": { "points": "_p~iF~ps|U_ulLnnqC_mqNvxq`@" }
            }]
        }"#;

        let path = parse_directions(body).unwrap();
        assert_eq!(path.len(), 3);
        assert!((path[0].latitude - 38.5).abs() < 1e-9);
        assert!((path[2].longitude + 126.453).abs() < 1e-9);
    }

    #[test]
    fn test_parse_directions_no_routes() {
        let body = br#"{ "status": "ZERO_RESULTS", "routes": [] }"#;
        let err = parse_directions(body).unwrap_err();
        assert!(matches!(err, LookupError::Service(status) if status == "ZERO_RESULTS"));
    }

    #[test]
    fn test_parse_geocode_takes_first_result() {
        let body = br#"{
            "status": "OK",
            "results": [
                { "formatted_address": "Bulevardul Unirii 1, Bucharest" },
                { "formatted_address": "Sector 3, Bucharest" }
            ]
        }"#;

        assert_eq!(
            parse_geocode(body).unwrap(),
            "Bulevardul Unirii 1, Bucharest"
        );
    }

    #[test]
    fn test_parse_geocode_empty_results() {
        let body = br#"{ "status": "OK", "results": [] }"#;
        let err = parse_geocode(body).unwrap_err();
        assert!(matches!(err, LookupError::Malformed(_)));
    }

    #[test]
    fn test_distance_matrix_url_shape() {
        let client = GoogleMapsClient::new(MapsConfig::new("test-key")).unwrap();
        let url = client.distance_matrix_url(
            GeoPoint::new(44.43, 26.10),
            GeoPoint::new(44.50, 26.20),
        );

        assert!(url.starts_with("https://maps.googleapis.com/maps/api/distancematrix/json?"));
        assert!(url.contains("units=metric"));
        assert!(url.contains("origins=44.43,26.1"));
        assert!(url.contains("destinations=44.5,26.2"));
        assert!(url.contains("language=en"));
        assert!(url.contains("key=test-key"));
    }
}
