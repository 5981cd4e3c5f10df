//! The two-stage matching filter and its orchestration.
//!
//! Stage 1 ([`passes_coordinate_order`]) costs four travel-duration lookups
//! and rejects candidates whose direction of travel is incompatible with the
//! rider's segment. Stage 2 ([`passes_path_proximity`]) fetches the
//! candidate's actual driving path once and requires both rider endpoints to
//! sit within tolerance of it. Only survivors are reverse-geocoded.
//!
//! [`find_matching_routes`] runs the whole pipeline over a candidate list,
//! evaluating candidates concurrently while keeping the output in candidate
//! order and isolating per-candidate lookup failures.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use futures::stream::{self, StreamExt};
use log::{debug, info, warn};

use crate::error::LookupError;
use crate::geo_utils;
use crate::{CandidateRoute, EnrichedRoute, FilterConfig, GeoPoint, Waypoint};

/// Result of a road-travel lookup between two points.
#[derive(Debug, Clone, PartialEq)]
pub struct TravelEstimate {
    /// Driving duration in seconds.
    pub duration_secs: u64,
    /// Human-readable driving distance, e.g. "12.4 km".
    pub distance_text: String,
    /// Resolved address of the origin.
    pub origin_address: String,
    /// Resolved address of the destination.
    pub destination_address: String,
}

/// Road-network lookups the filter depends on.
///
/// Implemented by [`GoogleMapsClient`](crate::GoogleMapsClient); tests
/// substitute in-memory fakes.
#[async_trait]
pub trait MapsApi {
    /// Driving estimate between two points.
    async fn travel_estimate(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
    ) -> Result<TravelEstimate, LookupError>;

    /// The driving path between two points, as an ordered point sequence.
    async fn road_path(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
    ) -> Result<Vec<GeoPoint>, LookupError>;

    /// Human-readable address of a point.
    async fn reverse_geocode(&self, point: GeoPoint) -> Result<String, LookupError>;
}

/// Source of candidate routes for a given departure.
#[async_trait]
pub trait RouteSource {
    /// Driver routes active around `departure`, in backend order.
    async fn matching_routes(
        &self,
        departure: NaiveDateTime,
    ) -> Result<Vec<CandidateRoute>, LookupError>;
}

// ============================================================================
// Filter Stages
// ============================================================================

/// Stage 1: directional compatibility of the rider's segment with the route.
///
/// Issues four sequential travel-duration lookups. The candidate passes when
/// the rider's pickup is closer in driving time to the route's origin than
/// the rider's drop-off is, and the drop-off is closer to the route's
/// destination than the pickup is - i.e. the rider travels the same way as
/// the driver, not backwards.
pub async fn passes_coordinate_order<M: MapsApi + Sync>(
    maps: &M,
    waypoint: &Waypoint,
    route: &CandidateRoute,
) -> Result<bool, LookupError> {
    let rider_start_to_route_start = maps.travel_estimate(waypoint.start, route.start()).await?;
    let rider_stop_to_route_start = maps.travel_estimate(waypoint.stop, route.start()).await?;
    let rider_start_to_route_stop = maps.travel_estimate(waypoint.start, route.stop()).await?;
    let rider_stop_to_route_stop = maps.travel_estimate(waypoint.stop, route.stop()).await?;

    Ok(rider_start_to_route_start.duration_secs < rider_stop_to_route_start.duration_secs
        && rider_stop_to_route_stop.duration_secs < rider_start_to_route_stop.duration_secs)
}

/// Stage 2: geometric confirmation against the route's actual driving path.
///
/// Fetches the candidate's road path once; both the rider's pickup and
/// drop-off must lie within `tolerance_km` of it (strict comparison).
pub async fn passes_path_proximity<M: MapsApi + Sync>(
    maps: &M,
    waypoint: &Waypoint,
    route: &CandidateRoute,
    tolerance_km: f64,
) -> Result<bool, LookupError> {
    let path = maps.road_path(route.start(), route.stop()).await?;

    Ok(geo_utils::is_point_near_path(&waypoint.start, &path, tolerance_km)
        && geo_utils::is_point_near_path(&waypoint.stop, &path, tolerance_km))
}

// ============================================================================
// Pipeline
// ============================================================================

/// Run the full pipeline: fetch candidates for the waypoint's date, filter
/// each through both stages, and resolve addresses for the survivors.
///
/// Candidates are evaluated independently, up to
/// [`FilterConfig::max_concurrency`] in flight at once; the output preserves
/// the source's candidate order regardless of completion order. A candidate
/// whose lookups fail is excluded and logged without aborting the batch. An
/// empty result is a normal outcome ("no matching route"), not an error;
/// failing to fetch the candidate list itself is an error.
pub async fn find_matching_routes<S, M>(
    source: &S,
    maps: &M,
    waypoint: &Waypoint,
    config: &FilterConfig,
) -> Result<Vec<EnrichedRoute>, LookupError>
where
    S: RouteSource + Sync,
    M: MapsApi + Sync,
{
    let candidates = source.matching_routes(waypoint.start_date).await?;
    let total = candidates.len();
    info!("evaluating {} candidate routes for {}", total, waypoint.start_date);

    // Buffered, not unordered: completion order must not leak into the output.
    let results: Vec<Option<EnrichedRoute>> = stream::iter(candidates)
        .map(|candidate| evaluate_candidate(maps, waypoint, candidate, config))
        .buffered(config.max_concurrency.max(1))
        .collect()
        .await;

    let matched: Vec<EnrichedRoute> = results.into_iter().flatten().collect();
    info!("{}/{} candidate routes matched", matched.len(), total);
    Ok(matched)
}

/// Evaluate one candidate through both stages and enrich it on success.
///
/// Lookup failures exclude the candidate (fail-closed) instead of surfacing.
async fn evaluate_candidate<M: MapsApi + Sync>(
    maps: &M,
    waypoint: &Waypoint,
    candidate: CandidateRoute,
    config: &FilterConfig,
) -> Option<EnrichedRoute> {
    let id = candidate.id;
    let outcome: Result<Option<EnrichedRoute>, LookupError> = async {
        if !passes_coordinate_order(maps, waypoint, &candidate).await? {
            debug!("route {}: direction incompatible with rider segment", id);
            return Ok(None);
        }
        if !passes_path_proximity(maps, waypoint, &candidate, config.tolerance_km).await? {
            debug!("route {}: rider points too far from driving path", id);
            return Ok(None);
        }

        let start_address = maps.reverse_geocode(candidate.start()).await?;
        let stop_address = maps.reverse_geocode(candidate.stop()).await?;
        Ok(Some(EnrichedRoute {
            route: candidate,
            start_address,
            stop_address,
        }))
    }
    .await;

    match outcome {
        Ok(result) => result,
        Err(err) => {
            warn!("route {}: lookup failed, excluding: {}", id, err);
            None
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
