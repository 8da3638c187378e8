//! Route orchestration.
//!
//! This module ties the pipeline together:
//! - [`RouteRequest`] - origin, destination, search radius, policy and speed
//! - [`route`] - build, filter, snap, solve and evaluate a single policy
//! - [`route_both_policies`] - one graph build shared by both policies
//! - [`Router`] - owns a map source, configuration and result cache
//! - [`RoutingSession`] - caller-held origin/destination and last results
//!
//! None of the entry points return `Err`: every failure is folded into a
//! [`RouteResult`] carrying a [`RouteFailure`].

mod session;

pub use session::RoutingSession;

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cache::{RouteCache, RouteCacheKey};
use crate::config::{RouterConfig, DEFAULT_RADIUS_M};
use crate::error::{Result, RouteFailure};
use crate::evaluate::{evaluate, validate_speed, RouteResult, GENERAL_WALKING_KMH};
use crate::geo::GeoPoint;
use crate::graph::{build_walk_graph, validate_radius, WalkGraph};
use crate::path::shortest_path;
use crate::source::{source_from_env, MapSource};
use crate::spatial::NodeIndex;
use crate::stairs::{apply_policy, RoutePolicy};

/// Parameters of a single-policy route request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RouteRequest {
    pub origin: GeoPoint,
    pub destination: GeoPoint,
    /// Radius of the map area fetched around the origin.
    pub radius_m: f64,
    pub policy: RoutePolicy,
    pub speed_kmh: f64,
}

impl RouteRequest {
    /// Request with the default radius, stairs allowed and general walking
    /// speed.
    pub fn new(origin: GeoPoint, destination: GeoPoint) -> Self {
        Self {
            origin,
            destination,
            radius_m: DEFAULT_RADIUS_M,
            policy: RoutePolicy::default(),
            speed_kmh: GENERAL_WALKING_KMH,
        }
    }

    pub fn with_radius(mut self, radius_m: f64) -> Self {
        self.radius_m = radius_m;
        self
    }

    pub fn with_policy(mut self, policy: RoutePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_speed(mut self, speed_kmh: f64) -> Self {
        self.speed_kmh = speed_kmh;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.origin.validate()?;
        self.destination.validate()?;
        validate_radius(self.radius_m)?;
        validate_speed(self.speed_kmh)
    }

    fn cache_key(&self) -> RouteCacheKey {
        RouteCacheKey::new(
            self.origin,
            self.destination,
            self.radius_m,
            self.policy,
            self.speed_kmh,
        )
    }
}

/// Results of routing the same trip under both policies.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PolicyComparison {
    pub allow_stairs: RouteResult,
    pub avoid_stairs: RouteResult,
}

impl PolicyComparison {
    pub fn get(&self, policy: RoutePolicy) -> &RouteResult {
        match policy {
            RoutePolicy::AllowStairs => &self.allow_stairs,
            RoutePolicy::AvoidStairs => &self.avoid_stairs,
        }
    }

    /// Reachable with stairs, unreachable without them.
    pub fn step_free_unavailable(&self) -> bool {
        self.allow_stairs.is_ok() && self.avoid_stairs.failure() == Some(&RouteFailure::NoPath)
    }

    /// Extra walking distance the step-free route costs, when both succeeded.
    pub fn step_free_detour_km(&self) -> Option<f64> {
        (self.allow_stairs.is_ok() && self.avoid_stairs.is_ok())
            .then(|| self.avoid_stairs.distance_km - self.allow_stairs.distance_km)
    }

    pub fn into_results(self) -> [RouteResult; 2] {
        [self.allow_stairs, self.avoid_stairs]
    }
}

// =============================================================================
// Stateless entry points
// =============================================================================

/// Compute a route for one policy.
///
/// The walk graph is built around the origin. Both endpoints are snapped to
/// their nearest graph node, so a destination slightly outside the radius is
/// still routed to the closest node inside it.
pub fn route(source: &dyn MapSource, request: &RouteRequest) -> RouteResult {
    let outcome = request.validate().and_then(|()| {
        if request.origin == request.destination {
            return Ok(RouteResult::stationary(request.policy, request.origin));
        }
        let graph = build_walk_graph(source, request.origin, request.radius_m)?;
        let index = NodeIndex::build(&graph);
        solve(&graph, &index, request)
    });
    finish(request.policy, outcome.map_err(|err| err.failure()))
}

/// Compute routes for both policies from a single graph build.
///
/// A failure to obtain or build the graph fails both results with the same
/// reason.
pub fn route_both_policies(
    source: &dyn MapSource,
    origin: GeoPoint,
    destination: GeoPoint,
    radius_m: f64,
    speed_kmh: f64,
) -> PolicyComparison {
    let base = RouteRequest::new(origin, destination)
        .with_radius(radius_m)
        .with_speed(speed_kmh);

    let shared = base
        .validate()
        .and_then(|()| {
            if origin == destination {
                return Ok(None);
            }
            let graph = build_walk_graph(source, origin, radius_m)?;
            let index = NodeIndex::build(&graph);
            Ok(Some((graph, index)))
        })
        .map_err(|err| err.failure());

    let solve_for = |policy: RoutePolicy| {
        let request = base.with_policy(policy);
        let outcome = match &shared {
            Ok(None) => Ok(RouteResult::stationary(policy, origin)),
            Ok(Some((graph, index))) => {
                solve(graph, index, &request).map_err(|err| err.failure())
            }
            Err(failure) => Err(failure.clone()),
        };
        finish(policy, outcome)
    };

    PolicyComparison {
        allow_stairs: solve_for(RoutePolicy::AllowStairs),
        avoid_stairs: solve_for(RoutePolicy::AvoidStairs),
    }
}

fn solve(graph: &WalkGraph, index: &NodeIndex, request: &RouteRequest) -> Result<RouteResult> {
    let routable = apply_policy(graph, request.policy);
    let (from, origin_offset_m) = index.nearest(request.origin)?;
    let (to, destination_offset_m) = index.nearest(request.destination)?;
    debug!(
        policy = %request.policy,
        from,
        to,
        origin_offset_m,
        destination_offset_m,
        "snapped endpoints"
    );

    let path = shortest_path(&routable, from, to)?;
    evaluate(&routable, &path, request.speed_kmh, request.policy)
}

fn finish(
    policy: RoutePolicy,
    outcome: std::result::Result<RouteResult, RouteFailure>,
) -> RouteResult {
    match outcome {
        Ok(result) => {
            info!(
                %policy,
                distance_km = result.distance_km,
                duration_min = result.duration_min,
                staircases = result.staircases,
                "route computed"
            );
            result
        }
        Err(failure) => {
            warn!(%policy, %failure, "route failed");
            RouteResult::failed(policy, failure)
        }
    }
}

fn is_cacheable(result: &RouteResult) -> bool {
    match result.failure() {
        None => true,
        Some(failure) => failure.is_deterministic(),
    }
}

// =============================================================================
// Router
// =============================================================================

/// Routing front end owning a map source and a result cache.
///
/// Cache misses always recompute the whole request. Two threads missing on
/// the same key both compute and the later insert wins.
pub struct Router {
    source: Box<dyn MapSource>,
    config: RouterConfig,
    cache: RouteCache,
}

impl Router {
    pub fn new(source: Box<dyn MapSource>, config: RouterConfig) -> Self {
        let cache = RouteCache::new(config.cache_capacity, config.cache_ttl);
        Self {
            source,
            config,
            cache,
        }
    }

    /// Router configured from the environment, see [`RouterConfig::from_env`]
    /// and [`source_from_env`].
    pub fn from_env() -> Result<Self> {
        let config = RouterConfig::from_env();
        let source = source_from_env(&config)?;
        Ok(Self::new(source, config))
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn cache(&self) -> &RouteCache {
        &self.cache
    }

    pub fn source(&self) -> &dyn MapSource {
        self.source.as_ref()
    }

    /// Request between two points using the configured radius and speed.
    pub fn request(&self, origin: GeoPoint, destination: GeoPoint) -> RouteRequest {
        RouteRequest::new(origin, destination)
            .with_radius(self.config.default_radius_m)
            .with_speed(self.config.speed.kmh())
    }

    pub fn route(&self, request: &RouteRequest) -> Arc<RouteResult> {
        let key = request.cache_key();
        if let Some(hit) = self.cache.get(&key) {
            debug!(policy = %request.policy, "route cache hit");
            return hit;
        }

        let result = Arc::new(route(self.source.as_ref(), request));
        if is_cacheable(&result) {
            self.cache.insert(key, Arc::clone(&result));
        }
        result
    }

    pub fn route_both_policies(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
        radius_m: f64,
        speed_kmh: f64,
    ) -> PolicyComparison {
        let base = RouteRequest::new(origin, destination)
            .with_radius(radius_m)
            .with_speed(speed_kmh);
        let allow_key = base.with_policy(RoutePolicy::AllowStairs).cache_key();
        let avoid_key = base.with_policy(RoutePolicy::AvoidStairs).cache_key();

        if let (Some(allow), Some(avoid)) = (self.cache.get(&allow_key), self.cache.get(&avoid_key))
        {
            debug!("route cache hit for both policies");
            return PolicyComparison {
                allow_stairs: RouteResult::clone(&allow),
                avoid_stairs: RouteResult::clone(&avoid),
            };
        }

        let comparison =
            route_both_policies(self.source.as_ref(), origin, destination, radius_m, speed_kmh);
        for (key, result) in [
            (allow_key, &comparison.allow_stairs),
            (avoid_key, &comparison.avoid_stairs),
        ] {
            if is_cacheable(result) {
                self.cache.insert(key, Arc::new(result.clone()));
            }
        }
        comparison
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("source", &self.source.describe())
            .field("config", &self.config)
            .field("cached", &self.cache.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::error::Error;
    use crate::evaluate::RouteStatus;
    use crate::geo::haversine_km;
    use crate::source::RawNetwork;

    fn point(lat: f64, lon: f64) -> GeoPoint {
        GeoPoint::new(lat, lon).unwrap()
    }

    /// Nodes 1:(0,0), 2:(0,1), 3:(1,1); 1-2 footway, 2-3 steps.
    fn stair_line() -> RawNetwork {
        RawNetwork::new()
            .with_node(1, 0.0, 0.0)
            .with_node(2, 0.0, 1.0)
            .with_node(3, 1.0, 1.0)
            .with_way(10, &[1, 2], "footway")
            .with_way(11, &[2, 3], "steps")
    }

    /// Short footway with a staircase shortcut and a longer ramp detour.
    ///
    /// ```text
    ///   1 --footway-- 2 ==steps== 3 --footway-- 4
    ///                 \                         /
    ///                  5 ------ramp------------6
    /// ```
    ///
    /// Node 7 hangs off node 4 so the detour does not collapse into it.
    fn campus() -> RawNetwork {
        RawNetwork::new()
            .with_node(1, 37.0000, 127.0000)
            .with_node(2, 37.0000, 127.0010)
            .with_node(3, 37.0000, 127.0015)
            .with_node(4, 37.0000, 127.0025)
            .with_node(5, 36.9995, 127.0012)
            .with_node(6, 36.9995, 127.0022)
            .with_way(20, &[1, 2], "footway")
            .with_way(21, &[2, 3], "steps")
            .with_way(22, &[3, 4], "footway")
            .with_way(23, &[2, 5], "path")
            .with_way(24, &[5, 6, 4], "footway")
            .with_way(25, &[4, 7], "footway")
            .with_node(7, 37.0005, 127.0025)
    }

    struct CountingSource {
        network: RawNetwork,
        calls: AtomicUsize,
    }

    impl CountingSource {
        fn new(network: RawNetwork) -> Self {
            Self {
                network,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl MapSource for CountingSource {
        fn fetch(&self, center: GeoPoint, radius_m: f64) -> Result<RawNetwork> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.network.fetch(center, radius_m)
        }

        fn describe(&self) -> String {
            "counting".into()
        }
    }

    impl MapSource for Arc<CountingSource> {
        fn fetch(&self, center: GeoPoint, radius_m: f64) -> Result<RawNetwork> {
            self.as_ref().fetch(center, radius_m)
        }

        fn describe(&self) -> String {
            self.as_ref().describe()
        }
    }

    struct Unreachable;

    impl MapSource for Unreachable {
        fn fetch(&self, _center: GeoPoint, _radius_m: f64) -> Result<RawNetwork> {
            Err(Error::unavailable("connection refused"))
        }

        fn describe(&self) -> String {
            "unreachable".into()
        }
    }

    #[test]
    fn same_origin_and_destination_is_stationary() {
        let source = CountingSource::new(campus());
        let request = RouteRequest::new(point(37.0, 127.0), point(37.0, 127.0));
        let result = route(&source, &request);

        assert_eq!(result.status, RouteStatus::Ok);
        assert_eq!(result.polyline, vec![point(37.0, 127.0)]);
        assert_eq!(result.distance_km, 0.0);
        assert_eq!(result.duration_min, 0.0);
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn stairs_only_connection_fails_step_free() {
        let source = stair_line();
        let origin = point(0.0, 0.0);
        let destination = point(1.0, 1.0);
        let request = RouteRequest::new(origin, destination).with_radius(200_000.0);

        let allowed = route(&source, &request);
        assert!(allowed.is_ok());
        assert_eq!(allowed.nodes, vec![1, 2, 3]);
        let corner = point(0.0, 1.0);
        let expected = haversine_km(origin, corner) + haversine_km(corner, destination);
        assert!((allowed.distance_km - expected).abs() < 1e-9);
        assert_eq!(allowed.staircases, 1);

        let avoided = route(&source, &request.with_policy(RoutePolicy::AvoidStairs));
        assert_eq!(avoided.failure(), Some(&RouteFailure::NoPath));
    }

    #[test]
    fn destination_outside_radius_snaps_to_boundary_node() {
        let source = RawNetwork::new()
            .with_node(1, 37.0, 127.0)
            .with_node(2, 37.0, 127.001)
            .with_node(3, 37.0, 127.002)
            .with_node(4, 37.0, 127.010)
            .with_way(1, &[1, 2, 3, 4], "footway");
        // Radius covers nodes 1-3 only; the destination sits just past node 3.
        let request =
            RouteRequest::new(point(37.0, 127.0), point(37.0, 127.0025)).with_radius(250.0);

        let result = route(&source, &request);
        assert!(result.is_ok(), "{:?}", result.status);
        assert_eq!(result.nodes.first(), Some(&1));
        assert_eq!(result.nodes.last(), Some(&3));
    }

    #[test]
    fn avoiding_stairs_takes_the_detour() {
        let comparison = route_both_policies(
            &campus(),
            point(37.0, 127.0),
            point(37.0, 127.0025),
            1000.0,
            GENERAL_WALKING_KMH,
        );

        assert_eq!(comparison.allow_stairs.staircases, 1);
        assert_eq!(comparison.avoid_stairs.staircases, 0);
        assert!(comparison.avoid_stairs.nodes.contains(&5));
        assert!(!comparison.step_free_unavailable());
        assert!(comparison.step_free_detour_km().unwrap() > 0.0);
    }

    #[test]
    fn both_policies_match_individual_routes() {
        let source = campus();
        let origin = point(37.0, 127.0);
        let destination = point(37.0, 127.0025);
        let comparison = route_both_policies(&source, origin, destination, 1000.0, 4.5);

        for policy in RoutePolicy::ALL {
            let single = route(
                &source,
                &RouteRequest::new(origin, destination)
                    .with_radius(1000.0)
                    .with_policy(policy),
            );
            assert_eq!(comparison.get(policy), &single);
        }
    }

    #[test]
    fn both_policies_fetch_once() {
        let source = CountingSource::new(campus());
        route_both_policies(&source, point(37.0, 127.0), point(37.0, 127.0025), 1000.0, 4.5);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn step_free_unavailable_is_reported() {
        let comparison =
            route_both_policies(&stair_line(), point(0.0, 0.0), point(1.0, 1.0), 200_000.0, 4.5);
        assert!(comparison.step_free_unavailable());
        assert_eq!(comparison.step_free_detour_km(), None);
    }

    #[test]
    fn data_failure_fails_both_policies() {
        let comparison =
            route_both_policies(&Unreachable, point(37.0, 127.0), point(37.0, 127.01), 1000.0, 4.5);
        for result in comparison.into_results() {
            assert!(matches!(
                result.failure(),
                Some(RouteFailure::DataUnavailable { .. })
            ));
        }
    }

    #[test]
    fn invalid_inputs_are_reported_not_panicked() {
        let origin = point(37.0, 127.0);
        let cases = [
            RouteRequest::new(GeoPoint { lat: f64::NAN, lon: 0.0 }, origin),
            RouteRequest::new(origin, GeoPoint { lat: 91.0, lon: 0.0 }),
            RouteRequest::new(origin, point(37.01, 127.0)).with_radius(0.0),
            RouteRequest::new(origin, point(37.01, 127.0)).with_speed(-1.0),
        ];
        for request in cases {
            let result = route(&campus(), &request);
            assert!(
                matches!(result.failure(), Some(RouteFailure::InvalidInput { .. })),
                "{request:?}"
            );
        }
    }

    #[test]
    fn routing_is_idempotent() {
        let source = campus();
        let request = RouteRequest::new(point(37.0, 127.0), point(37.0, 127.0025))
            .with_radius(1000.0)
            .with_policy(RoutePolicy::AvoidStairs);
        assert_eq!(route(&source, &request), route(&source, &request));
    }

    #[test]
    fn router_serves_repeat_requests_from_cache() {
        let source = Arc::new(CountingSource::new(campus()));
        let router = Router::new(Box::new(Arc::clone(&source)), RouterConfig::default());
        let request = router
            .request(point(37.0, 127.0), point(37.0, 127.0025))
            .with_radius(1000.0);

        let first = router.route(&request);
        let second = router.route(&request);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);

        router.route_both_policies(request.origin, request.destination, 1000.0, 4.5);
        router.route_both_policies(request.origin, request.destination, 1000.0, 4.5);
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
        assert_eq!(router.cache().len(), 2);
    }

    #[test]
    fn router_does_not_cache_data_failures() {
        let router = Router::new(Box::new(Unreachable), RouterConfig::default());
        let request = router.request(point(37.0, 127.0), point(37.0, 127.01));
        let result = router.route(&request);
        assert!(!result.is_ok());
        assert!(router.cache().is_empty());
    }

    #[test]
    fn router_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Router>();

        let router = Arc::new(Router::new(Box::new(campus()), RouterConfig::default()));
        let request = router
            .request(point(37.0, 127.0), point(37.0, 127.0025))
            .with_radius(1000.0);

        let results: Vec<Arc<RouteResult>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let router = Arc::clone(&router);
                    scope.spawn(move || router.route(&request))
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().expect("routing thread panicked"))
                .collect()
        });

        assert!(results.iter().all(|result| result.is_ok()));
        assert!(results.windows(2).all(|pair| pair[0] == pair[1]));
        assert_eq!(router.cache().len(), 1);
    }

    #[test]
    fn router_caches_no_path() {
        let router = Router::new(Box::new(stair_line()), RouterConfig::default());
        let request = RouteRequest::new(point(0.0, 0.0), point(1.0, 1.0))
            .with_radius(200_000.0)
            .with_policy(RoutePolicy::AvoidStairs);
        router.route(&request);
        assert_eq!(router.cache().len(), 1);
    }
}
