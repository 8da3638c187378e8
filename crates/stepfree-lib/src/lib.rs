//! Stair-aware pedestrian routing library.
//!
//! This crate fetches the walkable OpenStreetMap network around a point,
//! builds a simplified walk graph, optionally removes staircase edges, snaps
//! coordinates to graph nodes and computes shortest walking routes with
//! distance and duration estimates. Higher-level consumers (the CLI, UI
//! front ends) should only depend on the items exported here instead of
//! reimplementing behavior.
//!

#![deny(warnings)]

pub mod amenity;
pub mod cache;
pub mod config;
pub mod error;
pub mod evaluate;
pub mod geo;
pub mod graph;
pub mod path;
pub mod routing;
pub mod source;
pub mod spatial;
pub mod stairs;

pub use amenity::{Amenity, AmenityCatalog, NearbyAmenity};
pub use cache::{RouteCache, RouteCacheKey};
pub use config::RouterConfig;
pub use error::{Error, Result, RouteFailure};
pub use evaluate::{evaluate, RouteResult, RouteStatus, WalkingSpeed};
pub use geo::GeoPoint;
pub use graph::{build_walk_graph, graph_from_network, NodeId, PathKind, WalkEdge, WalkGraph};
pub use path::shortest_path;
pub use routing::{
    route, route_both_policies, PolicyComparison, RouteRequest, Router, RoutingSession,
};
pub use source::{source_from_env, FileSource, MapSource, OverpassSource, RawNetwork};
pub use spatial::{nearest_node, NodeIndex};
pub use stairs::{apply_policy, staircases, RoutePolicy, Staircase};
