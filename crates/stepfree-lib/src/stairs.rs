//! Route policies and staircase handling.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::geo::GeoPoint;
use crate::graph::{EdgeKey, NodeId, WalkGraph};

/// Whether staircase edges may be used.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum RoutePolicy {
    #[default]
    AllowStairs,
    AvoidStairs,
}

impl RoutePolicy {
    pub const ALL: [RoutePolicy; 2] = [RoutePolicy::AllowStairs, RoutePolicy::AvoidStairs];
}

impl fmt::Display for RoutePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            RoutePolicy::AllowStairs => "allow-stairs",
            RoutePolicy::AvoidStairs => "avoid-stairs",
        };
        f.write_str(value)
    }
}

impl FromStr for RoutePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "allow" | "allow-stairs" | "allow_stairs" => Ok(RoutePolicy::AllowStairs),
            "avoid" | "avoid-stairs" | "avoid_stairs" | "step-free" => {
                Ok(RoutePolicy::AvoidStairs)
            }
            other => Err(Error::invalid(format!("unknown route policy '{other}'"))),
        }
    }
}

/// Produce the routable graph for `policy`.
///
/// The input graph is left untouched: the result is an independent instance
/// with its own edge list. Under [`RoutePolicy::AvoidStairs`] every staircase
/// edge is dropped while the node set stays identical, even for nodes that
/// lose all of their edges.
pub fn apply_policy(graph: &WalkGraph, policy: RoutePolicy) -> WalkGraph {
    match policy {
        RoutePolicy::AllowStairs => graph.clone(),
        RoutePolicy::AvoidStairs => graph.retain_edges(|edge| !edge.is_staircase()),
    }
}

/// Staircase edge located for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Staircase {
    pub source: NodeId,
    pub target: NodeId,
    pub key: EdgeKey,
    /// Mean of the endpoint coordinates.
    pub midpoint: GeoPoint,
    pub length_m: f64,
}

/// Every staircase edge in `graph`, in edge order.
pub fn staircases(graph: &WalkGraph) -> Vec<Staircase> {
    graph
        .edges()
        .iter()
        .filter(|edge| edge.is_staircase())
        .filter_map(|edge| {
            let a = graph.location(edge.source)?;
            let b = graph.location(edge.target)?;
            Some(Staircase {
                source: edge.source,
                target: edge.target,
                key: edge.key,
                midpoint: a.midpoint(&b),
                length_m: edge.length_m,
            })
        })
        .collect()
}
