//! Trip statistics for a solved node path.
//!
//! Distance is measured along the returned polyline (haversine between
//! consecutive node coordinates), not by summing stored edge lengths. Edges
//! that bend between their endpoints are therefore counted as straight lines,
//! so the reported distance can undercount curvy routes. Duration estimates
//! are derived from this distance.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result, RouteFailure};
use crate::geo::{polyline_length_km, GeoPoint};
use crate::graph::{NodeId, WalkGraph};
use crate::stairs::RoutePolicy;

/// Typical adult walking speed in km/h.
pub const GENERAL_WALKING_KMH: f64 = 4.5;

/// Walking speed for elderly or mobility-impaired pedestrians in km/h.
pub const SLOW_WALKING_KMH: f64 = 2.5;

/// Walking speed profile used to estimate durations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WalkingSpeed {
    #[default]
    General,
    Slow,
    Custom(f64),
}

impl WalkingSpeed {
    pub fn kmh(&self) -> f64 {
        match self {
            WalkingSpeed::General => GENERAL_WALKING_KMH,
            WalkingSpeed::Slow => SLOW_WALKING_KMH,
            WalkingSpeed::Custom(kmh) => *kmh,
        }
    }
}

impl fmt::Display for WalkingSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WalkingSpeed::General => write!(f, "general ({GENERAL_WALKING_KMH} km/h)"),
            WalkingSpeed::Slow => write!(f, "slow ({SLOW_WALKING_KMH} km/h)"),
            WalkingSpeed::Custom(kmh) => write!(f, "{kmh} km/h"),
        }
    }
}

impl FromStr for WalkingSpeed {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "general" | "normal" => Ok(WalkingSpeed::General),
            "slow" | "elderly" => Ok(WalkingSpeed::Slow),
            other => {
                let kmh = other
                    .parse::<f64>()
                    .map_err(|_| Error::invalid(format!("unknown walking speed '{s}'")))?;
                validate_speed(kmh)?;
                Ok(WalkingSpeed::Custom(kmh))
            }
        }
    }
}

pub(crate) fn validate_speed(speed_kmh: f64) -> Result<()> {
    if !speed_kmh.is_finite() || speed_kmh <= 0.0 {
        return Err(Error::invalid(format!(
            "walking speed must be a positive number of km/h, got {speed_kmh}"
        )));
    }
    Ok(())
}

/// Outcome of a route request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "failure", rename_all = "snake_case")]
pub enum RouteStatus {
    Ok,
    Failed(RouteFailure),
}

/// Route geometry and trip statistics for one policy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteResult {
    pub policy: RoutePolicy,
    /// Graph nodes visited, in order. Empty for failures and for routes that
    /// never touched the graph.
    pub nodes: Vec<NodeId>,
    pub polyline: Vec<GeoPoint>,
    pub distance_km: f64,
    pub duration_min: f64,
    /// Staircase edges traversed by the route.
    pub staircases: usize,
    pub status: RouteStatus,
}

impl RouteResult {
    /// Result for a request whose origin and destination coincide.
    pub fn stationary(policy: RoutePolicy, point: GeoPoint) -> Self {
        Self {
            policy,
            nodes: Vec::new(),
            polyline: vec![point],
            distance_km: 0.0,
            duration_min: 0.0,
            staircases: 0,
            status: RouteStatus::Ok,
        }
    }

    pub fn failed(policy: RoutePolicy, failure: RouteFailure) -> Self {
        Self {
            policy,
            nodes: Vec::new(),
            polyline: Vec::new(),
            distance_km: 0.0,
            duration_min: 0.0,
            staircases: 0,
            status: RouteStatus::Failed(failure),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == RouteStatus::Ok
    }

    pub fn failure(&self) -> Option<&RouteFailure> {
        match &self.status {
            RouteStatus::Ok => None,
            RouteStatus::Failed(failure) => Some(failure),
        }
    }
}

/// Turn a node path into a [`RouteResult`].
///
/// Each node maps to its coordinate; distance is the haversine length of the
/// resulting polyline and duration is `distance_km / speed_kmh * 60` minutes.
pub fn evaluate(
    graph: &WalkGraph,
    path: &[NodeId],
    speed_kmh: f64,
    policy: RoutePolicy,
) -> Result<RouteResult> {
    validate_speed(speed_kmh)?;
    if path.is_empty() {
        return Err(Error::invalid("cannot evaluate an empty path"));
    }

    let polyline = path
        .iter()
        .map(|&node| {
            graph
                .location(node)
                .ok_or_else(|| Error::invalid(format!("node {node} is not part of the graph")))
        })
        .collect::<Result<Vec<GeoPoint>>>()?;

    let staircases = path
        .windows(2)
        .filter_map(|pair| graph.edge_between(pair[0], pair[1]))
        .filter(|edge| edge.is_staircase())
        .count();

    let distance_km = polyline_length_km(&polyline);
    Ok(RouteResult {
        policy,
        nodes: path.to_vec(),
        polyline,
        distance_km,
        duration_min: duration_minutes(distance_km, speed_kmh),
        staircases,
        status: RouteStatus::Ok,
    })
}

/// Minutes needed to walk `distance_km` at `speed_kmh`.
pub fn duration_minutes(distance_km: f64, speed_kmh: f64) -> f64 {
    distance_km / speed_kmh * 60.0
}
