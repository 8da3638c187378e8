//! Map data sources supplying raw OpenStreetMap walk networks.
//!
//! The routing core never talks to OpenStreetMap directly. It asks a
//! [`MapSource`] for the ways around a point and receives a [`RawNetwork`]:
//! plain node coordinates plus ways with their tags. Two implementations ship
//! with the library:
//!
//! - [`OverpassSource`] queries an Overpass API endpoint over HTTP with a
//!   bounded timeout.
//! - [`FileSource`] reads an Overpass JSON document from disk. The CLI and the
//!   integration tests use it through the `STEPFREE_MAP_SOURCE` override.
//!
//! A [`RawNetwork`] is itself a source, which keeps unit tests free of I/O.

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::RouterConfig;
use crate::error::{Error, Result};
use crate::geo::GeoPoint;
use crate::graph::NodeId;

/// Environment variable pointing at a local Overpass JSON file to use instead
/// of the network.
pub const MAP_SOURCE_ENV: &str = "STEPFREE_MAP_SOURCE";

/// `highway` values that never carry pedestrians.
const EXCLUDED_HIGHWAYS: &[&str] = &[
    "abandoned",
    "bus_guideway",
    "construction",
    "corridor",
    "cycleway",
    "elevator",
    "escalator",
    "motor",
    "motorway",
    "motorway_link",
    "trunk",
    "trunk_link",
    "no",
    "planned",
    "platform",
    "proposed",
    "raceway",
    "razed",
];

/// Supplier of raw walkable-network data for a circular area.
pub trait MapSource: Send + Sync {
    /// Fetch every way that may be walkable within `radius_m` metres of
    /// `center`, together with the nodes those ways reference.
    ///
    /// Implementations may return more than the requested area; the graph
    /// builder clips to the disk.
    fn fetch(&self, center: GeoPoint, radius_m: f64) -> Result<RawNetwork>;

    /// Short label for log output.
    fn describe(&self) -> String;
}

/// Node as delivered by the data source.
#[derive(Debug, Clone, PartialEq)]
pub struct RawNode {
    pub id: NodeId,
    pub location: GeoPoint,
}

/// Way as delivered by the data source.
#[derive(Debug, Clone, PartialEq)]
pub struct RawWay {
    pub id: i64,
    pub nodes: Vec<NodeId>,
    pub tags: BTreeMap<String, String>,
}

impl RawWay {
    /// Value of the `highway` tag, if any.
    pub fn highway(&self) -> Option<&str> {
        self.tags.get("highway").map(String::as_str)
    }

    /// Whether a pedestrian may use this way.
    pub fn is_walkable(&self) -> bool {
        is_walkable(&self.tags)
    }
}

/// Unprocessed street network: node coordinates and tagged ways.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawNetwork {
    pub nodes: Vec<RawNode>,
    pub ways: Vec<RawWay>,
}

impl RawNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node (builder style).
    pub fn with_node(mut self, id: NodeId, lat: f64, lon: f64) -> Self {
        self.nodes.push(RawNode {
            id,
            location: GeoPoint { lat, lon },
        });
        self
    }

    /// Add a way tagged with the given `highway` value (builder style).
    pub fn with_way(mut self, id: i64, nodes: &[NodeId], highway: &str) -> Self {
        let mut tags = BTreeMap::new();
        tags.insert("highway".to_string(), highway.to_string());
        self.ways.push(RawWay {
            id,
            nodes: nodes.to_vec(),
            tags,
        });
        self
    }

    /// Decode an Overpass API JSON document (`[out:json]`).
    ///
    /// Nodes must carry both `lat` and `lon`; anything else is rejected as
    /// invalid input rather than silently defaulted.
    pub fn from_overpass_json(bytes: &[u8]) -> Result<Self> {
        let document: OverpassDocument = serde_json::from_slice(bytes)?;
        let mut network = RawNetwork::new();

        for element in document.elements {
            match element {
                OverpassElement::Node { id, lat, lon } => {
                    let (Some(lat), Some(lon)) = (lat, lon) else {
                        return Err(Error::invalid(format!("node {id} is missing lat/lon")));
                    };
                    network.nodes.push(RawNode {
                        id,
                        location: GeoPoint::new(lat, lon)?,
                    });
                }
                OverpassElement::Way { id, nodes, tags } => {
                    network.ways.push(RawWay { id, nodes, tags });
                }
                OverpassElement::Other => {}
            }
        }

        Ok(network)
    }
}

impl MapSource for RawNetwork {
    fn fetch(&self, _center: GeoPoint, _radius_m: f64) -> Result<RawNetwork> {
        Ok(self.clone())
    }

    fn describe(&self) -> String {
        format!(
            "in-memory network ({} nodes, {} ways)",
            self.nodes.len(),
            self.ways.len()
        )
    }
}

#[derive(Debug, Deserialize)]
struct OverpassDocument {
    #[serde(default)]
    elements: Vec<OverpassElement>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum OverpassElement {
    Node {
        id: NodeId,
        lat: Option<f64>,
        lon: Option<f64>,
    },
    Way {
        id: i64,
        #[serde(default)]
        nodes: Vec<NodeId>,
        #[serde(default)]
        tags: BTreeMap<String, String>,
    },
    #[serde(other)]
    Other,
}

/// Whether a set of OSM way tags describes something a pedestrian may use.
pub fn is_walkable(tags: &BTreeMap<String, String>) -> bool {
    let Some(highway) = tags.get("highway") else {
        return false;
    };
    if EXCLUDED_HIGHWAYS.contains(&highway.as_str()) {
        return false;
    }
    if tags.get("area").is_some_and(|v| v == "yes") {
        return false;
    }
    if tags
        .get("foot")
        .is_some_and(|v| v == "no" || v == "private")
    {
        return false;
    }
    if tags.get("service").is_some_and(|v| v == "private") {
        return false;
    }
    true
}

/// Overpass QL query selecting walkable ways around a point.
pub fn overpass_query(center: GeoPoint, radius_m: f64, timeout: Duration) -> String {
    let excluded = EXCLUDED_HIGHWAYS.join("|");
    format!(
        "[out:json][timeout:{timeout}];\
         (way[\"highway\"][\"area\"!~\"yes\"][\"highway\"!~\"^({excluded})$\"]\
         [\"foot\"!~\"^(no|private)$\"][\"service\"!~\"private\"]\
         (around:{radius:.0},{lat:.7},{lon:.7}););\
         (._;>;);out;",
        timeout = timeout.as_secs().max(1),
        radius = radius_m.ceil(),
        lat = center.lat,
        lon = center.lon,
    )
}

/// Map source backed by an Overpass API endpoint.
#[derive(Debug, Clone)]
pub struct OverpassSource {
    endpoint: String,
    timeout: Duration,
    client: Client,
}

impl OverpassSource {
    /// Create a source for `endpoint` whose requests give up after `timeout`.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent())
            .build()
            .map_err(Error::Http)?;
        Ok(Self {
            endpoint: endpoint.into(),
            timeout,
            client,
        })
    }

    pub fn from_config(config: &RouterConfig) -> Result<Self> {
        Self::new(config.overpass_url.clone(), config.fetch_timeout)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl MapSource for OverpassSource {
    fn fetch(&self, center: GeoPoint, radius_m: f64) -> Result<RawNetwork> {
        let query = overpass_query(center, radius_m, self.timeout);
        debug!(endpoint = %self.endpoint, %center, radius_m, "querying overpass");

        let response = self
            .client
            .post(&self.endpoint)
            .form(&[("data", query.as_str())])
            .send()
            .map_err(|err| Error::unavailable(format!("overpass request failed: {err}")))?;
        let response = response
            .error_for_status()
            .map_err(|err| Error::unavailable(format!("overpass returned an error: {err}")))?;
        let bytes = response.bytes()?;

        let network = RawNetwork::from_overpass_json(&bytes)?;
        info!(
            nodes = network.nodes.len(),
            ways = network.ways.len(),
            "fetched walk network from overpass"
        );
        Ok(network)
    }

    fn describe(&self) -> String {
        format!("overpass ({})", self.endpoint)
    }
}

/// Map source reading an Overpass JSON document from disk.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MapSource for FileSource {
    fn fetch(&self, _center: GeoPoint, _radius_m: f64) -> Result<RawNetwork> {
        let bytes = fs::read(&self.path).map_err(|err| {
            Error::unavailable(format!("cannot read {}: {err}", self.path.display()))
        })?;
        debug!(path = %self.path.display(), bytes = bytes.len(), "loaded map file");
        RawNetwork::from_overpass_json(&bytes)
    }

    fn describe(&self) -> String {
        format!("file ({})", self.path.display())
    }
}

/// Resolve the map source for this process.
///
/// Honors the `STEPFREE_MAP_SOURCE` override (a local Overpass JSON file) and
/// otherwise talks to the Overpass endpoint configured in `config`.
pub fn source_from_env(config: &RouterConfig) -> Result<Box<dyn MapSource>> {
    if let Some(path) = env::var_os(MAP_SOURCE_ENV) {
        let path = PathBuf::from(path);
        info!(path = %path.display(), "using local map source override");
        return Ok(Box::new(FileSource::new(path)));
    }
    Ok(Box::new(OverpassSource::from_config(config)?))
}

fn user_agent() -> String {
    format!(
        "stepfree-lib/{version} (stair-aware pedestrian routing)",
        version = env!("CARGO_PKG_VERSION"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn walk_filter_keeps_foot_infrastructure() {
        assert!(is_walkable(&tags(&[("highway", "footway")])));
        assert!(is_walkable(&tags(&[("highway", "steps")])));
        assert!(is_walkable(&tags(&[("highway", "residential")])));
    }

    #[test]
    fn walk_filter_drops_vehicle_only_and_private_ways() {
        assert!(!is_walkable(&tags(&[("highway", "motorway")])));
        assert!(!is_walkable(&tags(&[("highway", "cycleway")])));
        assert!(!is_walkable(&tags(&[("highway", "path"), ("foot", "no")])));
        assert!(!is_walkable(&tags(&[("highway", "service"), ("service", "private")])));
        assert!(!is_walkable(&tags(&[("highway", "pedestrian"), ("area", "yes")])));
        assert!(!is_walkable(&tags(&[("building", "yes")])));
    }

    #[test]
    fn decodes_overpass_elements() {
        let json = br#"{
            "version": 0.6,
            "elements": [
                {"type": "node", "id": 1, "lat": 37.0, "lon": 127.0},
                {"type": "node", "id": 2, "lat": 37.001, "lon": 127.0},
                {"type": "way", "id": 10, "nodes": [1, 2], "tags": {"highway": "steps"}},
                {"type": "relation", "id": 99, "members": []}
            ]
        }"#;
        let network = RawNetwork::from_overpass_json(json).unwrap();
        assert_eq!(network.nodes.len(), 2);
        assert_eq!(network.ways.len(), 1);
        assert_eq!(network.ways[0].highway(), Some("steps"));
    }

    #[test]
    fn node_without_coordinates_is_invalid_input() {
        let json = br#"{"elements": [{"type": "node", "id": 1}]}"#;
        let err = RawNetwork::from_overpass_json(json).unwrap_err();
        assert!(matches!(err, Error::InvalidInput { .. }));
    }

    #[test]
    fn missing_file_is_data_unavailable() {
        let source = FileSource::new("/definitely/not/here.json");
        let err = source
            .fetch(GeoPoint { lat: 0.0, lon: 0.0 }, 100.0)
            .unwrap_err();
        assert!(matches!(err, Error::DataUnavailable { .. }));
    }

    #[test]
    fn query_embeds_center_radius_and_timeout() {
        let query = overpass_query(
            GeoPoint {
                lat: 37.5,
                lon: 127.25,
            },
            1000.0,
            Duration::from_secs(30),
        );
        assert!(query.starts_with("[out:json][timeout:30];"));
        assert!(query.contains("around:1000,37.5000000,127.2500000"));
        assert!(query.contains("cycleway"));
    }
}
