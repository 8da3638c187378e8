use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::geo::GeoPoint;
use crate::source::{MapSource, RawNetwork};

/// OpenStreetMap node identifier.
pub type NodeId = i64;

/// Distinguishes parallel edges joining the same pair of nodes.
pub type EdgeKey = u32;

/// Classification of a walk edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PathKind {
    Way,
    Staircase,
}

impl PathKind {
    /// Classify an OSM `highway` value.
    pub fn from_highway(highway: &str) -> Self {
        if highway == "steps" {
            PathKind::Staircase
        } else {
            PathKind::Way
        }
    }
}

/// Undirected edge of the walk graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WalkEdge {
    pub source: NodeId,
    pub target: NodeId,
    pub key: EdgeKey,
    /// Length in metres along the original way geometry.
    pub length_m: f64,
    pub kind: PathKind,
    /// Raw `highway` tag value.
    pub highway: String,
}

impl WalkEdge {
    /// The endpoint opposite `node`, if `node` is an endpoint of this edge.
    pub fn other(&self, node: NodeId) -> Option<NodeId> {
        if self.source == node {
            Some(self.target)
        } else if self.target == node {
            Some(self.source)
        } else {
            None
        }
    }

    pub fn is_staircase(&self) -> bool {
        self.kind == PathKind::Staircase
    }
}

/// Pedestrian network clipped to a bounded area.
///
/// Nodes are kept in ascending id order so every traversal over them is
/// deterministic. The node table is shared between a graph and the policy
/// variants derived from it because it is never mutated; each variant owns
/// its own edge list.
#[derive(Debug, Clone, Default)]
pub struct WalkGraph {
    nodes: Arc<BTreeMap<NodeId, GeoPoint>>,
    edges: Vec<WalkEdge>,
    adjacency: HashMap<NodeId, Vec<usize>>,
}

impl WalkGraph {
    /// Assemble a graph from nodes and edges.
    ///
    /// Every edge endpoint must be a known node and every length must be finite
    /// and non-negative.
    pub fn from_parts(nodes: BTreeMap<NodeId, GeoPoint>, edges: Vec<WalkEdge>) -> Result<Self> {
        Self::with_shared_nodes(Arc::new(nodes), edges)
    }

    pub(crate) fn with_shared_nodes(
        nodes: Arc<BTreeMap<NodeId, GeoPoint>>,
        edges: Vec<WalkEdge>,
    ) -> Result<Self> {
        let mut adjacency: HashMap<NodeId, Vec<usize>> = HashMap::new();
        for (index, edge) in edges.iter().enumerate() {
            for endpoint in [edge.source, edge.target] {
                if !nodes.contains_key(&endpoint) {
                    return Err(Error::invalid(format!(
                        "edge {}-{} references unknown node {endpoint}",
                        edge.source, edge.target
                    )));
                }
            }
            if !edge.length_m.is_finite() || edge.length_m < 0.0 {
                return Err(Error::invalid(format!(
                    "edge {}-{} has invalid length {}",
                    edge.source, edge.target, edge.length_m
                )));
            }
            adjacency.entry(edge.source).or_default().push(index);
            if edge.target != edge.source {
                adjacency.entry(edge.target).or_default().push(index);
            }
        }

        Ok(Self {
            nodes,
            edges,
            adjacency,
        })
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Coordinate of a node.
    pub fn location(&self, node: NodeId) -> Option<GeoPoint> {
        self.nodes.get(&node).copied()
    }

    pub fn contains_node(&self, node: NodeId) -> bool {
        self.nodes.contains_key(&node)
    }

    /// Nodes in ascending id order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, GeoPoint)> + '_ {
        self.nodes.iter().map(|(&id, &point)| (id, point))
    }

    pub fn edges(&self) -> &[WalkEdge] {
        &self.edges
    }

    /// Edges incident to `node` paired with the neighbour they lead to.
    pub fn neighbours(&self, node: NodeId) -> impl Iterator<Item = (NodeId, &WalkEdge)> + '_ {
        self.adjacency
            .get(&node)
            .map(Vec::as_slice)
            .unwrap_or(&[])
            .iter()
            .filter_map(move |&index| {
                let edge = &self.edges[index];
                edge.other(node).map(|next| (next, edge))
            })
    }

    /// Cheapest edge joining `a` and `b`, if any.
    pub fn edge_between(&self, a: NodeId, b: NodeId) -> Option<&WalkEdge> {
        self.neighbours(a)
            .filter(|(next, _)| *next == b)
            .map(|(_, edge)| edge)
            .min_by(|x, y| x.length_m.total_cmp(&y.length_m))
    }

    /// Sum of all edge lengths in metres.
    pub fn total_length_m(&self) -> f64 {
        self.edges.iter().map(|edge| edge.length_m).sum()
    }

    /// Derive a graph with the same node table and a subset of the edges.
    pub(crate) fn retain_edges<F>(&self, mut keep: F) -> Self
    where
        F: FnMut(&WalkEdge) -> bool,
    {
        let edges: Vec<WalkEdge> = self.edges.iter().filter(|e| keep(*e)).cloned().collect();
        let mut adjacency: HashMap<NodeId, Vec<usize>> = HashMap::new();
        for (index, edge) in edges.iter().enumerate() {
            adjacency.entry(edge.source).or_default().push(index);
            if edge.target != edge.source {
                adjacency.entry(edge.target).or_default().push(index);
            }
        }
        Self {
            nodes: Arc::clone(&self.nodes),
            edges,
            adjacency,
        }
    }
}

/// Fetch the walk network around `center` from `source` and build a graph.
pub fn build_walk_graph(
    source: &dyn MapSource,
    center: GeoPoint,
    radius_m: f64,
) -> Result<WalkGraph> {
    center.validate()?;
    validate_radius(radius_m)?;

    let raw = source.fetch(center, radius_m)?;
    let graph = graph_from_network(&raw, center, radius_m)?;

    info!(
        source = %source.describe(),
        %center,
        radius_m,
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "built walk graph"
    );
    Ok(graph)
}

pub(crate) fn validate_radius(radius_m: f64) -> Result<()> {
    if !radius_m.is_finite() || radius_m <= 0.0 {
        return Err(Error::invalid(format!(
            "radius must be a positive number of metres, got {radius_m}"
        )));
    }
    Ok(())
}

/// Segment between two consecutive way nodes, before simplification.
#[derive(Debug, Clone)]
struct Segment {
    a: NodeId,
    b: NodeId,
    length_m: f64,
    kind: PathKind,
    highway: String,
}

/// Turn a raw network into a simplified walk graph clipped to a disk.
///
/// Non-walkable ways are dropped, ways are split into node-to-node segments,
/// nodes farther than `radius_m` from `center` are removed together with their
/// segments, and chains of interior nodes are contracted into single edges
/// whose length is the sum of the segments they replace.
pub fn graph_from_network(raw: &RawNetwork, center: GeoPoint, radius_m: f64) -> Result<WalkGraph> {
    let coordinates: HashMap<NodeId, GeoPoint> = raw
        .nodes
        .iter()
        .map(|node| (node.id, node.location))
        .collect();

    let inside = |id: NodeId| {
        coordinates
            .get(&id)
            .is_some_and(|point| center.distance_m(point) <= radius_m)
    };

    let mut segments = Vec::new();
    let mut skipped = 0usize;
    for way in raw.ways.iter().filter(|way| way.is_walkable()) {
        let highway = way.highway().unwrap_or_default().to_string();
        let kind = PathKind::from_highway(&highway);
        for pair in way.nodes.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            let (Some(pa), Some(pb)) = (coordinates.get(&a), coordinates.get(&b)) else {
                skipped += 1;
                continue;
            };
            if a == b || !inside(a) || !inside(b) {
                continue;
            }
            segments.push(Segment {
                a,
                b,
                length_m: pa.distance_m(pb),
                kind,
                highway: highway.clone(),
            });
        }
    }

    if skipped > 0 {
        debug!(skipped, "skipped way segments referencing unknown nodes");
    }

    if segments.is_empty() {
        return Err(Error::unavailable(format!(
            "no walkable ways within {radius_m:.0} m of {center}"
        )));
    }

    let edges = simplify(&segments);
    let nodes: BTreeMap<NodeId, GeoPoint> = edges
        .iter()
        .flat_map(|edge| [edge.source, edge.target])
        .filter_map(|id| coordinates.get(&id).map(|point| (id, *point)))
        .collect();

    WalkGraph::from_parts(nodes, assign_keys(edges))
}

/// Contract chains of interior nodes.
///
/// A node is interior when it has exactly two distinct neighbours and all of
/// its incident segments share the same highway value. Every other node is an
/// endpoint and survives. Rings made only of interior nodes are anchored at
/// their lowest node id.
fn simplify(segments: &[Segment]) -> Vec<WalkEdge> {
    let mut incident: BTreeMap<NodeId, Vec<usize>> = BTreeMap::new();
    for (index, segment) in segments.iter().enumerate() {
        incident.entry(segment.a).or_default().push(index);
        incident.entry(segment.b).or_default().push(index);
    }

    let mut endpoints: BTreeSet<NodeId> = incident
        .iter()
        .filter(|(node, edges)| !is_interior(**node, edges, segments))
        .map(|(node, _)| *node)
        .collect();

    let mut used = vec![false; segments.len()];
    let mut edges = Vec::new();

    loop {
        for &start in &endpoints {
            for &first in &incident[&start] {
                if used[first] {
                    continue;
                }
                let edge = walk_chain(start, first, segments, &incident, &endpoints, &mut used);
                edges.push(edge);
            }
        }

        // Anything left over forms rings without an endpoint.
        let Some(anchor) = segments
            .iter()
            .enumerate()
            .filter(|(index, _)| !used[*index])
            .map(|(_, segment)| segment.a.min(segment.b))
            .min()
        else {
            break;
        };
        endpoints.insert(anchor);
    }

    edges
}

fn is_interior(node: NodeId, incident: &[usize], segments: &[Segment]) -> bool {
    if incident.len() != 2 {
        return false;
    }
    let (s, t) = (&segments[incident[0]], &segments[incident[1]]);
    let other = |seg: &Segment| if seg.a == node { seg.b } else { seg.a };
    other(s) != other(t) && s.highway == t.highway
}

fn walk_chain(
    start: NodeId,
    first: usize,
    segments: &[Segment],
    incident: &BTreeMap<NodeId, Vec<usize>>,
    endpoints: &BTreeSet<NodeId>,
    used: &mut [bool],
) -> WalkEdge {
    let template = &segments[first];
    let mut length_m = 0.0;
    let mut current = start;
    let mut segment = first;

    loop {
        used[segment] = true;
        let seg = &segments[segment];
        length_m += seg.length_m;
        current = if seg.a == current { seg.b } else { seg.a };

        if endpoints.contains(&current) {
            break;
        }
        match incident[&current].iter().find(|&&next| !used[next]) {
            Some(&next) => segment = next,
            None => break,
        }
    }

    WalkEdge {
        source: start,
        target: current,
        key: 0,
        length_m,
        kind: template.kind,
        highway: template.highway.clone(),
    }
}

fn assign_keys(mut edges: Vec<WalkEdge>) -> Vec<WalkEdge> {
    let mut seen: HashMap<(NodeId, NodeId), EdgeKey> = HashMap::new();
    for edge in &mut edges {
        let pair = (edge.source.min(edge.target), edge.source.max(edge.target));
        let next = seen.entry(pair).or_insert(0);
        edge.key = *next;
        *next += 1;
    }
    edges
}

#[cfg(test)]
mod tests {
    use super::*;

    fn center() -> GeoPoint {
        GeoPoint {
            lat: 37.0,
            lon: 127.0,
        }
    }

    #[test]
    fn simplification_preserves_total_length() {
        // 1 - 2 - 3 - 4 along a single footway, with a branch at 3.
        let raw = RawNetwork::new()
            .with_node(1, 37.0, 127.0)
            .with_node(2, 37.0005, 127.0)
            .with_node(3, 37.001, 127.0)
            .with_node(4, 37.0015, 127.0)
            .with_node(5, 37.001, 127.001)
            .with_way(10, &[1, 2, 3, 4], "footway")
            .with_way(11, &[3, 5], "footway");

        let raw_length: f64 = [(1, 2), (2, 3), (3, 4), (3, 5)]
            .iter()
            .map(|&(a, b)| {
                let pa = raw.nodes.iter().find(|n| n.id == a).unwrap().location;
                let pb = raw.nodes.iter().find(|n| n.id == b).unwrap().location;
                pa.distance_m(&pb)
            })
            .sum();

        let graph = graph_from_network(&raw, center(), 5_000.0).unwrap();
        assert!(!graph.contains_node(2), "interior node should be contracted");
        assert_eq!(graph.edge_count(), 3);
        assert!((graph.total_length_m() - raw_length).abs() < 1e-6);
    }

    #[test]
    fn highway_change_keeps_boundary_node() {
        let raw = RawNetwork::new()
            .with_node(1, 37.0, 127.0)
            .with_node(2, 37.0005, 127.0)
            .with_node(3, 37.001, 127.0)
            .with_way(10, &[1, 2], "footway")
            .with_way(11, &[2, 3], "steps");

        let graph = graph_from_network(&raw, center(), 5_000.0).unwrap();
        assert!(graph.contains_node(2));
        assert_eq!(
            graph.edges().iter().filter(|e| e.is_staircase()).count(),
            1
        );
    }

    #[test]
    fn parallel_edges_receive_distinct_keys() {
        let raw = RawNetwork::new()
            .with_node(1, 37.0, 127.0)
            .with_node(2, 37.001, 127.0)
            .with_way(10, &[1, 2], "footway")
            .with_way(11, &[1, 2], "steps");

        let graph = graph_from_network(&raw, center(), 5_000.0).unwrap();
        let mut keys: Vec<EdgeKey> = graph.edges().iter().map(|e| e.key).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec![0, 1]);
    }

    #[test]
    fn isolated_ring_is_kept() {
        let raw = RawNetwork::new()
            .with_node(1, 37.0, 127.0)
            .with_node(2, 37.001, 127.0)
            .with_node(3, 37.001, 127.001)
            .with_way(10, &[1, 2, 3, 1], "footway");

        let graph = graph_from_network(&raw, center(), 5_000.0).unwrap();
        assert_eq!(graph.edge_count(), 1);
        let edge = &graph.edges()[0];
        assert_eq!((edge.source, edge.target), (1, 1));
        assert!(edge.length_m > 0.0);
    }

    #[test]
    fn clips_to_radius_and_drops_non_walkable_ways() {
        let raw = RawNetwork::new()
            .with_node(1, 37.0, 127.0)
            .with_node(2, 37.001, 127.0)
            .with_node(3, 37.1, 127.0)
            .with_node(4, 37.0, 127.001)
            .with_way(10, &[1, 2, 3], "footway")
            .with_way(11, &[1, 4], "motorway");

        let graph = graph_from_network(&raw, center(), 500.0).unwrap();
        assert_eq!(graph.node_count(), 2);
        assert!(!graph.contains_node(3));
        assert!(!graph.contains_node(4));
    }

    #[test]
    fn segments_with_unknown_nodes_are_skipped() {
        // Node 99 is referenced by the way but never delivered.
        let raw = RawNetwork::new()
            .with_node(1, 37.0, 127.0)
            .with_node(2, 37.001, 127.0)
            .with_node(3, 37.001, 127.001)
            .with_way(10, &[1, 99, 2], "footway")
            .with_way(11, &[2, 3], "footway");

        let graph = graph_from_network(&raw, center(), 5_000.0).unwrap();
        assert!(!graph.contains_node(99));
        assert!(graph
            .edges()
            .iter()
            .all(|edge| edge.source != 99 && edge.target != 99));
        assert_eq!(graph.edge_count(), 1);
        assert!(graph.edge_between(2, 3).is_some());
        assert!(graph.edge_between(1, 2).is_none());
    }

    #[test]
    fn empty_area_is_data_unavailable() {
        let raw = RawNetwork::new()
            .with_node(1, 37.0, 127.0)
            .with_node(2, 37.001, 127.0)
            .with_way(10, &[1, 2], "motorway");

        let err = graph_from_network(&raw, center(), 500.0).unwrap_err();
        assert!(matches!(err, Error::DataUnavailable { .. }));
    }

    #[test]
    fn from_parts_rejects_dangling_edges() {
        let nodes = BTreeMap::from([(1, center())]);
        let edges = vec![WalkEdge {
            source: 1,
            target: 2,
            key: 0,
            length_m: 1.0,
            kind: PathKind::Way,
            highway: "footway".into(),
        }];
        assert!(WalkGraph::from_parts(nodes, edges).is_err());
    }

    #[test]
    fn rejects_non_positive_radius() {
        let raw = RawNetwork::new();
        assert!(matches!(
            build_walk_graph(&raw, center(), 0.0),
            Err(Error::InvalidInput { .. })
        ));
    }
}
