//! KD-tree index for snapping coordinates to walk graph nodes.
//!
//! Coordinates are projected onto the unit sphere and stored in a 3D KD-tree.
//! Straight-line (chord) distance between two points on the sphere grows
//! monotonically with their great-circle distance, so the nearest indexed
//! point under squared Euclidean distance is also the nearest one along the
//! Earth's surface.
//!
//! The index only depends on the node table, which policy filtering never
//! changes, so one index built from the unfiltered graph serves every policy
//! variant derived from it.

use std::collections::HashSet;

use kiddo::float::kdtree::KdTree;
use kiddo::SquaredEuclidean;
use tracing::debug;

use crate::error::{Error, Result};
use crate::geo::{GeoPoint, EARTH_RADIUS_KM};
use crate::graph::{NodeId, WalkGraph};

/// KD-tree bucket size (kiddo default).
const BUCKET_SIZE: usize = 32;

/// Slack applied when collecting candidates tied with the nearest distance.
const TIE_EPSILON: f64 = 1e-18;

/// Nearest-node lookup structure for one graph's node table.
pub struct NodeIndex {
    tree: KdTree<f64, usize, 3, BUCKET_SIZE, u32>,
    /// Node ids in ascending order; tree items index into this vector.
    ids: Vec<NodeId>,
}

impl NodeIndex {
    /// Index every node of `graph`.
    ///
    /// Nodes sharing an exact coordinate are stored once, under the lowest id.
    /// kiddo cannot hold more than `BUCKET_SIZE` items at a single point.
    pub fn build(graph: &WalkGraph) -> Self {
        let mut tree: KdTree<f64, usize, 3, BUCKET_SIZE, u32> = KdTree::new();
        let mut ids = Vec::with_capacity(graph.node_count());
        let mut seen = HashSet::with_capacity(graph.node_count());

        // Node ids arrive in ascending order.
        for (index, (id, point)) in graph.nodes().enumerate() {
            ids.push(id);
            let vector = point.to_unit_vector();
            if seen.insert(vector.map(f64::to_bits)) {
                tree.add(&vector, index);
            }
        }

        debug!(nodes = ids.len(), points = seen.len(), "built node index");
        Self { tree, ids }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Closest node to `point` and its great-circle distance in metres.
    ///
    /// When several nodes are equally close the one with the lowest id wins.
    pub fn nearest(&self, point: GeoPoint) -> Result<(NodeId, f64)> {
        if self.ids.is_empty() {
            return Err(Error::EmptyGraph);
        }
        point.validate()?;

        let query = point.to_unit_vector();
        let best = self.tree.nearest_one::<SquaredEuclidean>(&query);

        let winner = self
            .tree
            .within_unsorted::<SquaredEuclidean>(&query, best.distance + TIE_EPSILON)
            .into_iter()
            .map(|neighbour| neighbour.item)
            .min()
            .unwrap_or(best.item);

        Ok((self.ids[winner], chord_to_metres(best.distance.sqrt())))
    }
}

/// Closest node of `graph` to `point`.
///
/// Convenience wrapper that builds a throwaway [`NodeIndex`]; reuse an index
/// when snapping several points against the same graph.
pub fn nearest_node(graph: &WalkGraph, point: GeoPoint) -> Result<NodeId> {
    if graph.is_empty() {
        return Err(Error::EmptyGraph);
    }
    NodeIndex::build(graph).nearest(point).map(|(id, _)| id)
}

/// Convert a chord length on the unit sphere to a surface distance in metres.
fn chord_to_metres(chord: f64) -> f64 {
    2.0 * (chord / 2.0).clamp(-1.0, 1.0).asin() * EARTH_RADIUS_KM * 1000.0
}
