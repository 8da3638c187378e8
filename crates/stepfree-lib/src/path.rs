use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use crate::error::{Error, Result};
use crate::graph::{NodeId, WalkGraph};

/// Find the path from `origin` to `destination` minimising the summed edge
/// length, using Dijkstra's algorithm.
///
/// Returns `[origin]` when both ends are the same node and
/// [`Error::NoPath`] when `destination` cannot be reached.
pub fn shortest_path(
    graph: &WalkGraph,
    origin: NodeId,
    destination: NodeId,
) -> Result<Vec<NodeId>> {
    for node in [origin, destination] {
        if !graph.contains_node(node) {
            return Err(Error::invalid(format!("node {node} is not part of the graph")));
        }
    }

    if origin == destination {
        return Ok(vec![origin]);
    }

    let mut distances: HashMap<NodeId, f64> = HashMap::new();
    let mut parents: HashMap<NodeId, Option<NodeId>> = HashMap::new();
    let mut queue = BinaryHeap::new();

    distances.insert(origin, 0.0);
    parents.insert(origin, None);
    queue.push(QueueEntry::new(origin, 0.0));

    while let Some(entry) = queue.pop() {
        let current_distance = match distances.get(&entry.node) {
            Some(distance) if *distance < entry.cost.0 => continue,
            Some(distance) => *distance,
            None => continue,
        };

        if entry.node == destination {
            return Ok(reconstruct_path(&parents, origin, destination));
        }

        for (next, edge) in graph.neighbours(entry.node) {
            let next_cost = current_distance + edge.length_m;
            if next_cost < *distances.get(&next).unwrap_or(&f64::INFINITY) {
                distances.insert(next, next_cost);
                parents.insert(next, Some(entry.node));
                queue.push(QueueEntry::new(next, next_cost));
            }
        }
    }

    Err(Error::NoPath {
        origin,
        destination,
    })
}

/// Total edge length along `path` in metres, using the cheapest edge between
/// consecutive nodes. `None` if two consecutive nodes are not adjacent.
pub fn path_length_m(graph: &WalkGraph, path: &[NodeId]) -> Option<f64> {
    path.windows(2)
        .map(|pair| graph.edge_between(pair[0], pair[1]).map(|edge| edge.length_m))
        .sum()
}

fn reconstruct_path(
    parents: &HashMap<NodeId, Option<NodeId>>,
    start: NodeId,
    goal: NodeId,
) -> Vec<NodeId> {
    let mut path = Vec::new();
    let mut current = Some(goal);
    while let Some(node) = current {
        path.push(node);
        if node == start {
            break;
        }
        current = parents.get(&node).copied().flatten();
    }
    path.reverse();
    path
}

#[derive(Copy, Clone, Debug, Default)]
struct FloatOrd(f64);

impl PartialEq for FloatOrd {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq(&other.0)
    }
}

impl Eq for FloatOrd {}

impl PartialOrd for FloatOrd {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FloatOrd {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
struct QueueEntry {
    node: NodeId,
    cost: FloatOrd,
}

impl QueueEntry {
    fn new(node: NodeId, cost: f64) -> Self {
        Self {
            node,
            cost: FloatOrd(cost),
        }
    }
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering so BinaryHeap becomes a min-heap by cost.
        other
            .cost
            .cmp(&self.cost)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
