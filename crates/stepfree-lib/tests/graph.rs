mod common;

use std::fs;

use stepfree_lib::{
    apply_policy, build_walk_graph, graph_from_network, staircases, GeoPoint, MapSource, NodeIndex,
    RawNetwork, RoutePolicy, WalkGraph,
};

use common::{fixtures_dir, plaza_west, walk_network_source};

fn fixture_graph(radius_m: f64) -> WalkGraph {
    build_walk_graph(&walk_network_source(), plaza_west(), radius_m).expect("fixture graph builds")
}

#[test]
fn fixture_decodes_nodes_and_ways() {
    let bytes = fs::read(fixtures_dir().join("walk_network.json")).expect("fixture readable");
    let raw = RawNetwork::from_overpass_json(&bytes).expect("valid overpass json");
    assert_eq!(raw.nodes.len(), 13);
    assert_eq!(raw.ways.len(), 11);
    assert_eq!(raw.ways.iter().filter(|way| way.is_walkable()).count(), 8);
}

#[test]
fn excluded_ways_never_reach_the_graph() {
    let graph = fixture_graph(500.0);
    for excluded in [1010, 1011, 1012, 1013] {
        assert!(!graph.contains_node(excluded), "node {excluded} present");
    }
    assert!(graph
        .edges()
        .iter()
        .all(|edge| edge.highway != "motorway" && edge.highway != "pedestrian"));
}

#[test]
fn simplification_keeps_topology_and_length() {
    let graph = fixture_graph(500.0);
    let ids: Vec<i64> = graph.nodes().map(|(id, _)| id).collect();
    assert_eq!(ids, vec![1001, 1002, 1003, 1004, 1005, 1007, 1008, 1009]);
    assert_eq!(graph.edge_count(), 8);

    let raw = walk_network_source()
        .fetch(plaza_west(), 500.0)
        .expect("fixture loads");
    let location = |id: i64| {
        raw.nodes
            .iter()
            .find(|node| node.id == id)
            .map(|node| node.location)
            .expect("node in fixture")
    };
    let expected_m: f64 = raw
        .ways
        .iter()
        .filter(|way| way.is_walkable())
        .flat_map(|way| way.nodes.windows(2).map(|pair| (pair[0], pair[1])).collect::<Vec<_>>())
        .map(|(a, b)| location(a).distance_m(&location(b)))
        .sum();
    assert!((graph.total_length_m() - expected_m).abs() < 1e-6);
}

#[test]
fn clipping_drops_segments_leaving_the_disk() {
    let graph = fixture_graph(150.0);
    let ids: Vec<i64> = graph.nodes().map(|(id, _)| id).collect();
    assert_eq!(ids, vec![1001, 1002, 1003, 1005]);
    assert_eq!(graph.edge_count(), 3);
}

#[test]
fn avoid_policy_removes_only_staircases() {
    let graph = fixture_graph(500.0);
    let stairs = staircases(&graph);
    assert_eq!(stairs.len(), 2);

    let step_free = apply_policy(&graph, RoutePolicy::AvoidStairs);
    assert_eq!(step_free.node_count(), graph.node_count());
    assert_eq!(step_free.edge_count(), graph.edge_count() - stairs.len());
    assert!(step_free.edges().iter().all(|edge| !edge.is_staircase()));

    let unchanged = apply_policy(&graph, RoutePolicy::AllowStairs);
    assert_eq!(unchanged.edges(), graph.edges());
    // The input graph is not touched by filtering.
    assert_eq!(staircases(&graph).len(), 2);
}

#[test]
fn staircase_midpoints_sit_between_endpoints() {
    let graph = fixture_graph(500.0);
    let shortcut = staircases(&graph)
        .into_iter()
        .find(|stair| {
            (stair.source, stair.target) == (1002, 1003)
                || (stair.source, stair.target) == (1003, 1002)
        })
        .expect("shortcut staircase present");
    assert!((shortcut.midpoint.lon - 126.97925).abs() < 1e-9);
    assert!((shortcut.midpoint.lat - 37.5665).abs() < 1e-9);
}

#[test]
fn node_index_snaps_against_fixture() {
    let graph = fixture_graph(500.0);
    let index = NodeIndex::build(&graph);
    assert_eq!(index.len(), graph.node_count());

    let near_stairs = GeoPoint::new(37.56652, 126.97948).unwrap();
    let (id, offset_m) = index.nearest(near_stairs).unwrap();
    assert_eq!(id, 1003);
    assert!(offset_m < 5.0);
}

#[test]
fn unwalkable_network_is_data_unavailable() {
    let raw = RawNetwork::new()
        .with_node(1, 37.0, 127.0)
        .with_node(2, 37.001, 127.0)
        .with_way(1, &[1, 2], "motorway");
    let err = graph_from_network(&raw, GeoPoint::new(37.0, 127.0).unwrap(), 1000.0).unwrap_err();
    assert!(matches!(err, stepfree_lib::Error::DataUnavailable { .. }));
}
