//! Shared fixture helpers for integration tests.

use std::path::PathBuf;

use stepfree_lib::{FileSource, GeoPoint};

/// Path to fixtures directory used by tests (walk network, amenities).
#[allow(dead_code)]
pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../docs/fixtures")
}

/// Overpass JSON export of a small plaza: a footway with a staircase
/// shortcut, a step-free ramp detour, and a terrace reachable only by steps.
#[allow(dead_code)]
pub fn walk_network_source() -> FileSource {
    FileSource::new(fixtures_dir().join("walk_network.json"))
}

#[allow(dead_code)]
pub fn amenities_path() -> PathBuf {
    fixtures_dir().join("amenities.csv")
}

/// West end of the plaza footway (node 1001).
#[allow(dead_code)]
pub fn plaza_west() -> GeoPoint {
    GeoPoint::new(37.5665, 126.978).expect("valid coordinate")
}

/// East end of the plaza footway (node 1004).
#[allow(dead_code)]
pub fn plaza_east() -> GeoPoint {
    GeoPoint::new(37.5665, 126.9805).expect("valid coordinate")
}

/// Far end of the terrace (node 1009).
#[allow(dead_code)]
pub fn terrace() -> GeoPoint {
    GeoPoint::new(37.5685, 126.978).expect("valid coordinate")
}
