//! Bounded memo of computed route results.
//!
//! Entries are keyed by a quantized copy of the request parameters and hold
//! an `Arc<RouteResult>` that is never modified after insertion. Eviction is
//! least-recently-used once `capacity` entries are stored, and entries older
//! than the optional time-to-live are treated as misses and dropped.
//!
//! Two threads missing on the same key may both compute the route; the later
//! insert simply replaces the earlier one.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::evaluate::RouteResult;
use crate::geo::GeoPoint;
use crate::stairs::RoutePolicy;

/// Coordinates are stored in millionths of a degree (about 0.1 m).
const COORDINATE_SCALE: f64 = 1e6;

/// Speeds are stored in thousandths of a km/h.
const SPEED_SCALE: f64 = 1e3;

/// Canonical form of a route request used as a cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RouteCacheKey {
    origin: (i64, i64),
    destination: (i64, i64),
    radius_m: i64,
    policy: RoutePolicy,
    speed: i64,
}

impl RouteCacheKey {
    pub fn new(
        origin: GeoPoint,
        destination: GeoPoint,
        radius_m: f64,
        policy: RoutePolicy,
        speed_kmh: f64,
    ) -> Self {
        Self {
            origin: quantize_point(origin),
            destination: quantize_point(destination),
            radius_m: radius_m.round() as i64,
            policy,
            speed: (speed_kmh * SPEED_SCALE).round() as i64,
        }
    }

    pub fn policy(&self) -> RoutePolicy {
        self.policy
    }
}

fn quantize_point(point: GeoPoint) -> (i64, i64) {
    (
        (point.lat * COORDINATE_SCALE).round() as i64,
        (point.lon * COORDINATE_SCALE).round() as i64,
    )
}

#[derive(Debug)]
struct CacheEntry {
    result: Arc<RouteResult>,
    inserted_at: Instant,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<RouteCacheKey, CacheEntry>,
    /// Keys from least to most recently used.
    order: VecDeque<RouteCacheKey>,
}

impl CacheState {
    fn touch(&mut self, key: &RouteCacheKey) {
        if let Some(position) = self.order.iter().position(|k| k == key) {
            self.order.remove(position);
        }
        self.order.push_back(*key);
    }

    fn remove(&mut self, key: &RouteCacheKey) {
        self.entries.remove(key);
        if let Some(position) = self.order.iter().position(|k| k == key) {
            self.order.remove(position);
        }
    }
}

/// Thread-safe LRU cache of route results with optional expiry.
#[derive(Debug)]
pub struct RouteCache {
    capacity: usize,
    ttl: Option<Duration>,
    state: Mutex<CacheState>,
}

impl RouteCache {
    /// Create a cache holding at most `capacity` results. A capacity of zero
    /// disables caching.
    pub fn new(capacity: usize, ttl: Option<Duration>) -> Self {
        Self {
            capacity,
            ttl,
            state: Mutex::new(CacheState::default()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, key: &RouteCacheKey) -> Option<Arc<RouteResult>> {
        self.get_at(key, Instant::now())
    }

    pub fn insert(&self, key: RouteCacheKey, result: Arc<RouteResult>) {
        self.insert_at(key, result, Instant::now());
    }

    pub fn clear(&self) {
        let mut state = self.lock();
        state.entries.clear();
        state.order.clear();
    }

    fn get_at(&self, key: &RouteCacheKey, now: Instant) -> Option<Arc<RouteResult>> {
        let mut state = self.lock();
        let (result, inserted_at) = state
            .entries
            .get(key)
            .map(|entry| (Arc::clone(&entry.result), entry.inserted_at))?;

        if let Some(ttl) = self.ttl {
            if now.saturating_duration_since(inserted_at) > ttl {
                debug!(?key, "route cache entry expired");
                state.remove(key);
                return None;
            }
        }

        state.touch(key);
        Some(result)
    }

    fn insert_at(&self, key: RouteCacheKey, result: Arc<RouteResult>, now: Instant) {
        if self.capacity == 0 {
            return;
        }

        let mut state = self.lock();
        state.entries.insert(
            key,
            CacheEntry {
                result,
                inserted_at: now,
            },
        );
        state.touch(&key);

        while state.entries.len() > self.capacity {
            let Some(oldest) = state.order.pop_front() else {
                break;
            };
            state.entries.remove(&oldest);
            debug!(key = ?oldest, "evicted route cache entry");
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        // Entries are replaced whole, never mutated in place.
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
