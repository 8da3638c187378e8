//! Router configuration.
//!
//! Defaults suit interactive use against the public Overpass instance. Every
//! field can be overridden from the environment:
//!
//! - `STEPFREE_OVERPASS_URL`: Overpass interpreter endpoint
//! - `STEPFREE_FETCH_TIMEOUT_SECS`: timeout for map data requests
//! - `STEPFREE_CACHE_CAPACITY`: maximum cached route results (0 disables)
//! - `STEPFREE_CACHE_TTL_SECS`: lifetime of cached results (0 keeps forever)

use std::env;
use std::time::Duration;

use serde::Serialize;
use tracing::warn;

use crate::evaluate::WalkingSpeed;

pub const OVERPASS_URL_ENV: &str = "STEPFREE_OVERPASS_URL";
pub const FETCH_TIMEOUT_ENV: &str = "STEPFREE_FETCH_TIMEOUT_SECS";
pub const CACHE_CAPACITY_ENV: &str = "STEPFREE_CACHE_CAPACITY";
pub const CACHE_TTL_ENV: &str = "STEPFREE_CACHE_TTL_SECS";

/// Public Overpass API interpreter.
pub const DEFAULT_OVERPASS_URL: &str = "https://overpass-api.de/api/interpreter";

/// Search radius around the origin in metres.
pub const DEFAULT_RADIUS_M: f64 = 3000.0;

/// Settings shared by a [`Router`](crate::Router) and its map source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouterConfig {
    pub overpass_url: String,
    pub fetch_timeout: Duration,
    pub default_radius_m: f64,
    pub speed: WalkingSpeed,
    pub cache_capacity: usize,
    pub cache_ttl: Option<Duration>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            overpass_url: DEFAULT_OVERPASS_URL.to_string(),
            fetch_timeout: Duration::from_secs(30),
            default_radius_m: DEFAULT_RADIUS_M,
            speed: WalkingSpeed::General,
            cache_capacity: 64,
            cache_ttl: Some(Duration::from_secs(15 * 60)),
        }
    }
}

impl RouterConfig {
    /// Defaults with environment overrides applied.
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| env::var(key).ok())
    }

    /// Apply overrides supplied by `lookup` (keyed by environment variable
    /// name). Unparseable values are ignored with a warning.
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(OVERPASS_URL_ENV).filter(|v| !v.trim().is_empty()) {
            self.overpass_url = url.trim().to_string();
        }
        if let Some(secs) = parse_number::<u64>(&lookup, FETCH_TIMEOUT_ENV) {
            self.fetch_timeout = Duration::from_secs(secs.max(1));
        }
        if let Some(capacity) = parse_number::<usize>(&lookup, CACHE_CAPACITY_ENV) {
            self.cache_capacity = capacity;
        }
        if let Some(secs) = parse_number::<u64>(&lookup, CACHE_TTL_ENV) {
            self.cache_ttl = (secs > 0).then(|| Duration::from_secs(secs));
        }
        self
    }

    pub fn with_speed(mut self, speed: WalkingSpeed) -> Self {
        self.speed = speed;
        self
    }
}

fn parse_number<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "ignoring unparseable configuration override");
            None
        }
    }
}
