use crate::error::{Error, Result};
use crate::evaluate::RouteResult;
use crate::geo::GeoPoint;

use super::{PolicyComparison, Router};

/// Caller-held routing state for an interactive front end.
///
/// The routing core keeps no state between calls; a UI that lets users pick
/// an origin and destination separately stores them here along with the most
/// recent results. Changing either endpoint discards the stale results.
#[derive(Debug, Clone, Default)]
pub struct RoutingSession {
    origin: Option<GeoPoint>,
    destination: Option<GeoPoint>,
    last_results: Vec<RouteResult>,
}

impl RoutingSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn origin(&self) -> Option<GeoPoint> {
        self.origin
    }

    pub fn destination(&self) -> Option<GeoPoint> {
        self.destination
    }

    pub fn set_origin(&mut self, point: GeoPoint) -> Result<()> {
        point.validate()?;
        if self.origin != Some(point) {
            self.origin = Some(point);
            self.last_results.clear();
        }
        Ok(())
    }

    pub fn set_destination(&mut self, point: GeoPoint) -> Result<()> {
        point.validate()?;
        if self.destination != Some(point) {
            self.destination = Some(point);
            self.last_results.clear();
        }
        Ok(())
    }

    /// Both endpoints, or `InvalidInput` naming the missing one.
    pub fn endpoints(&self) -> Result<(GeoPoint, GeoPoint)> {
        let origin = self
            .origin
            .ok_or_else(|| Error::invalid("no origin selected"))?;
        let destination = self
            .destination
            .ok_or_else(|| Error::invalid("no destination selected"))?;
        Ok((origin, destination))
    }

    /// Replace the stored results.
    pub fn record(&mut self, results: impl IntoIterator<Item = RouteResult>) {
        self.last_results = results.into_iter().collect();
    }

    pub fn last_results(&self) -> &[RouteResult] {
        &self.last_results
    }

    /// Route the selected endpoints under both policies with `router`'s
    /// configured radius and speed, and record the results.
    pub fn compare_with(&mut self, router: &Router) -> Result<PolicyComparison> {
        let (origin, destination) = self.endpoints()?;
        let config = router.config();
        let comparison = router.route_both_policies(
            origin,
            destination,
            config.default_radius_m,
            config.speed.kmh(),
        );
        self.record(comparison.clone().into_results());
        Ok(comparison)
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
