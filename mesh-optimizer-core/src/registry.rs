//! Authoritative in-memory model of routes: the `route_id -> RouteMetrics`
//! map plus the secondary `destination -> [route_id]` index.

use std::collections::HashMap;
use std::time::Instant;

use tracing::debug;

use crate::types::{MetricsDelta, RouteMetrics};

/// Stores routes and keeps the destination index consistent with the
/// primary map. Every operation here is synchronous and cheap; callers
/// (the `Optimizer` façade) are responsible for holding whatever mutex
/// guards concurrent access.
#[derive(Debug, Default)]
pub struct RouteRegistry {
    routes: HashMap<String, RouteMetrics>,
    destination_index: HashMap<String, Vec<String>>,
}

impl RouteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn destination_count(&self) -> usize {
        self.destination_index.len()
    }

    pub fn get(&self, route_id: &str) -> Option<&RouteMetrics> {
        self.routes.get(route_id)
    }

    pub fn contains(&self, route_id: &str) -> bool {
        self.routes.contains_key(route_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RouteMetrics> {
        self.routes.values()
    }

    pub fn destinations(&self) -> impl Iterator<Item = &String> {
        self.destination_index.keys()
    }

    /// Route ids registered under a destination, in insertion order.
    pub fn routes_for(&self, destination: &str) -> &[String] {
        self.destination_index
            .get(destination)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Insert or overwrite a route. Idempotent: registering the same
    /// `route_id` twice leaves exactly one destination-index entry.
    /// Recomputes derived scores so they reflect the route's primitive
    /// metrics regardless of how the caller constructed it (§3: scores
    /// are a pure function of the primitive metrics at all times).
    pub fn register(&mut self, mut route: RouteMetrics) {
        route.recompute_scores();
        let route_id = route.route_id.clone();
        let destination = route.destination.clone();

        let bucket = self.destination_index.entry(destination.clone()).or_default();
        if !bucket.contains(&route_id) {
            bucket.push(route_id.clone());
        }

        debug!(route_id = %route_id, destination = %destination, "registered route");
        self.routes.insert(route_id, route);
    }

    /// Remove a route from the primary map and the destination index.
    /// Leaves predictor/selector state to the owner (`Optimizer`) to reap.
    pub fn unregister(&mut self, route_id: &str) -> Option<RouteMetrics> {
        let removed = self.routes.remove(route_id)?;
        if let Some(bucket) = self.destination_index.get_mut(&removed.destination) {
            bucket.retain(|id| id != route_id);
            if bucket.is_empty() {
                self.destination_index.remove(&removed.destination);
            }
        }
        debug!(route_id = %route_id, "unregistered route");
        Some(removed)
    }

    /// Apply a partial metrics update, bump `sample_count`, stamp
    /// `last_updated`, and recompute derived scores. Returns `None` for an
    /// unknown `route_id` — the registry never implicitly creates routes.
    pub fn update(&mut self, route_id: &str, delta: &MetricsDelta) -> Option<&RouteMetrics> {
        let route = self.routes.get_mut(route_id)?;

        if let Some(v) = delta.latency_ms {
            route.latency_ms = v;
        }
        if let Some(v) = delta.jitter_ms {
            route.jitter_ms = v;
        }
        if let Some(v) = delta.packet_loss_pct {
            route.packet_loss_pct = v;
        }
        if let Some(v) = delta.bandwidth_mbps {
            route.bandwidth_mbps = v;
        }

        route.last_updated = Instant::now();
        route.sample_count += 1;
        route.recompute_scores();

        Some(route)
    }

    /// Alternative routes to `destination`, sorted by `quality_score`
    /// descending and truncated to `max`.
    pub fn alternatives(&self, destination: &str, exclude: &[String], max: usize) -> Vec<RouteMetrics> {
        let mut routes: Vec<RouteMetrics> = self
            .routes_for(destination)
            .iter()
            .filter(|id| !exclude.iter().any(|e| e == *id))
            .filter_map(|id| self.routes.get(id))
            .cloned()
            .collect();

        routes.sort_by(|a, b| {
            b.scores
                .quality_score
                .partial_cmp(&a.scores.quality_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        routes.truncate(max);
        routes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(id: &str, dest: &str) -> RouteMetrics {
        RouteMetrics::new(id, dest, dest)
    }

    #[test]
    fn register_is_idempotent() {
        let mut reg = RouteRegistry::new();
        reg.register(route("r1", "D"));
        reg.register(route("r1", "D"));
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.routes_for("D").len(), 1);
    }

    #[test]
    fn register_recomputes_scores_even_for_a_stale_scores_field() {
        let mut stale = route("r1", "D");
        stale.latency_ms = 10.0; // scores not recomputed by this direct mutation
        assert_eq!(stale.scores.quality_score, 1.0); // still the construction-time value

        let mut reg = RouteRegistry::new();
        reg.register(stale);
        let registered = reg.get("r1").unwrap();
        assert!((registered.scores.quality_score - 0.97).abs() < 1e-9);
    }

    #[test]
    fn unregister_then_register_restores_presence_without_leak() {
        let mut reg = RouteRegistry::new();
        reg.register(route("r1", "D"));
        reg.unregister("r1");
        assert!(!reg.contains("r1"));
        assert_eq!(reg.routes_for("D").len(), 0);

        reg.register(route("r1", "D"));
        assert!(reg.contains("r1"));
        assert_eq!(reg.routes_for("D").len(), 1);
    }

    #[test]
    fn update_unknown_route_returns_none() {
        let mut reg = RouteRegistry::new();
        assert!(reg.update("missing", &MetricsDelta::default()).is_none());
    }

    #[test]
    fn update_increments_sample_count_monotonically() {
        let mut reg = RouteRegistry::new();
        reg.register(route("r1", "D"));
        for _ in 0..5 {
            reg.update(
                "r1",
                &MetricsDelta {
                    latency_ms: Some(10.0),
                    ..Default::default()
                },
            );
        }
        assert_eq!(reg.get("r1").unwrap().sample_count, 5);
    }

    #[test]
    fn alternatives_sorted_descending_and_truncated() {
        let mut reg = RouteRegistry::new();
        reg.register(route("low", "D"));
        reg.register(route("high", "D"));
        reg.register(route("mid", "D"));

        reg.update("low", &MetricsDelta { latency_ms: Some(190.0), ..Default::default() });
        reg.update("high", &MetricsDelta { latency_ms: Some(5.0), ..Default::default() });
        reg.update("mid", &MetricsDelta { latency_ms: Some(60.0), ..Default::default() });

        let alts = reg.alternatives("D", &[], 2);
        assert_eq!(alts.len(), 2);
        assert_eq!(alts[0].route_id, "high");
        assert_eq!(alts[1].route_id, "mid");
    }

    #[test]
    fn destination_index_consistent_after_random_ops() {
        let mut reg = RouteRegistry::new();
        reg.register(route("a", "X"));
        reg.register(route("b", "X"));
        reg.unregister("a");
        reg.register(route("c", "Y"));

        for dest in reg.destinations().cloned().collect::<Vec<_>>() {
            for id in reg.routes_for(&dest) {
                let r = reg.get(id).expect("indexed route must exist");
                assert_eq!(&r.destination, &dest);
            }
        }
        for r in reg.iter() {
            assert!(reg.routes_for(&r.destination).iter().any(|id| id == &r.route_id));
        }
    }
}
