//! Public façade: the single entry point external collaborators use.
//! Owns the registry, predictor, and selector behind one mutex (lock
//! order registry -> predictor -> selector is enforced structurally since
//! all three live inside the same guard) and runs the optimization cycle.

use std::collections::HashSet;
use std::panic;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use rand::rngs::ThreadRng;
use rand::Rng;
use tracing::warn;

use crate::config::OptimizationConfig;
use crate::predictor::LatencyPredictor;
use crate::registry::RouteRegistry;
use crate::selector::AdaptivePathSelector;
use crate::types::{
    MetricsDelta, OptimizationReport, OptimizationStatistics, QualityDistribution, Recommendation,
    RecommendationMetrics, RouteMetrics, RouteQuality, RouteReport, RouteReportEntry, RouteReportMetrics,
};

type OptimizationCallback = Box<dyn Fn(&OptimizationReport) + Send + Sync>;

struct State {
    registry: RouteRegistry,
    predictor: LatencyPredictor,
    selector: AdaptivePathSelector,
}

/// The mesh routing optimizer: route registry + latency predictor +
/// adaptive path selector, fronted by a single public API.
pub struct Optimizer {
    config: Mutex<OptimizationConfig>,
    state: Mutex<State>,
    callbacks: Mutex<Vec<OptimizationCallback>>,
    running: AtomicBool,
}

impl Optimizer {
    pub fn new(config: OptimizationConfig) -> Self {
        Self {
            config: Mutex::new(config),
            state: Mutex::new(State {
                registry: RouteRegistry::new(),
                predictor: LatencyPredictor::new(),
                selector: AdaptivePathSelector::new(),
            }),
            callbacks: Mutex::new(Vec::new()),
            running: AtomicBool::new(false),
        }
    }

    /// Current configuration snapshot.
    pub fn config(&self) -> OptimizationConfig {
        self.config.lock().clone()
    }

    /// Replace the whole configuration (used by the governance path after
    /// it has validated and merged individual field writes).
    pub fn set_config(&self, cfg: OptimizationConfig) {
        *self.config.lock() = cfg;
    }

    /// Mutate a single config field by name; see
    /// `OptimizationConfig::set_field` for validation rules.
    pub fn set_config_field(&self, key: &str, value: &serde_json::Value) -> std::result::Result<(), String> {
        self.config.lock().set_field(key, value)
    }

    /// Insert or overwrite a route; idempotent. Also registers the route
    /// with the path selector.
    pub fn register_route(&self, route: RouteMetrics) {
        let mut state = self.state.lock();
        let route_id = route.route_id.clone();
        state.registry.register(route);
        state.selector.register(&route_id);
    }

    /// Remove a route and its predictor/selector state.
    pub fn unregister_route(&self, route_id: &str) {
        let mut state = self.state.lock();
        state.registry.unregister(route_id);
        state.predictor.remove(route_id);
        state.selector.remove(route_id);
    }

    /// Whether `route_id` is currently registered. Callers that need to
    /// tell "not yet registered" apart from "registered but no samples
    /// yet" should use this rather than probing predictor/selector state.
    pub fn contains_route(&self, route_id: &str) -> bool {
        self.state.lock().registry.contains(route_id)
    }

    /// Apply any subset of latency/loss/bandwidth/jitter to a known route,
    /// updating the predictor and bandit reward as a side effect. Returns
    /// `None` for an unknown `route_id`.
    pub fn update_route_metrics(
        &self,
        route_id: &str,
        latency_ms: Option<f64>,
        packet_loss_pct: Option<f64>,
        bandwidth_mbps: Option<f64>,
        jitter_ms: Option<f64>,
    ) -> Option<RouteMetrics> {
        let cfg = self.config();
        let mut state = self.state.lock();

        if !state.registry.contains(route_id) {
            return None;
        }

        if let Some(latency) = latency_ms {
            state.predictor.update(route_id, latency, &cfg);
        }

        let delta = MetricsDelta {
            latency_ms,
            jitter_ms,
            packet_loss_pct,
            bandwidth_mbps,
        };
        let updated = state.registry.update(route_id, &delta)?.clone();

        let reward = updated.reward();
        state.selector.update_reward(route_id, reward, &cfg);

        Some(updated)
    }

    /// Select the best route to `destination`, excluding any id in
    /// `exclude` and any route below `min_samples`. Falls back to the
    /// first remaining route by insertion order if none are eligible for
    /// bandit selection, and to `None` if there are no candidates at all.
    pub fn select_best_route(&self, destination: &str, exclude: &HashSet<String>) -> Option<RouteMetrics> {
        self.select_best_route_with(destination, exclude, &mut rand::thread_rng())
    }

    /// Same as `select_best_route` but with an injectable RNG, for
    /// deterministic tests.
    pub fn select_best_route_with<R: Rng + ?Sized>(
        &self,
        destination: &str,
        exclude: &HashSet<String>,
        rng: &mut R,
    ) -> Option<RouteMetrics> {
        let cfg = self.config();
        let mut state = self.state.lock();

        let candidates: Vec<String> = state
            .registry
            .routes_for(destination)
            .iter()
            .filter(|id| !exclude.contains(*id))
            .cloned()
            .collect();

        if candidates.is_empty() {
            return None;
        }

        let eligible: Vec<String> = candidates
            .iter()
            .filter(|id| {
                state
                    .registry
                    .get(id)
                    .map(|r| r.sample_count >= cfg.min_samples as u64)
                    .unwrap_or(false)
            })
            .cloned()
            .collect();

        if eligible.is_empty() {
            return state.registry.get(&candidates[0]).cloned();
        }

        let selected = state.selector.select(&eligible, rng)?;
        state.registry.get(&selected).cloned()
    }

    /// Alternative routes to `destination`, sorted by `quality_score`
    /// descending and truncated to `max` (or the configured default).
    pub fn get_alternative_routes(&self, destination: &str, exclude: &HashSet<String>, max: Option<usize>) -> Vec<RouteMetrics> {
        let cfg = self.config();
        let state = self.state.lock();
        let exclude_vec: Vec<String> = exclude.iter().cloned().collect();
        let limit = max.unwrap_or(cfg.max_alternative_routes);
        state.registry.alternatives(destination, &exclude_vec, limit)
    }

    pub fn predict_latency(&self, route_id: &str) -> Option<f64> {
        self.state.lock().predictor.predict(route_id)
    }

    pub fn prediction_confidence(&self, route_id: &str) -> f64 {
        let cfg = self.config();
        self.state.lock().predictor.confidence(route_id, &cfg)
    }

    pub fn add_optimization_callback(&self, callback: OptimizationCallback) {
        self.callbacks.lock().push(callback);
    }

    /// Scan every route, classify it, detect staleness, and emit
    /// recommendations. Pure with respect to `RouteMetrics` fields: it
    /// reads and classifies but never mutates a route.
    pub fn optimize_routes(&self) -> OptimizationReport {
        let cfg = self.config();
        let now = std::time::Instant::now();
        let timestamp = chrono::Utc::now();

        let state = self.state.lock();
        let registry = &state.registry;

        let mut distribution = QualityDistribution::default();
        let mut recommendations = Vec::new();

        for route in registry.iter() {
            let quality = route.classify_quality(&cfg);
            distribution.record(quality);

            if matches!(quality, RouteQuality::Poor | RouteQuality::Critical) {
                recommendations.push(Recommendation {
                    route_id: route.route_id.clone(),
                    destination: route.destination.clone(),
                    action: "investigate".to_string(),
                    reason: format!("Route quality is {}", quality.as_str()),
                    metrics: Some(RecommendationMetrics::from(route)),
                });
            }
        }

        for route in registry.iter() {
            let age = now.saturating_duration_since(route.last_updated);
            if age.as_secs() > cfg.route_timeout_seconds {
                recommendations.push(Recommendation {
                    route_id: route.route_id.clone(),
                    destination: route.destination.clone(),
                    action: "refresh".to_string(),
                    reason: format!("Route data is stale ({}s old)", age.as_secs()),
                    metrics: None,
                });
            }
        }

        let total_routes = registry.len();
        let statistics = if total_routes > 0 {
            let latencies: Vec<f64> = registry.iter().map(|r| r.latency_ms).collect();
            let losses: Vec<f64> = registry.iter().map(|r| r.packet_loss_pct).collect();
            let sum_latency: f64 = latencies.iter().sum();
            let sum_loss: f64 = losses.iter().sum();

            OptimizationStatistics {
                quality_distribution: distribution,
                avg_latency_ms: Some(sum_latency / latencies.len() as f64),
                avg_packet_loss: Some(sum_loss / losses.len() as f64),
                min_latency_ms: latencies.iter().cloned().fold(None, |acc, v| Some(acc.map_or(v, |a: f64| a.min(v)))),
                max_latency_ms: latencies.iter().cloned().fold(None, |acc, v| Some(acc.map_or(v, |a: f64| a.max(v)))),
            }
        } else {
            OptimizationStatistics {
                quality_distribution: distribution,
                avg_latency_ms: None,
                avg_packet_loss: None,
                min_latency_ms: None,
                max_latency_ms: None,
            }
        };

        let destinations = registry.destination_count();
        drop(state);

        let report = OptimizationReport {
            timestamp,
            total_routes,
            destinations,
            recommendations,
            statistics,
        };

        self.dispatch_callbacks(&report);
        report
    }

    /// Invoke every registered callback, isolating failures: a callback
    /// that panics must not prevent subsequent callbacks from running or
    /// abort the cycle.
    fn dispatch_callbacks(&self, report: &OptimizationReport) {
        let callbacks = self.callbacks.lock();
        for callback in callbacks.iter() {
            let result = panic::catch_unwind(panic::AssertUnwindSafe(|| callback(report)));
            if let Err(panic) = result {
                let detail = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "non-string panic payload".to_string());
                warn!(detail, "optimization callback failed");
            }
        }
    }

    /// Start the periodic monitoring loop on the current tokio runtime.
    /// Exits promptly at the next tick boundary after `stop_monitoring` is
    /// observed.
    pub async fn start_monitoring(self: &Arc<Self>) {
        self.running.store(true, Ordering::SeqCst);
        let cfg = self.config();
        let mut ticker = tokio::time::interval(std::time::Duration::from_secs(cfg.probe_interval_seconds.max(1)));
        ticker.tick().await; // consume the immediate first tick

        while self.running.load(Ordering::SeqCst) {
            ticker.tick().await;
            if !self.running.load(Ordering::SeqCst) {
                break;
            }
            let report = self.optimize_routes();
            if !report.recommendations.is_empty() {
                tracing::info!(count = report.recommendations.len(), "optimization cycle produced recommendations");
            }
        }
    }

    pub fn stop_monitoring(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Snapshot including predictions, optionally scoped to one
    /// destination.
    pub fn get_route_report(&self, destination: Option<&str>) -> RouteReport {
        let cfg = self.config();
        let state = self.state.lock();

        let route_ids: Vec<String> = match destination {
            Some(dest) => state.registry.routes_for(dest).to_vec(),
            None => state.registry.iter().map(|r| r.route_id.clone()).collect(),
        };

        let mut entries = Vec::with_capacity(route_ids.len());
        for id in &route_ids {
            let Some(route) = state.registry.get(id) else { continue };
            let predicted = state.predictor.predict(id);
            let confidence = state.predictor.confidence(id, &cfg);
            let quality = route.classify_quality(&cfg);

            entries.push(RouteReportEntry {
                route_id: route.route_id.clone(),
                destination: route.destination.clone(),
                next_hop: route.next_hop.clone(),
                quality: quality.as_str().to_string(),
                metrics: RouteReportMetrics {
                    latency_ms: route.latency_ms,
                    predicted_latency_ms: predicted,
                    prediction_confidence: confidence,
                    jitter_ms: route.jitter_ms,
                    packet_loss: route.packet_loss_pct,
                    bandwidth_mbps: route.bandwidth_mbps,
                    hop_count: route.hop_count,
                },
                scores: route.scores,
                last_updated: instant_to_utc(route.last_updated),
                sample_count: route.sample_count,
            });
        }

        RouteReport {
            generated_at: chrono::Utc::now(),
            total_routes: entries.len(),
            routes: entries,
        }
    }
}

/// Best-effort conversion of a monotonic `Instant` into a wall-clock
/// timestamp for report rendering: anchored to "now minus elapsed".
fn instant_to_utc(instant: std::time::Instant) -> chrono::DateTime<chrono::Utc> {
    let elapsed = std::time::Instant::now().saturating_duration_since(instant);
    chrono::Utc::now() - chrono::Duration::from_std(elapsed).unwrap_or_default()
}

// ThreadRng is Send + !Sync on some platforms historically; keep the
// default path usable without forcing callers to thread their own RNG.
#[allow(dead_code)]
fn _assert_thread_rng_usable(_r: ThreadRng) {}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::Arc;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn register_route_is_idempotent_end_to_end() {
        let opt = Optimizer::new(OptimizationConfig::default());
        opt.register_route(RouteMetrics::new("r1", "D", "D"));
        opt.register_route(RouteMetrics::new("r1", "D", "D"));
        let report = opt.get_route_report(None);
        assert_eq!(report.total_routes, 1);
    }

    #[test]
    fn stale_route_emits_refresh_recommendation() {
        let mut cfg = OptimizationConfig::default();
        cfg.route_timeout_seconds = 60;
        let opt = Optimizer::new(cfg);
        opt.register_route(RouteMetrics::new("r1", "D", "D"));

        {
            let mut state = opt.state.lock();
            let route = state.registry.get("r1").unwrap().clone();
            let mut route = route;
            route.last_updated = std::time::Instant::now() - std::time::Duration::from_secs(120);
            state.registry.unregister("r1");
            state.registry.register(route);
        }

        let report = opt.optimize_routes();
        let refreshes: Vec<_> = report.recommendations.iter().filter(|r| r.action == "refresh").collect();
        assert_eq!(refreshes.len(), 1);
        assert_eq!(refreshes[0].route_id, "r1");
        assert!(refreshes[0].reason.contains("stale (120s old)"));
    }

    #[test]
    fn poor_quality_route_emits_investigate_recommendation() {
        let opt = Optimizer::new(OptimizationConfig::default());
        opt.register_route(RouteMetrics::new("r2", "D", "D"));
        let updated = opt
            .update_route_metrics("r2", Some(180.0), Some(8.0), None, None)
            .unwrap();
        assert_eq!(updated.classify_quality(&opt.config()), RouteQuality::Poor);

        let report = opt.optimize_routes();
        let investigate: Vec<_> = report.recommendations.iter().filter(|r| r.action == "investigate").collect();
        assert_eq!(investigate.len(), 1);
        assert!(investigate[0].reason.contains("poor"));
        let snapshot = investigate[0].metrics.as_ref().unwrap();
        assert_eq!(snapshot.latency_ms, 180.0);
        assert_eq!(snapshot.packet_loss_pct, 8.0);
    }

    #[test]
    fn selector_requires_minimum_samples() {
        let mut cfg = OptimizationConfig::default();
        cfg.min_samples = 5;
        let opt = Optimizer::new(cfg);

        opt.register_route(RouteMetrics::new("rA", "D", "D"));
        opt.register_route(RouteMetrics::new("rB", "D", "D"));

        for _ in 0..2 {
            opt.update_route_metrics("rA", Some(20.0), Some(0.0), None, None);
        }
        for _ in 0..6 {
            opt.update_route_metrics("rB", Some(20.0), Some(0.0), None, None);
        }

        let selected = opt.select_best_route_with("D", &HashSet::new(), &mut rng());
        assert_eq!(selected.unwrap().route_id, "rB");

        for _ in 0..5 {
            opt.update_route_metrics("rA", Some(20.0), Some(0.0), None, None);
        }
        let selected = opt.select_best_route_with("D", &HashSet::new(), &mut rng());
        assert!(selected.is_some());
    }

    #[test]
    fn select_best_route_with_no_routes_is_none() {
        let opt = Optimizer::new(OptimizationConfig::default());
        assert!(opt.select_best_route_with("nowhere", &HashSet::new(), &mut rng()).is_none());
    }

    #[test]
    fn optimize_routes_is_pure_modulo_timestamp() {
        let opt = Optimizer::new(OptimizationConfig::default());
        opt.register_route(RouteMetrics::new("r1", "D", "D"));
        opt.update_route_metrics("r1", Some(180.0), Some(8.0), None, None);

        let first = opt.optimize_routes();
        let second = opt.optimize_routes();
        assert_eq!(first.recommendations.len(), second.recommendations.len());
        for (a, b) in first.recommendations.iter().zip(second.recommendations.iter()) {
            assert_eq!(a.route_id, b.route_id);
            assert_eq!(a.action, b.action);
            assert_eq!(a.reason, b.reason);
        }
    }

    #[test]
    fn callback_isolation_lets_second_callback_observe_the_report() {
        let opt = Arc::new(Optimizer::new(OptimizationConfig::default()));
        opt.register_route(RouteMetrics::new("r1", "D", "D"));

        let seen = Arc::new(Mutex::new(0usize));
        opt.add_optimization_callback(Box::new(|_report| {
            panic!("first callback always fails");
        }));
        let seen_clone = seen.clone();
        opt.add_optimization_callback(Box::new(move |_report| {
            *seen_clone.lock() += 1;
        }));

        let report = opt.optimize_routes();
        assert_eq!(*seen.lock(), 1);
        assert_eq!(report.total_routes, 1);
    }

    #[test]
    fn unregister_then_register_restores_presence() {
        let opt = Optimizer::new(OptimizationConfig::default());
        opt.register_route(RouteMetrics::new("r1", "D", "D"));
        opt.unregister_route("r1");
        assert!(opt.predict_latency("r1").is_none());
        opt.register_route(RouteMetrics::new("r1", "D", "D"));
        assert_eq!(opt.get_route_report(None).total_routes, 1);
    }
}
