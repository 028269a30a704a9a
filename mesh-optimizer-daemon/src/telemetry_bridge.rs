//! Periodic pull loop bridging an external telemetry source (the overlay
//! control channel) into the optimizer core. Mirrors the reference
//! `MeshTelemetryCollector`: on each tick, pull peers, bootstrap/update a
//! direct route per peer with a placeholder latency, then run one
//! optimization cycle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use mesh_optimizer_core::{Optimizer, RouteMetrics};
use serde::Deserialize;
use tracing::{debug, info};

/// Placeholder latency fed for every peer until the telemetry source
/// grows real per-peer measurements. Kept as a named constant per the
/// open question in the design notes: bootstrap a route until real
/// samples arrive, rather than require them before registration.
const BOOTSTRAP_LATENCY_MS: f64 = 50.0;

/// One entry from the external peer listing. Only `remote` is consumed by
/// the bridge; other fields (port, protocol, ...) pass through untouched
/// for callers that want them.
#[derive(Debug, Clone, Deserialize)]
pub struct Peer {
    pub remote: String,
    #[serde(default)]
    pub port: Option<String>,
    #[serde(default)]
    pub protocol: Option<String>,
}

/// Shape returned by a telemetry pull: `status` must be `"ok"` for the
/// peer list to be trusted; any other status means "skip this tick".
#[derive(Debug, Clone, Deserialize)]
pub struct PeerSnapshot {
    pub status: String,
    #[serde(default)]
    pub peers: Vec<Peer>,
    #[serde(default)]
    pub count: usize,
}

impl PeerSnapshot {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

/// External collaborator supplying the current peer list. The core never
/// implements this itself — it does not speak the overlay wire protocol.
pub trait PeerSource: Send + Sync {
    fn get_peers(&self) -> PeerSnapshot;
}

/// Pulls peers from `source` on a fixed interval, feeds them into
/// `optimizer`, and triggers one optimization cycle per tick.
pub struct TelemetryBridge<S: PeerSource> {
    optimizer: Arc<Optimizer>,
    source: S,
    interval: Duration,
    stop: Arc<AtomicBool>,
}

impl<S: PeerSource> TelemetryBridge<S> {
    pub fn new(optimizer: Arc<Optimizer>, source: S, interval: Duration) -> Self {
        Self {
            optimizer,
            source,
            interval,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// A clone-able handle that can stop the loop from another task.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    /// Run until `stop()` is observed between ticks.
    pub async fn run(&self) {
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            ticker.tick().await;
            if self.stop.load(Ordering::SeqCst) {
                break;
            }
            self.tick_once();
        }
    }

    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    fn tick_once(&self) {
        let snapshot = self.source.get_peers();
        if !snapshot.is_ok() {
            debug!("telemetry pull returned non-ok status; skipping tick");
            return;
        }

        for peer in &snapshot.peers {
            if peer.remote.is_empty() {
                continue;
            }
            let route_id = format!("direct-{}", peer.remote);

            self.optimizer
                .update_route_metrics(&route_id, Some(BOOTSTRAP_LATENCY_MS), None, None, None);

            if !self.optimizer.contains_route(&route_id) {
                self.optimizer.register_route(RouteMetrics::new(&route_id, &peer.remote, &peer.remote));
                self.optimizer
                    .update_route_metrics(&route_id, Some(BOOTSTRAP_LATENCY_MS), None, None, None);
            }
        }

        let report = self.optimizer.optimize_routes();
        info!(recommendations = report.recommendations.len(), "telemetry tick produced recommendations");
    }
}

/// Env-driven fake peer source mirroring the reference
/// `YGGDRASIL_MOCK` path, for daemon-level integration tests and local
/// runs without a real overlay node.
pub struct StaticPeerSource {
    pub remotes: Vec<String>,
}

impl PeerSource for StaticPeerSource {
    fn get_peers(&self) -> PeerSnapshot {
        let peers: Vec<Peer> = self
            .remotes
            .iter()
            .map(|r| Peer {
                remote: r.clone(),
                port: None,
                protocol: None,
            })
            .collect();
        PeerSnapshot {
            status: "ok".to_string(),
            count: peers.len(),
            peers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mesh_optimizer_core::OptimizationConfig;

    struct FailingPeerSource;
    impl PeerSource for FailingPeerSource {
        fn get_peers(&self) -> PeerSnapshot {
            PeerSnapshot {
                status: "error".to_string(),
                peers: vec![],
                count: 0,
            }
        }
    }

    #[test]
    fn new_peers_are_registered_with_bootstrap_latency() {
        let optimizer = Arc::new(Optimizer::new(OptimizationConfig::default()));
        let source = StaticPeerSource {
            remotes: vec!["10.0.0.1".to_string(), "10.0.0.2".to_string()],
        };
        let bridge = TelemetryBridge::new(optimizer.clone(), source, Duration::from_secs(1));

        bridge.tick_once();

        let report = optimizer.get_route_report(None);
        assert_eq!(report.total_routes, 2);
        for route in &report.routes {
            assert_eq!(route.metrics.latency_ms, BOOTSTRAP_LATENCY_MS);
            assert!(route.sample_count >= 1);
        }
    }

    #[test]
    fn second_tick_does_not_reregister_but_increments_samples() {
        let optimizer = Arc::new(Optimizer::new(OptimizationConfig::default()));
        let source = StaticPeerSource {
            remotes: vec!["10.0.0.1".to_string()],
        };
        let bridge = TelemetryBridge::new(optimizer.clone(), source, Duration::from_secs(1));

        bridge.tick_once();
        bridge.tick_once();

        let report = optimizer.get_route_report(None);
        assert_eq!(report.total_routes, 1);
        assert_eq!(report.routes[0].sample_count, 2);
    }

    #[test]
    fn non_ok_status_skips_the_tick_silently() {
        let optimizer = Arc::new(Optimizer::new(OptimizationConfig::default()));
        let bridge = TelemetryBridge::new(optimizer.clone(), FailingPeerSource, Duration::from_secs(1));

        bridge.tick_once();

        assert_eq!(optimizer.get_route_report(None).total_routes, 0);
    }

    #[test]
    fn empty_remote_is_skipped() {
        let optimizer = Arc::new(Optimizer::new(OptimizationConfig::default()));
        let source = StaticPeerSource {
            remotes: vec!["".to_string()],
        };
        let bridge = TelemetryBridge::new(optimizer.clone(), source, Duration::from_secs(1));

        bridge.tick_once();

        assert_eq!(optimizer.get_route_report(None).total_routes, 0);
    }

    #[test]
    fn run_exits_promptly_once_stop_is_observed_between_ticks() {
        let optimizer = Arc::new(Optimizer::new(OptimizationConfig::default()));
        let source = StaticPeerSource {
            remotes: vec!["10.0.0.1".to_string()],
        };
        let bridge = Arc::new(TelemetryBridge::new(optimizer.clone(), source, Duration::from_millis(5)));
        let stop_handle = bridge.stop_handle();

        tokio_test::block_on(async {
            let bridge = bridge.clone();
            let run = tokio::spawn(async move { bridge.run().await });
            tokio::time::sleep(Duration::from_millis(30)).await;
            stop_handle.store(true, Ordering::SeqCst);
            tokio::time::timeout(Duration::from_secs(1), run)
                .await
                .expect("monitoring task should stop promptly after the flag is observed")
                .expect("monitoring task should not panic");
        });

        assert!(optimizer.get_route_report(None).total_routes >= 1);
    }
}
