//! Stateless fan-out over a recommendation sequence: routes each record to
//! the peer-restart primitive or a downgrade/record path by action kind.
//! Mirrors the reference `MeshActionEnforcer`.

use mesh_optimizer_core::Recommendation;
use tracing::{info, warn};

/// External collaborator that applies a `refresh` recommendation to the
/// overlay. The core's design point is the dispatch, not the overlay
/// surgery — a no-op implementation is a legitimate production choice.
pub trait PeerEnforcer: Send + Sync {
    fn restart_peer(&self, route_id: &str);
}

/// Logging-only `PeerEnforcer` that ignores anything not shaped like
/// `direct-<peer>`.
pub struct NoopPeerEnforcer;

impl PeerEnforcer for NoopPeerEnforcer {
    fn restart_peer(&self, route_id: &str) {
        let Some(peer_addr) = route_id.strip_prefix("direct-") else {
            return;
        };
        info!(peer = peer_addr, "would restart peer connection");
    }
}

/// Dispatches recommendations to an injected `PeerEnforcer`.
pub struct EnforcementDispatcher<E: PeerEnforcer> {
    enforcer: E,
}

impl<E: PeerEnforcer> EnforcementDispatcher<E> {
    pub fn new(enforcer: E) -> Self {
        Self { enforcer }
    }

    pub fn dispatch(&self, recommendations: &[Recommendation]) {
        for rec in recommendations {
            match rec.action.as_str() {
                "refresh" => {
                    info!(route_id = %rec.route_id, "refreshing route");
                    self.enforcer.restart_peer(&rec.route_id);
                }
                "investigate" => {
                    warn!(route_id = %rec.route_id, reason = %rec.reason, "route quality low, downgrading");
                }
                other => {
                    // Missing or unrecognized action: ignored silently per design.
                    let _ = other;
                }
            }
        }
    }
}
