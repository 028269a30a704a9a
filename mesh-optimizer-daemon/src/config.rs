//! Daemon-level configuration: the optimizer's tunables plus the
//! composition root's own bind address and bootstrap peer list. Loaded
//! from an optional TOML file and then overridden by environment
//! variables, mirroring `ConfigManager::reload_from_file`'s
//! read-then-parse-then-validate shape in the teacher's
//! `nyx-daemon/src/config_manager.rs`.

use std::net::SocketAddr;
use std::path::Path;

use anyhow::{Context, Result};
use mesh_optimizer_core::OptimizationConfig;
use serde::{Deserialize, Serialize};

fn default_metrics_bind_addr() -> SocketAddr {
    "127.0.0.1:9931".parse().expect("static metrics bind address must parse")
}

/// Top-level daemon configuration, serialized/deserialized as TOML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub optimization: OptimizationConfig,
    pub metrics_bind_addr: SocketAddr,
    /// Peers the bundled `StaticPeerSource` reports, for local runs without
    /// a real overlay control channel. A production deployment swaps this
    /// for a `PeerSource` that talks to the overlay node.
    pub mock_peers: Vec<String>,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            optimization: OptimizationConfig::default(),
            metrics_bind_addr: default_metrics_bind_addr(),
            mock_peers: Vec::new(),
        }
    }
}

/// Load configuration from an optional TOML file, then apply environment
/// overrides. Absent `path` yields defaults plus env overrides.
pub fn load(path: Option<&Path>) -> Result<DaemonConfig> {
    let mut config = match path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("reading config file at {}", path.display()))?;
            toml::from_str(&content).with_context(|| format!("parsing TOML config at {}", path.display()))?
        }
        None => DaemonConfig::default(),
    };

    apply_env_overrides(&mut config);
    Ok(config)
}

/// `MESH_OPTIMIZER_*` environment overrides, applied after the file is
/// parsed so the file sets the baseline and the environment wins.
fn apply_env_overrides(config: &mut DaemonConfig) {
    if let Ok(v) = std::env::var("MESH_OPTIMIZER_METRICS_BIND_ADDR") {
        match v.parse() {
            Ok(addr) => config.metrics_bind_addr = addr,
            Err(e) => tracing::warn!(value = %v, error = %e, "ignoring invalid MESH_OPTIMIZER_METRICS_BIND_ADDR"),
        }
    }

    if let Ok(v) = std::env::var("MESH_OPTIMIZER_ROUTE_TIMEOUT_SECONDS") {
        match v.parse() {
            Ok(secs) => config.optimization.route_timeout_seconds = secs,
            Err(e) => tracing::warn!(value = %v, error = %e, "ignoring invalid MESH_OPTIMIZER_ROUTE_TIMEOUT_SECONDS"),
        }
    }

    if let Ok(v) = std::env::var("MESH_OPTIMIZER_PROBE_INTERVAL_SECONDS") {
        match v.parse() {
            Ok(secs) => config.optimization.probe_interval_seconds = secs,
            Err(e) => tracing::warn!(value = %v, error = %e, "ignoring invalid MESH_OPTIMIZER_PROBE_INTERVAL_SECONDS"),
        }
    }

    if let Ok(v) = std::env::var("MESH_OPTIMIZER_MOCK_PEERS") {
        config.mock_peers = v.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect();
    }
}
