#![forbid(unsafe_code)]

//! Composition root: wires a single owned `Optimizer` instance to the
//! telemetry bridge, enforcement dispatcher, and metrics endpoint. No
//! process-wide global — everything is constructed here and threaded
//! explicitly, per the design notes' singleton-avoidance guidance.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use mesh_optimizer_core::Optimizer;
use mesh_optimizer_daemon::config;
use mesh_optimizer_daemon::enforcement::{EnforcementDispatcher, NoopPeerEnforcer};
use mesh_optimizer_daemon::metrics_server::{record_optimization_report, MetricsServer};
use mesh_optimizer_daemon::telemetry_bridge::{StaticPeerSource, TelemetryBridge};
use tracing::info;

/// Routing optimizer daemon for a Yggdrasil-style mesh overlay.
#[derive(Parser, Debug)]
#[command(name = "mesh-optimizer-daemon", version, about)]
struct Cli {
    /// Path to a TOML config file. Falls back to defaults plus env
    /// overrides when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = config::load(cli.config.as_deref())?;

    let optimizer = Arc::new(Optimizer::new(config.optimization.clone()));

    let dispatcher = EnforcementDispatcher::new(NoopPeerEnforcer);
    optimizer.add_optimization_callback(Box::new(move |report| {
        dispatcher.dispatch(&report.recommendations);
    }));

    let metrics = MetricsServer::install()?;
    optimizer.add_optimization_callback(Box::new(record_optimization_report));
    metrics.serve(config.metrics_bind_addr).await?;

    let source = StaticPeerSource { remotes: config.mock_peers.clone() };
    let poll_interval = Duration::from_secs(config.optimization.probe_interval_seconds.max(1));
    let bridge = TelemetryBridge::new(optimizer.clone(), source, poll_interval);
    let stop_handle = bridge.stop_handle();

    info!(
        metrics_addr = %config.metrics_bind_addr,
        peers = config.mock_peers.len(),
        poll_interval_secs = poll_interval.as_secs(),
        "mesh-optimizer-daemon starting"
    );

    tokio::select! {
        _ = bridge.run() => {}
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                tracing::warn!(error = %e, "failed to install ctrl-c handler");
            }
            info!("shutdown signal received");
            stop_handle.store(true, std::sync::atomic::Ordering::SeqCst);
        }
    }

    Ok(())
}
