//! Minimal Prometheus metrics endpoint. Ambient observability, not part of
//! the core's public surface — the daemon is free to expose it however it
//! likes; this mirrors the teacher's `prometheus_exporter` shape without
//! its heavier OTLP/flamegraph machinery, which this crate has no use for.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use axum::{routing::get, Router};
use mesh_optimizer_core::OptimizationReport;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tokio::task::JoinHandle;
use tracing::info;

/// Export one optimization cycle's report into the global Prometheus
/// recorder, mirroring `zero_copy_bridge::start_zero_copy_metrics_task`'s
/// counter/gauge split: point-in-time counts (route totals, quality
/// histogram, averages) as gauges, the running recommendation total as a
/// counter.
pub fn record_optimization_report(report: &OptimizationReport) {
    metrics::gauge!("mesh_optimizer_total_routes").set(report.total_routes as f64);
    metrics::gauge!("mesh_optimizer_destinations").set(report.destinations as f64);
    metrics::counter!("mesh_optimizer_recommendations_total").increment(report.recommendations.len() as u64);

    let dist = &report.statistics.quality_distribution;
    metrics::gauge!("mesh_optimizer_routes_excellent").set(dist.excellent as f64);
    metrics::gauge!("mesh_optimizer_routes_good").set(dist.good as f64);
    metrics::gauge!("mesh_optimizer_routes_acceptable").set(dist.acceptable as f64);
    metrics::gauge!("mesh_optimizer_routes_poor").set(dist.poor as f64);
    metrics::gauge!("mesh_optimizer_routes_critical").set(dist.critical as f64);

    if let Some(avg) = report.statistics.avg_latency_ms {
        metrics::gauge!("mesh_optimizer_avg_latency_ms").set(avg);
    }
    if let Some(avg) = report.statistics.avg_packet_loss {
        metrics::gauge!("mesh_optimizer_avg_packet_loss").set(avg);
    }
}

#[derive(Clone)]
pub struct MetricsServer {
    handle: Arc<PrometheusHandle>,
}

impl MetricsServer {
    /// Install the global Prometheus recorder. Must be called at most
    /// once per process.
    pub fn install() -> Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("installing the global prometheus recorder")?;
        Ok(Self {
            handle: Arc::new(handle),
        })
    }

    pub async fn serve(&self, addr: SocketAddr) -> std::io::Result<JoinHandle<()>> {
        let handle = self.handle.clone();
        let app = Router::new().route(
            "/metrics",
            get(move || {
                let handle = handle.clone();
                async move {
                    let body = handle.render();
                    let mut response = body.into_response();
                    response
                        .headers_mut()
                        .insert(CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8".parse().unwrap());
                    response
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        info!(addr = %local_addr, "metrics endpoint listening");

        Ok(tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        }))
    }
}
