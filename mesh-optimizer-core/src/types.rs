//! Core data model: `RouteMetrics`, derived scores, quality bands, and the
//! wire shapes emitted by the optimizer (`Recommendation`,
//! `OptimizationReport`, `RouteReport`).

use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::config::OptimizationConfig;

/// Quality classification derived solely from `latency_ms` and
/// `packet_loss_pct` using ordered thresholds. Both predicates must hold
/// for the higher band; this is a total function over any finite,
/// non-negative `(latency_ms, packet_loss_pct)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteQuality {
    Excellent,
    Good,
    Acceptable,
    Poor,
    Critical,
}

impl RouteQuality {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteQuality::Excellent => "excellent",
            RouteQuality::Good => "good",
            RouteQuality::Acceptable => "acceptable",
            RouteQuality::Poor => "poor",
            RouteQuality::Critical => "critical",
        }
    }

    pub fn classify(latency_ms: f64, packet_loss_pct: f64, cfg: &OptimizationConfig) -> Self {
        if latency_ms < cfg.excellent_latency_ms && packet_loss_pct < cfg.excellent_loss_pct {
            RouteQuality::Excellent
        } else if latency_ms < cfg.good_latency_ms && packet_loss_pct < cfg.good_loss_pct {
            RouteQuality::Good
        } else if latency_ms < cfg.acceptable_latency_ms && packet_loss_pct < cfg.acceptable_loss_pct {
            RouteQuality::Acceptable
        } else if latency_ms < cfg.poor_latency_ms && packet_loss_pct < cfg.poor_loss_pct {
            RouteQuality::Poor
        } else {
            RouteQuality::Critical
        }
    }
}

/// Derived, recomputed-after-every-update scores, each clamped to `[0, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteScores {
    pub quality_score: f64,
    pub reliability_score: f64,
    pub efficiency_score: f64,
}

impl RouteScores {
    pub fn compute(latency_ms: f64, jitter_ms: f64, packet_loss_pct: f64, bandwidth_mbps: f64, hop_count: u32) -> Self {
        let latency_score = (1.0 - latency_ms / 200.0).max(0.0);
        let loss_score = (1.0 - packet_loss_pct / 10.0).max(0.0);
        let quality_score = 0.6 * latency_score + 0.4 * loss_score;

        let jitter_penalty = (jitter_ms / 50.0).min(1.0);
        let reliability_score = (quality_score * (1.0 - jitter_penalty * 0.3)).max(0.0);

        let hops = hop_count.max(1) as f64;
        let efficiency_score = (bandwidth_mbps / (100.0 * hops)).min(1.0);

        Self {
            quality_score,
            reliability_score,
            efficiency_score,
        }
    }
}

/// One known (next_hop, destination) pair and its metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteMetrics {
    pub route_id: String,
    pub destination: String,
    pub next_hop: String,

    pub latency_ms: f64,
    pub jitter_ms: f64,
    pub packet_loss_pct: f64,
    pub bandwidth_mbps: f64,
    pub hop_count: u32,

    #[serde(skip, default = "Instant::now")]
    pub last_updated: Instant,
    pub sample_count: u64,

    pub scores: RouteScores,
}

impl RouteMetrics {
    /// Construct a fresh route with the given identity and defaults for
    /// every primitive metric (§3: `0/0/0/0/1`).
    pub fn new(route_id: impl Into<String>, destination: impl Into<String>, next_hop: impl Into<String>) -> Self {
        let mut route = Self {
            route_id: route_id.into(),
            destination: destination.into(),
            next_hop: next_hop.into(),
            latency_ms: 0.0,
            jitter_ms: 0.0,
            packet_loss_pct: 0.0,
            bandwidth_mbps: 0.0,
            hop_count: 1,
            last_updated: Instant::now(),
            sample_count: 0,
            scores: RouteScores::default(),
        };
        route.recompute_scores();
        route
    }

    /// Recompute `scores` as a pure function of the current primitive
    /// metrics. Must be called after any mutation of latency/jitter/loss/
    /// bandwidth/hop_count.
    pub fn recompute_scores(&mut self) {
        self.scores = RouteScores::compute(
            self.latency_ms,
            self.jitter_ms,
            self.packet_loss_pct,
            self.bandwidth_mbps,
            self.hop_count,
        );
    }

    pub fn classify_quality(&self, cfg: &OptimizationConfig) -> RouteQuality {
        RouteQuality::classify(self.latency_ms, self.packet_loss_pct, cfg)
    }

    /// `reward = 0.5*quality + 0.3*reliability + 0.2*efficiency`, clamped.
    pub fn reward(&self) -> f64 {
        let r = 0.5 * self.scores.quality_score + 0.3 * self.scores.reliability_score + 0.2 * self.scores.efficiency_score;
        r.clamp(0.0, 1.0)
    }
}

/// A set of updatable metric fields; `None` leaves the corresponding field
/// untouched (§4.1 `update`).
#[derive(Debug, Clone, Default)]
pub struct MetricsDelta {
    pub latency_ms: Option<f64>,
    pub jitter_ms: Option<f64>,
    pub packet_loss_pct: Option<f64>,
    pub bandwidth_mbps: Option<f64>,
}

/// An operator/dispatcher-visible action emitted by an optimization cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub route_id: String,
    pub destination: String,
    pub action: String,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<RecommendationMetrics>,
}

/// The metrics-snapshot embedded in a recommendation, frozen at emission
/// time rather than referencing the live `RouteMetrics`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationMetrics {
    pub latency_ms: f64,
    pub packet_loss_pct: f64,
    pub quality_score: f64,
}

impl From<&RouteMetrics> for RecommendationMetrics {
    fn from(r: &RouteMetrics) -> Self {
        Self {
            latency_ms: r.latency_ms,
            packet_loss_pct: r.packet_loss_pct,
            quality_score: r.scores.quality_score,
        }
    }
}

/// Quality-band histogram across every route at scan time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QualityDistribution {
    pub excellent: u64,
    pub good: u64,
    pub acceptable: u64,
    pub poor: u64,
    pub critical: u64,
}

impl QualityDistribution {
    pub fn record(&mut self, q: RouteQuality) {
        match q {
            RouteQuality::Excellent => self.excellent += 1,
            RouteQuality::Good => self.good += 1,
            RouteQuality::Acceptable => self.acceptable += 1,
            RouteQuality::Poor => self.poor += 1,
            RouteQuality::Critical => self.critical += 1,
        }
    }
}

/// Aggregate latency/loss statistics, present only when `total_routes > 0`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationStatistics {
    pub quality_distribution: QualityDistribution,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_latency_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_packet_loss: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_latency_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_latency_ms: Option<f64>,
}

/// The report produced by a single `optimize_routes` cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationReport {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub total_routes: usize,
    pub destinations: usize,
    pub recommendations: Vec<Recommendation>,
    pub statistics: OptimizationStatistics,
}

/// Per-route snapshot entry within a `RouteReport`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteReportEntry {
    pub route_id: String,
    pub destination: String,
    pub next_hop: String,
    pub quality: String,
    pub metrics: RouteReportMetrics,
    pub scores: RouteScores,
    pub last_updated: chrono::DateTime<chrono::Utc>,
    pub sample_count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteReportMetrics {
    pub latency_ms: f64,
    pub predicted_latency_ms: Option<f64>,
    pub prediction_confidence: f64,
    pub jitter_ms: f64,
    pub packet_loss: f64,
    pub bandwidth_mbps: f64,
    pub hop_count: u32,
}

/// A point-in-time snapshot of some or all registered routes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteReport {
    pub generated_at: chrono::DateTime<chrono::Utc>,
    pub total_routes: usize,
    pub routes: Vec<RouteReportEntry>,
}
