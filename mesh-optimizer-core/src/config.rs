//! Tunable parameters for route classification, scoring, learning, and the
//! optimization cycle. `OptimizationConfig` is a plain, enumerated-field
//! struct rather than a dynamically-typed map: the governance-sink write
//! path (see `mesh-optimizer-daemon::governance`) looks up a field by name
//! through an explicit match, not reflection.

use serde::{Deserialize, Serialize};

/// Quality-band thresholds plus scoring, learning, and cycle parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizationConfig {
    // Latency thresholds (ms), ascending.
    pub excellent_latency_ms: f64,
    pub good_latency_ms: f64,
    pub acceptable_latency_ms: f64,
    pub poor_latency_ms: f64,

    // Packet-loss thresholds (percent), ascending.
    pub excellent_loss_pct: f64,
    pub good_loss_pct: f64,
    pub acceptable_loss_pct: f64,
    pub poor_loss_pct: f64,

    // Reward-function weights (§4.3).
    pub latency_weight: f64,
    pub loss_weight: f64,
    pub bandwidth_weight: f64,
    pub hop_count_weight: f64,

    // Learning parameters.
    pub learning_rate: f64,
    pub decay_factor: f64,
    pub min_samples: u32,

    // Route selection / staleness.
    pub max_alternative_routes: usize,
    pub route_timeout_seconds: u64,
    pub probe_interval_seconds: u64,
}

impl Default for OptimizationConfig {
    fn default() -> Self {
        Self {
            excellent_latency_ms: 20.0,
            good_latency_ms: 50.0,
            acceptable_latency_ms: 100.0,
            poor_latency_ms: 200.0,

            excellent_loss_pct: 0.1,
            good_loss_pct: 1.0,
            acceptable_loss_pct: 3.0,
            poor_loss_pct: 10.0,

            latency_weight: 0.4,
            loss_weight: 0.3,
            bandwidth_weight: 0.2,
            hop_count_weight: 0.1,

            learning_rate: 0.1,
            decay_factor: 0.95,
            min_samples: 5,

            max_alternative_routes: 3,
            route_timeout_seconds: 300,
            probe_interval_seconds: 30,
        }
    }
}

impl OptimizationConfig {
    /// Set a single field by name, validating both key and value type.
    /// Unknown keys and mistyped values are rejected (the caller decides
    /// whether to log the rejection — see `governance::apply_action`).
    pub fn set_field(&mut self, key: &str, value: &serde_json::Value) -> std::result::Result<(), String> {
        macro_rules! set_f64 {
            ($field:ident) => {{
                match value.as_f64() {
                    Some(v) => {
                        self.$field = v;
                        Ok(())
                    }
                    None => Err(format!("{key} must be a number")),
                }
            }};
        }
        macro_rules! set_u64 {
            ($field:ident) => {{
                match value.as_u64() {
                    Some(v) => {
                        self.$field = v;
                        Ok(())
                    }
                    None => Err(format!("{key} must be a non-negative integer")),
                }
            }};
        }
        macro_rules! set_u32 {
            ($field:ident) => {{
                match value.as_u64() {
                    Some(v) if v <= u32::MAX as u64 => {
                        self.$field = v as u32;
                        Ok(())
                    }
                    _ => Err(format!("{key} must fit in a u32")),
                }
            }};
        }
        macro_rules! set_usize {
            ($field:ident) => {{
                match value.as_u64() {
                    Some(v) => {
                        self.$field = v as usize;
                        Ok(())
                    }
                    None => Err(format!("{key} must be a non-negative integer")),
                }
            }};
        }

        match key {
            "excellent_latency_ms" => set_f64!(excellent_latency_ms),
            "good_latency_ms" => set_f64!(good_latency_ms),
            "acceptable_latency_ms" => set_f64!(acceptable_latency_ms),
            "poor_latency_ms" => set_f64!(poor_latency_ms),
            "excellent_loss_pct" => set_f64!(excellent_loss_pct),
            "good_loss_pct" => set_f64!(good_loss_pct),
            "acceptable_loss_pct" => set_f64!(acceptable_loss_pct),
            "poor_loss_pct" => set_f64!(poor_loss_pct),
            "latency_weight" => set_f64!(latency_weight),
            "loss_weight" => set_f64!(loss_weight),
            "bandwidth_weight" => set_f64!(bandwidth_weight),
            "hop_count_weight" => set_f64!(hop_count_weight),
            "learning_rate" => set_f64!(learning_rate),
            "decay_factor" => set_f64!(decay_factor),
            "min_samples" => set_u32!(min_samples),
            "max_alternative_routes" => set_usize!(max_alternative_routes),
            "route_timeout_seconds" => set_u64!(route_timeout_seconds),
            "probe_interval_seconds" => set_u64!(probe_interval_seconds),
            other => Err(format!("unknown config key: {other}")),
        }
    }
}
