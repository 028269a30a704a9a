//! Per-route EWMA-with-trend latency forecaster.

use std::collections::{HashMap, VecDeque};

use crate::config::OptimizationConfig;

const HISTORY_CAP: usize = 100;

#[derive(Debug, Clone)]
struct PredictorState {
    history: VecDeque<f64>,
    ewma: f64,
    trend: f64,
}

/// Produces a one-step-ahead latency forecast per route, with a
/// sample-count-derived confidence signal.
#[derive(Debug, Default)]
pub struct LatencyPredictor {
    states: HashMap<String, PredictorState>,
}

impl LatencyPredictor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove a route's predictor state, tying its lifetime to the
    /// registry entry (§9: "do not let `unregister` leak predictor ...
    /// state").
    pub fn remove(&mut self, route_id: &str) {
        self.states.remove(route_id);
    }

    /// Append a new observation and return the updated one-step forecast
    /// (`ewma' + trend'`).
    pub fn update(&mut self, route_id: &str, latency_ms: f64, cfg: &OptimizationConfig) -> f64 {
        let alpha = cfg.learning_rate;
        let state = self.states.entry(route_id.to_string()).or_insert_with(|| PredictorState {
            history: VecDeque::new(),
            ewma: latency_ms,
            trend: 0.0,
        });

        let previous_sample = state.history.back().copied();

        state.history.push_back(latency_ms);
        if state.history.len() > HISTORY_CAP {
            state.history.pop_front();
        }

        state.ewma = alpha * latency_ms + (1.0 - alpha) * state.ewma;

        if let Some(prev) = previous_sample {
            let raw_trend = latency_ms - prev;
            state.trend = alpha * raw_trend + (1.0 - alpha) * state.trend;
        }

        state.ewma + state.trend
    }

    /// One-step forecast for a known route, `None` otherwise.
    pub fn predict(&self, route_id: &str) -> Option<f64> {
        self.states.get(route_id).map(|s| s.ewma + s.trend)
    }

    /// `0` below `min_samples` observations, else `min(1, n/50)`.
    pub fn confidence(&self, route_id: &str, cfg: &OptimizationConfig) -> f64 {
        let Some(state) = self.states.get(route_id) else {
            return 0.0;
        };
        let n = state.history.len() as u64;
        if n < cfg.min_samples as u64 {
            0.0
        } else {
            (n as f64 / 50.0).min(1.0)
        }
    }
}
