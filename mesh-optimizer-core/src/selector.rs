//! Multi-armed bandit path selection: Thompson Sampling over per-route
//! Beta(alpha, beta) posteriors, with decay so the posterior never fully
//! calcifies.

use std::collections::HashMap;
use std::f64::consts::PI;

use rand::Rng;

use crate::config::OptimizationConfig;

#[derive(Debug, Clone, Copy)]
struct BanditState {
    alpha: f64,
    beta: f64,
    selections: u64,
}

impl Default for BanditState {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            beta: 1.0,
            selections: 0,
        }
    }
}

/// Per-route Beta posteriors plus Thompson-Sampling selection among a
/// candidate list.
#[derive(Debug, Default)]
pub struct AdaptivePathSelector {
    states: HashMap<String, BanditState>,
}

impl AdaptivePathSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a bandit state (alpha = beta = 1, uniform prior) if absent.
    pub fn register(&mut self, route_id: &str) {
        self.states.entry(route_id.to_string()).or_default();
    }

    /// Tie the bandit's lifetime to the registry entry.
    pub fn remove(&mut self, route_id: &str) {
        self.states.remove(route_id);
    }

    /// `alpha += reward`, `beta += (1 - reward)`, then shrink each
    /// deviation-from-1 by `decay_factor`.
    pub fn update_reward(&mut self, route_id: &str, reward: f64, cfg: &OptimizationConfig) {
        let state = self.states.entry(route_id.to_string()).or_default();
        state.alpha += reward;
        state.beta += 1.0 - reward;

        let decay = cfg.decay_factor;
        state.alpha = 1.0 + (state.alpha - 1.0) * decay;
        state.beta = 1.0 + (state.beta - 1.0) * decay;
    }

    /// Select among `candidates` via Thompson Sampling. Candidates without
    /// registered bandit state are filtered out first; if that leaves
    /// nothing, fall back to the first element of the original list (or
    /// `None` if it was empty). Ties are broken by iteration order over
    /// `candidates` (first max wins).
    pub fn select<R: Rng + ?Sized>(&mut self, candidates: &[String], rng: &mut R) -> Option<String> {
        let eligible: Vec<&String> = candidates.iter().filter(|id| self.states.contains_key(*id)).collect();

        if eligible.is_empty() {
            return candidates.first().cloned();
        }

        let mut best: Option<(&String, f64)> = None;
        for id in eligible {
            let state = self.states[id];
            let sample = sample_beta(state.alpha, state.beta, rng);
            let is_better = match best {
                None => true,
                Some((_, best_sample)) => sample > best_sample,
            };
            if is_better {
                best = Some((id, sample));
            }
        }

        let winner = best.map(|(id, _)| id.clone());
        if let Some(ref id) = winner {
            if let Some(state) = self.states.get_mut(id) {
                state.selections += 1;
            }
        }
        winner
    }

    #[cfg(test)]
    fn alpha_beta(&self, route_id: &str) -> (f64, f64) {
        let s = self.states[route_id];
        (s.alpha, s.beta)
    }
}

/// Sample from `Beta(alpha, beta)` as the ratio of two Gamma draws
/// (Marsaglia–Tsang gamma-ratio method), matching the reference
/// implementation's approach.
fn sample_beta<R: Rng + ?Sized>(alpha: f64, beta: f64, rng: &mut R) -> f64 {
    let x = sample_gamma(alpha, rng);
    let y = sample_gamma(beta, rng);
    if x + y > 0.0 {
        x / (x + y)
    } else {
        0.5
    }
}

/// Marsaglia–Tsang Gamma(shape, scale=1) sampler, boosted for `shape < 1`.
fn sample_gamma<R: Rng + ?Sized>(shape: f64, rng: &mut R) -> f64 {
    if shape < 1.0 {
        let boosted = sample_gamma(shape + 1.0, rng);
        let u: f64 = rng.gen();
        return boosted * u.powf(1.0 / shape);
    }

    let d = shape - 1.0 / 3.0;
    let c = 1.0 / (9.0 * d).sqrt();

    loop {
        let (x, v) = loop {
            let x = standard_normal(rng);
            let v = 1.0 + c * x;
            if v > 0.0 {
                break (x, v * v * v);
            }
        };

        let u: f64 = rng.gen();
        if u < 1.0 - 0.0331 * x * x * x * x {
            return d * v;
        }
        if u.ln() < 0.5 * x * x + d * (1.0 - v + v.ln()) {
            return d * v;
        }
    }
}

/// Box-Muller standard normal draw, avoiding an extra crate dependency for
/// a single distribution.
fn standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    let u1: f64 = rng.gen::<f64>().max(f64::MIN_POSITIVE);
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}
