//! Applies executed governance proposals to the live optimizer
//! configuration. Mirrors the reference `DAOEnforcer.sync_config_with_dao`,
//! but routes writes through `OptimizationConfig::set_field` instead of
//! `setattr`/`hasattr` reflection.

use mesh_optimizer_core::Optimizer;
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::error::DaemonError;

/// One action embedded in an executed proposal. Only `update_config`
/// actions are recognized; anything else is ignored by `apply_actions`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProposalAction {
    UpdateConfig { params: UpdateConfigParams },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateConfigParams {
    pub key: String,
    pub value: Value,
}

/// An executed governance proposal, as handed to the daemon by whatever
/// adapter talks to the governance sink.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutedProposal {
    pub id: String,
    #[serde(default)]
    pub actions: Vec<ProposalAction>,
}

/// Parse a raw governance-sink payload (a JSON array of executed
/// proposals) into structured records. Malformed payloads are the one
/// place this crate surfaces a genuine `Err` rather than degrading
/// silently — the governance adapter, not the optimizer core, owns
/// deciding whether to retry or drop the whole batch.
pub fn parse_proposals(payload: &str) -> Result<Vec<ExecutedProposal>, DaemonError> {
    serde_json::from_str(payload).map_err(|e| DaemonError::governance(e.to_string()))
}

/// Apply every `update_config` action across `proposals` to `optimizer`'s
/// configuration. Unknown keys and mistyped values are dropped silently
/// (logged at warn) — this is the sole supported runtime-mutation path
/// for `OptimizationConfig`.
pub fn apply_proposals(optimizer: &Optimizer, proposals: &[ExecutedProposal]) {
    for proposal in proposals {
        for action in &proposal.actions {
            let ProposalAction::UpdateConfig { params } = action else {
                continue;
            };

            match optimizer.set_config_field(&params.key, &params.value) {
                Ok(()) => {
                    info!(proposal = %proposal.id, key = %params.key, value = %params.value, "governance config update applied");
                }
                Err(reason) => {
                    warn!(proposal = %proposal.id, key = %params.key, %reason, "governance config update rejected");
                }
            }
        }
    }
}
