#![forbid(unsafe_code)]

//! Composition-root pieces around `mesh-optimizer-core`: the telemetry
//! bridge, enforcement dispatcher, governance adapter, and metrics
//! endpoint. `main.rs` wires a single `Optimizer` instance to each of
//! these explicitly rather than reaching for a process-wide global.

pub mod config;
pub mod enforcement;
pub mod error;
pub mod governance;
pub mod metrics_server;
pub mod telemetry_bridge;
