use thiserror::Error;

pub type Result<T, E = OptimizerError> = core::result::Result<T, E>;

/// Errors the core itself can raise.
///
/// Per the error-handling policy, most lookups against an unknown
/// `route_id` or empty destination surface as `None`/`Option` rather than
/// an `Err` here — this enum only covers genuine internal-invariant
/// violations, not "the caller asked about something that doesn't exist".
#[derive(Debug, Error)]
pub enum OptimizerError {
    #[error("config: {0}")]
    Config(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl OptimizerError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
