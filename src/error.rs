use thiserror::Error;

/// Failures raised by the simulation core.
///
/// Orchestration code wraps these in [`anyhow::Error`] with context; they stay
/// reachable through `downcast_ref` for callers that branch on the kind.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    /// Invalid sample count, price threshold or budget.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// Price series missing, too short or malformed.
    #[error("invalid price data: {0}")]
    DataSource(String),

    /// Price lookup outside the series under the active index policy.
    #[error("price index {index} is out of range for a series of {len} prices")]
    IndexPolicy { index: i64, len: usize },

    /// The engine already ran its month.
    #[error("engine has already completed its month")]
    EngineCompleted,
}
