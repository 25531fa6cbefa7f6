//! Errors in the library.
use thiserror::Error;

/// Errors in the library.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReplayError {
    /// Invalid parameter given at construction time.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Sampling was requested from a store holding no transitions.
    ///
    /// This is the only recoverable error; the caller should skip the replay cycle.
    #[error("Replay store is empty")]
    EmptyStore,

    /// The caller broke the contract of an operation, e.g., mismatched
    /// lengths or an out-of-range slot index.
    #[error("Contract violation: {0}")]
    ContractViolation(String),

    /// Record key error.
    #[error("Record key error: {0}")]
    RecordKey(String),

    /// Record value type error.
    #[error("Record value type error: {0}")]
    RecordValueType(String),
}

impl ReplayError {
    /// Returns `true` for [`ReplayError::EmptyStore`].
    pub fn is_empty_store(&self) -> bool {
        matches!(self, ReplayError::EmptyStore)
    }
}
