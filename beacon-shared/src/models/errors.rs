use thiserror::Error;

/// Result alias for notification store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Failures surfaced by a notification store accessor.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The store could not be reached (connection loss, pool exhaustion, I/O). Callers retry on
    /// their next cycle instead of failing permanently.
    #[error("notification store unavailable: {0}")]
    Unavailable(String),
    /// The store refused the operation because the input was invalid.
    #[error("notification store rejected request: {0}")]
    Rejected(String),
}

impl StoreError {
    /// Returns `true` when the failure is expected to clear on its own.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}
