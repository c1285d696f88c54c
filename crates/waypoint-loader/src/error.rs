//! Error types for loading, validation, and actions

use std::sync::Arc;

use thiserror::Error;

/// Failure surfaced by the loading pipeline
///
/// `Cancelled` is internal bookkeeping: a cancelled load is silently
/// dropped and never reaches the route state.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Parameter validation rejected the route's params before the loader ran
    #[error("validation failed: {0}")]
    Validation(String),

    /// The route's loader itself failed
    #[error("loader failed: {0}")]
    Loader(anyhow::Error),

    /// The route's action failed
    #[error("action failed: {0}")]
    Action(anyhow::Error),

    /// The load was superseded or torn down before completing
    #[error("load cancelled")]
    Cancelled,
}

impl LoadError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, LoadError::Cancelled)
    }

    /// Whether the retry policy applies to this failure
    ///
    /// Validation failures are deterministic and cancellations are final,
    /// so only loader failures are worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LoadError::Loader(_))
    }
}

/// Shared error handle stored in route snapshots
///
/// Snapshots are cloned on every read, so errors are reference counted
/// rather than copied.
pub type SharedError = Arc<LoadError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(LoadError::Loader(anyhow::anyhow!("boom")).is_retryable());
        assert!(!LoadError::Validation("bad id".into()).is_retryable());
        assert!(!LoadError::Cancelled.is_retryable());
        assert!(!LoadError::Action(anyhow::anyhow!("nope")).is_retryable());
    }

    #[test]
    fn test_display_includes_source() {
        let err = LoadError::Loader(anyhow::anyhow!("connection refused"));
        assert!(err.to_string().contains("loader failed"));
    }
}
