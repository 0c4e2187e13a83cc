//! Error types for build engine operations.
//!
//! Completing an already-terminal record is not an error; that outcome is
//! carried by [`crate::core::completion::CompletionOutcome::AlreadyTerminal`].

use thiserror::Error;

/// Errors produced by the build engine.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Malformed input, rejected before any lock is taken.
    #[error("validation: {0}")]
    Validation(String),
    /// Balance cannot cover the requested costs; nothing was spent.
    #[error("insufficient resources: {0}")]
    InsufficientResources(String),
    /// Unknown build or user.
    #[error("not found: {0}")]
    NotFound(String),
    /// Underlying store failure with context.
    #[error("storage error: {0}")]
    Storage(String),
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
