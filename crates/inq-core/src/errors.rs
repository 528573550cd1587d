//! Cross-cutting error types for Inquest.
//!
//! Lifecycle violations originate here. Storage errors (`DatabaseError`) and
//! the service-level `InvestigationError` live in `inq-db`.

use thiserror::Error;

/// Errors that can be raised by any Inquest crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// An operation was attempted from a status that does not allow it.
    #[error("Invalid state transition: {entity_type} {id} cannot {operation} from {from}")]
    InvalidTransition {
        entity_type: String,
        id: String,
        from: String,
        operation: String,
    },

    /// A progress value or counter was out of range or moved backwards.
    #[error("Invalid progress for {id}: {reason}")]
    InvalidProgress { id: String, reason: String },

    /// Data failed validation (format, constraints).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Catch-all for unexpected errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CoreError {
    #[must_use]
    pub const fn is_invalid_transition(&self) -> bool {
        matches!(self, Self::InvalidTransition { .. })
    }

    #[must_use]
    pub const fn is_invalid_progress(&self) -> bool {
        matches!(self, Self::InvalidProgress { .. })
    }
}
