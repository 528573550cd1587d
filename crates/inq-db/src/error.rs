//! Error types for inq-db.

use inq_core::errors::CoreError;
use thiserror::Error;

/// Errors from store and database operations.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// A SQL query failed or returned data that could not be decoded.
    #[error("Query failed: {0}")]
    Query(String),

    /// Schema migration failed.
    #[error("Migration failed: {0}")]
    Migration(String),

    /// Expected a row but none was returned.
    #[error("No result returned")]
    NoResult,

    /// The stored version moved on since the record was read.
    #[error("Version conflict on {id}: expected version {expected_version}")]
    Conflict { id: String, expected_version: u64 },

    /// Invalid state encountered (e.g., bad data in DB).
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Underlying libSQL error.
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// Catch-all for unexpected errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Errors surfaced by `InvestigationService` operations.
#[derive(Debug, Error)]
pub enum InvestigationError {
    /// No investigation with the given ID exists.
    #[error("Investigation not found: {id}")]
    NotFound { id: String },

    /// The lifecycle rejected the operation (transition, progress, validation).
    #[error(transparent)]
    Lifecycle(#[from] CoreError),

    /// The store failed. Never retried here.
    #[error("Persistence error: {0}")]
    Persistence(#[from] DatabaseError),
}

impl InvestigationError {
    #[must_use]
    pub fn is_invalid_transition(&self) -> bool {
        matches!(self, Self::Lifecycle(e) if e.is_invalid_transition())
    }

    #[must_use]
    pub fn is_invalid_progress(&self) -> bool {
        matches!(self, Self::Lifecycle(e) if e.is_invalid_progress())
    }

    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Persistence(DatabaseError::Conflict { .. }))
    }
}
