//! Repository modules implementing persistence for investigation entities.
//!
//! Each module adds methods to `InqDb` via `impl InqDb` blocks. Statements
//! that must share a transaction are exposed as free functions taking a
//! `&libsql::Connection` (a `libsql::Transaction` derefs to one).

pub mod anomaly;
pub mod audit;
pub mod investigation;

pub use audit::AuditFilter;
pub use investigation::InvestigationFilter;

/// Default page size for list queries without an explicit limit.
pub const DEFAULT_LIMIT: u32 = 100;
