//! Storage seam behind `InvestigationService`.
//!
//! Two implementations: [`MemoryStore`] for tests and throwaway runs, and
//! [`InqDb`] for the embedded libSQL database. Both enforce the same
//! compare-and-set contract on `update`.

mod libsql_store;
mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use inq_config::{DatabaseConfig, StoreBackend};
use inq_core::entities::{Anomaly, AuditEntry, Investigation};

use crate::InqDb;
use crate::error::DatabaseError;
use crate::repos::{AuditFilter, InvestigationFilter};

pub use memory::MemoryStore;

/// Persistence operations the investigation service depends on.
#[async_trait]
pub trait InvestigationStore: Send + Sync {
    /// Which backend this store is.
    fn backend(&self) -> StoreBackend;

    /// Insert a new investigation and its creation audit entries.
    async fn insert(&self, inv: &Investigation, audit: &[AuditEntry]) -> Result<(), DatabaseError>;

    /// Owned snapshot of one investigation.
    async fn get(&self, id: &str) -> Result<Option<Investigation>, DatabaseError>;

    /// Replace `inv` if its stored version equals `expected_version`, and
    /// record the optional anomaly and audit entries atomically with it.
    ///
    /// Returns `DatabaseError::Conflict` on a version mismatch and
    /// `DatabaseError::NoResult` if the record does not exist.
    async fn update(
        &self,
        inv: &Investigation,
        expected_version: u64,
        anomaly: Option<&Anomaly>,
        audit: &[AuditEntry],
    ) -> Result<(), DatabaseError>;

    async fn list(&self, filter: &InvestigationFilter) -> Result<Vec<Investigation>, DatabaseError>;

    async fn list_anomalies(&self, investigation_id: &str) -> Result<Vec<Anomaly>, DatabaseError>;

    async fn query_audit(&self, filter: &AuditFilter) -> Result<Vec<AuditEntry>, DatabaseError>;
}

/// Open the store selected by `config.backend`.
///
/// # Errors
///
/// Returns `DatabaseError` if the libSQL database cannot be opened or migrated.
pub async fn open_store(
    config: &DatabaseConfig,
) -> Result<Arc<dyn InvestigationStore>, DatabaseError> {
    match config.backend {
        StoreBackend::Memory => Ok(Arc::new(MemoryStore::new())),
        StoreBackend::Libsql => Ok(Arc::new(InqDb::open_local(&config.path).await?)),
    }
}
