use async_trait::async_trait;
use inq_config::StoreBackend;
use inq_core::entities::{Anomaly, AuditEntry, Investigation};

use super::InvestigationStore;
use crate::InqDb;
use crate::error::DatabaseError;
use crate::repos::{AuditFilter, InvestigationFilter};

#[async_trait]
impl InvestigationStore for InqDb {
    fn backend(&self) -> StoreBackend {
        StoreBackend::Libsql
    }

    async fn insert(&self, inv: &Investigation, audit: &[AuditEntry]) -> Result<(), DatabaseError> {
        self.insert_investigation(inv, audit).await
    }

    async fn get(&self, id: &str) -> Result<Option<Investigation>, DatabaseError> {
        self.get_investigation(id).await
    }

    async fn update(
        &self,
        inv: &Investigation,
        expected_version: u64,
        anomaly: Option<&Anomaly>,
        audit: &[AuditEntry],
    ) -> Result<(), DatabaseError> {
        self.update_investigation(inv, expected_version, anomaly, audit)
            .await
    }

    async fn list(
        &self,
        filter: &InvestigationFilter,
    ) -> Result<Vec<Investigation>, DatabaseError> {
        self.list_investigations(filter).await
    }

    async fn list_anomalies(&self, investigation_id: &str) -> Result<Vec<Anomaly>, DatabaseError> {
        Self::list_anomalies(self, investigation_id).await
    }

    async fn query_audit(&self, filter: &AuditFilter) -> Result<Vec<AuditEntry>, DatabaseError> {
        Self::query_audit(self, filter).await
    }
}
