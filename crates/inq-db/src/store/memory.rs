//! In-process investigation store.

use std::collections::HashMap;

use async_trait::async_trait;
use inq_config::StoreBackend;
use inq_core::entities::{Anomaly, AuditEntry, Investigation};
use tokio::sync::RwLock;

use super::InvestigationStore;
use crate::error::DatabaseError;
use crate::repos::{AuditFilter, DEFAULT_LIMIT, InvestigationFilter};

#[derive(Debug, Default)]
struct Tables {
    /// Investigation plus its insertion sequence, used as a tie-breaker.
    investigations: HashMap<String, (u64, Investigation)>,
    next_seq: u64,
    anomalies: Vec<Anomaly>,
    audit: Vec<AuditEntry>,
}

/// Map-backed store. Every write happens under one write lock, so readers
/// never observe half of an update.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn limit(requested: Option<u32>) -> usize {
    usize::try_from(requested.unwrap_or(DEFAULT_LIMIT)).unwrap_or(usize::MAX)
}

#[async_trait]
impl InvestigationStore for MemoryStore {
    fn backend(&self) -> StoreBackend {
        StoreBackend::Memory
    }

    async fn insert(&self, inv: &Investigation, audit: &[AuditEntry]) -> Result<(), DatabaseError> {
        let mut tables = self.tables.write().await;
        if tables.investigations.contains_key(&inv.id) {
            return Err(DatabaseError::Query(format!(
                "investigation {} already exists",
                inv.id
            )));
        }
        let seq = tables.next_seq;
        tables.next_seq += 1;
        tables
            .investigations
            .insert(inv.id.clone(), (seq, inv.clone()));
        tables.audit.extend_from_slice(audit);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Investigation>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables.investigations.get(id).map(|(_, inv)| inv.clone()))
    }

    async fn update(
        &self,
        inv: &Investigation,
        expected_version: u64,
        anomaly: Option<&Anomaly>,
        audit: &[AuditEntry],
    ) -> Result<(), DatabaseError> {
        if let Some(anomaly) = anomaly {
            if !(0.0..=1.0).contains(&anomaly.confidence) {
                return Err(DatabaseError::Query(format!(
                    "anomaly confidence {} violates range check",
                    anomaly.confidence
                )));
            }
        }

        let mut tables = self.tables.write().await;
        let Some((_, stored)) = tables.investigations.get_mut(&inv.id) else {
            return Err(DatabaseError::NoResult);
        };
        if stored.version != expected_version {
            return Err(DatabaseError::Conflict {
                id: inv.id.clone(),
                expected_version,
            });
        }
        *stored = inv.clone();
        if let Some(anomaly) = anomaly {
            tables.anomalies.push(anomaly.clone());
        }
        tables.audit.extend_from_slice(audit);
        Ok(())
    }

    async fn list(
        &self,
        filter: &InvestigationFilter,
    ) -> Result<Vec<Investigation>, DatabaseError> {
        let tables = self.tables.read().await;
        let mut matching: Vec<&(u64, Investigation)> = tables
            .investigations
            .values()
            .filter(|(_, inv)| filter.matches(inv))
            .collect();
        matching.sort_by(|(seq_a, a), (seq_b, b)| {
            a.created_at.cmp(&b.created_at).then(seq_a.cmp(seq_b))
        });
        if !filter.oldest_first {
            matching.reverse();
        }
        Ok(matching
            .into_iter()
            .take(limit(filter.limit))
            .map(|(_, inv)| inv.clone())
            .collect())
    }

    async fn list_anomalies(&self, investigation_id: &str) -> Result<Vec<Anomaly>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables
            .anomalies
            .iter()
            .filter(|a| a.investigation_id == investigation_id)
            .cloned()
            .collect())
    }

    async fn query_audit(&self, filter: &AuditFilter) -> Result<Vec<AuditEntry>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables
            .audit
            .iter()
            .filter(|e| filter.matches(e))
            .take(limit(filter.limit))
            .cloned()
            .collect())
    }
}
