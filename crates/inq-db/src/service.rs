//! Service layer orchestrating investigation mutations.
//!
//! `InvestigationService` owns an injected store, a JSONL trail writer, and
//! per-record locks. Every mutation follows this protocol:
//! 1. Acquire the record lock
//! 2. Load an owned snapshot from the store
//! 3. Apply the lifecycle operation (rejections leave the store untouched)
//! 4. Bump `version` and compare-and-set the record, together with any
//!    anomaly and the derived audit entries
//! 5. Append the lifecycle event to the trail
//!
//! Store errors are returned as-is; nothing here retries.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use inq_config::InqConfig;
use inq_core::audit_detail::{AnomalyRecordedDetail, ProgressDetail, StatusChangedDetail};
use inq_core::entities::{Anomaly, AuditEntry, Investigation, NewAnomaly, NewInvestigation};
use inq_core::enums::{AuditAction, EntityType, InvestigationStatus, LifecycleOp};
use inq_core::errors::CoreError;
use inq_core::ids::{PREFIX_ANOMALY, PREFIX_AUDIT, PREFIX_INVESTIGATION, generate_id};
use inq_core::lifecycle::{Completion, ProgressUpdate};
use inq_core::trail::LifecycleEvent;
use tracing::{debug, info, warn};

use crate::error::{DatabaseError, InvestigationError};
use crate::locks::RecordLocks;
use crate::repos::{AuditFilter, InvestigationFilter};
use crate::store::{InvestigationStore, MemoryStore, open_store};
use crate::trail::TrailWriter;

/// How many pending records `claim_next` considers per call.
const CLAIM_BATCH: u32 = 16;

/// Metadata key recording which worker claimed an investigation.
pub const WORKER_ID_KEY: &str = "worker_id";

/// What a mutation contributes beyond the record itself.
struct Mutation {
    op: LifecycleOp,
    /// Trail payload.
    data: serde_json::Value,
    anomaly: Option<Anomaly>,
    /// Carried into the status-change audit detail.
    reason: Option<String>,
}

impl Mutation {
    const fn new(op: LifecycleOp, data: serde_json::Value) -> Self {
        Self {
            op,
            data,
            anomaly: None,
            reason: None,
        }
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<serde_json::Value, DatabaseError> {
    serde_json::to_value(value).map_err(|e| DatabaseError::Other(e.into()))
}

fn audit_entry(
    inv: &Investigation,
    entity_type: EntityType,
    entity_id: &str,
    action: AuditAction,
    detail: Option<serde_json::Value>,
    now: DateTime<Utc>,
) -> Result<AuditEntry, InvestigationError> {
    Ok(AuditEntry {
        id: generate_id(PREFIX_AUDIT)?,
        investigation_id: inv.id.clone(),
        entity_type,
        entity_id: entity_id.to_string(),
        action,
        detail,
        created_at: now,
    })
}

pub struct InvestigationService {
    store: Arc<dyn InvestigationStore>,
    trail: TrailWriter,
    locks: RecordLocks,
}

impl InvestigationService {
    #[must_use]
    pub fn new(store: Arc<dyn InvestigationStore>, trail: TrailWriter) -> Self {
        Self {
            store,
            trail,
            locks: RecordLocks::new(),
        }
    }

    /// In-memory store, trail disabled.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()), TrailWriter::disabled())
    }

    /// Build the store and trail described by `config`.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the store cannot be opened or the trail
    /// directory cannot be created.
    pub async fn from_config(config: &InqConfig) -> Result<Self, DatabaseError> {
        let store = open_store(&config.database).await?;
        let trail = match config.trail.active_dir() {
            Some(dir) => TrailWriter::new(dir)?,
            None => TrailWriter::disabled(),
        };
        Ok(Self::new(store, trail))
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn InvestigationStore> {
        &self.store
    }

    #[must_use]
    pub const fn trail(&self) -> &TrailWriter {
        &self.trail
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// # Errors
    ///
    /// `InvestigationError::NotFound` for an unknown id.
    pub async fn get(&self, id: &str) -> Result<Investigation, InvestigationError> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| InvestigationError::NotFound { id: id.to_string() })
    }

    /// # Errors
    ///
    /// Returns `InvestigationError::Persistence` if the store fails.
    pub async fn list(
        &self,
        filter: &InvestigationFilter,
    ) -> Result<Vec<Investigation>, InvestigationError> {
        Ok(self.store.list(filter).await?)
    }

    /// Anomalies recorded for an existing investigation.
    ///
    /// # Errors
    ///
    /// `InvestigationError::NotFound` for an unknown id.
    pub async fn anomalies(&self, id: &str) -> Result<Vec<Anomaly>, InvestigationError> {
        self.get(id).await?;
        Ok(self.store.list_anomalies(id).await?)
    }

    /// # Errors
    ///
    /// Returns `InvestigationError::Persistence` if the store fails.
    pub async fn audit(&self, filter: &AuditFilter) -> Result<Vec<AuditEntry>, InvestigationError> {
        Ok(self.store.query_audit(filter).await?)
    }

    /// Lifecycle events mirrored to the trail for an existing investigation.
    ///
    /// # Errors
    ///
    /// - `InvestigationError::NotFound` for an unknown id.
    /// - `InvestigationError::Persistence` if the trail file is unreadable.
    pub async fn trail_events(&self, id: &str) -> Result<Vec<LifecycleEvent>, InvestigationError> {
        self.get(id).await?;
        Ok(self.trail.read(id)?)
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Create a `pending` investigation.
    ///
    /// # Errors
    ///
    /// - `CoreError::Validation` (via `InvestigationError::Lifecycle`) for a
    ///   blank user or query.
    /// - `InvestigationError::Persistence` if the insert fails.
    pub async fn submit(
        &self,
        request: NewInvestigation,
    ) -> Result<Investigation, InvestigationError> {
        let now = Utc::now();
        let inv = Investigation::submit(generate_id(PREFIX_INVESTIGATION)?, request, now)?;
        let created = audit_entry(
            &inv,
            EntityType::Investigation,
            &inv.id,
            AuditAction::Created,
            Some(serde_json::json!({
                "user_id": inv.user_id,
                "data_source": inv.data_source,
            })),
            now,
        )?;

        self.store.insert(&inv, &[created]).await?;
        self.mirror(&inv.id, LifecycleOp::Submit, to_json(&inv)?, now);
        info!(
            id = %inv.id,
            user_id = %inv.user_id,
            source = %inv.data_source,
            "investigation submitted"
        );
        Ok(inv)
    }

    /// `pending → running`.
    ///
    /// # Errors
    ///
    /// `NotFound`, `InvalidTransition`, or `Persistence` (including `Conflict`).
    pub async fn start(&self, id: &str) -> Result<Investigation, InvestigationError> {
        let mutation = Mutation::new(LifecycleOp::Start, serde_json::json!({}));
        self.mutate(id, Utc::now(), mutation, |inv, now| inv.start(now))
            .await
    }

    /// Record progress on a running investigation.
    ///
    /// # Errors
    ///
    /// `NotFound`, `InvalidTransition`, `InvalidProgress`, or `Persistence`.
    pub async fn advance(
        &self,
        id: &str,
        update: &ProgressUpdate,
    ) -> Result<Investigation, InvestigationError> {
        let mutation = Mutation::new(LifecycleOp::Advance, to_json(update)?);
        self.mutate(id, Utc::now(), mutation, |inv, now| inv.advance(update, now))
            .await
    }

    /// Persist an anomaly and append it to the investigation's results.
    ///
    /// # Errors
    ///
    /// - `CoreError::Validation` for a blank type or a confidence outside `[0.0, 1.0]`.
    /// - `NotFound`, `InvalidTransition`, or `Persistence`.
    pub async fn record_anomaly(
        &self,
        id: &str,
        request: NewAnomaly,
    ) -> Result<(Investigation, Anomaly), InvestigationError> {
        if request.anomaly_type.trim().is_empty() {
            return Err(CoreError::Validation("anomaly_type must not be empty".into()).into());
        }
        if !request.confidence.is_finite() || !(0.0..=1.0).contains(&request.confidence) {
            return Err(CoreError::Validation(format!(
                "anomaly confidence {} is outside [0.0, 1.0]",
                request.confidence
            ))
            .into());
        }

        let now = Utc::now();
        let anomaly = Anomaly {
            id: generate_id(PREFIX_ANOMALY)?,
            investigation_id: id.to_string(),
            anomaly_type: request.anomaly_type,
            severity: request.severity,
            confidence: request.confidence,
            description: request.description,
            contract_id: request.contract_id,
            evidence: request.evidence,
            created_at: now,
        };
        let finding = anomaly.as_result();
        let mut mutation = Mutation::new(LifecycleOp::Anomaly, to_json(&anomaly)?);
        mutation.anomaly = Some(anomaly.clone());

        let inv = self
            .mutate(id, now, mutation, |inv, now| inv.record_anomaly(finding, now))
            .await?;
        Ok((inv, anomaly))
    }

    /// `running → completed`.
    ///
    /// # Errors
    ///
    /// `NotFound`, `InvalidTransition`, `InvalidProgress`, `Validation`, or `Persistence`.
    pub async fn complete(
        &self,
        id: &str,
        completion: Completion,
    ) -> Result<Investigation, InvestigationError> {
        let mutation = Mutation::new(LifecycleOp::Complete, to_json(&completion)?);
        self.mutate(id, Utc::now(), mutation, |inv, now| inv.complete(completion, now))
            .await
    }

    /// `pending | running → failed`.
    ///
    /// # Errors
    ///
    /// `NotFound`, `InvalidTransition`, `Validation` (blank message), or `Persistence`.
    pub async fn fail(
        &self,
        id: &str,
        error_message: &str,
    ) -> Result<Investigation, InvestigationError> {
        let mut mutation = Mutation::new(
            LifecycleOp::Fail,
            serde_json::json!({ "error_message": error_message }),
        );
        mutation.reason = Some(error_message.to_string());
        self.mutate(id, Utc::now(), mutation, |inv, now| inv.fail(error_message, now))
            .await
    }

    /// Start the oldest `pending` investigation on behalf of `worker_id`.
    ///
    /// Records that another claimer wins first are skipped. Returns `None`
    /// when nothing is left to claim.
    ///
    /// # Errors
    ///
    /// `InvestigationError::Persistence` for store failures other than a lost race.
    pub async fn claim_next(
        &self,
        worker_id: &str,
    ) -> Result<Option<Investigation>, InvestigationError> {
        let mut tried = HashSet::new();
        loop {
            let candidates = self
                .store
                .list(
                    &InvestigationFilter::default()
                        .status(InvestigationStatus::Pending)
                        .oldest_first()
                        .limit(CLAIM_BATCH),
                )
                .await?;
            let fresh: Vec<Investigation> = candidates
                .into_iter()
                .filter(|candidate| tried.insert(candidate.id.clone()))
                .collect();
            if fresh.is_empty() {
                return Ok(None);
            }

            for candidate in fresh {
                if let Some(inv) = self.try_claim(candidate, worker_id).await? {
                    return Ok(Some(inv));
                }
            }
        }
    }

    /// Start `candidate` from its listed snapshot. `None` means another
    /// writer moved the record first.
    async fn try_claim(
        &self,
        candidate: Investigation,
        worker_id: &str,
    ) -> Result<Option<Investigation>, InvestigationError> {
        let _guard = self.locks.acquire(&candidate.id).await;
        let candidate_id = candidate.id.clone();
        let mut mutation = Mutation::new(
            LifecycleOp::Start,
            serde_json::json!({ WORKER_ID_KEY: worker_id }),
        );
        mutation.reason = Some(format!("claimed by {worker_id}"));

        // The listed snapshot is committed as-is: if anyone moved the
        // record since, its version no longer matches.
        let claimed = self
            .commit(candidate, Utc::now(), mutation, |inv, now| {
                inv.start(now)?;
                inv.investigation_metadata
                    .insert(WORKER_ID_KEY.to_string(), serde_json::json!(worker_id));
                Ok(())
            })
            .await;

        match claimed {
            Ok(inv) => Ok(Some(inv)),
            Err(e) if e.is_conflict() => {
                warn!(id = %candidate_id, worker_id, "lost claim race, trying next");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    async fn mutate<F>(
        &self,
        id: &str,
        now: DateTime<Utc>,
        mutation: Mutation,
        apply: F,
    ) -> Result<Investigation, InvestigationError>
    where
        F: FnOnce(&mut Investigation, DateTime<Utc>) -> Result<(), CoreError>,
    {
        let _guard = self.locks.acquire(id).await;
        let inv = self.get(id).await?;
        self.commit(inv, now, mutation, apply).await
    }

    /// Apply, derive audit entries, compare-and-set, mirror to the trail.
    async fn commit<F>(
        &self,
        mut inv: Investigation,
        now: DateTime<Utc>,
        mutation: Mutation,
        apply: F,
    ) -> Result<Investigation, InvestigationError>
    where
        F: FnOnce(&mut Investigation, DateTime<Utc>) -> Result<(), CoreError>,
    {
        let before_status = inv.status;
        let before_progress = inv.progress;
        apply(&mut inv, now)?;

        let mut audit = Vec::new();
        if inv.status != before_status {
            let detail = StatusChangedDetail {
                from: before_status.as_str().to_string(),
                to: inv.status.as_str().to_string(),
                reason: mutation.reason.clone(),
            };
            audit.push(audit_entry(
                &inv,
                EntityType::Investigation,
                &inv.id,
                AuditAction::StatusChanged,
                Some(to_json(&detail)?),
                now,
            )?);
        }
        if mutation.op == LifecycleOp::Advance {
            let detail = ProgressDetail {
                phase: inv.current_phase.clone().unwrap_or_default(),
                from: before_progress,
                to: inv.progress,
                records_processed: inv.total_records_analyzed,
            };
            audit.push(audit_entry(
                &inv,
                EntityType::Investigation,
                &inv.id,
                AuditAction::ProgressAdvanced,
                Some(to_json(&detail)?),
                now,
            )?);
        }
        if let Some(ref anomaly) = mutation.anomaly {
            let detail = AnomalyRecordedDetail {
                anomaly_type: anomaly.anomaly_type.clone(),
                severity: anomaly.severity.as_str().to_string(),
                confidence: anomaly.confidence,
            };
            audit.push(audit_entry(
                &inv,
                EntityType::Anomaly,
                &anomaly.id,
                AuditAction::AnomalyRecorded,
                Some(to_json(&detail)?),
                now,
            )?);
        }

        let expected_version = inv.version;
        inv.version = expected_version + 1;
        self.store
            .update(&inv, expected_version, mutation.anomaly.as_ref(), &audit)
            .await?;
        debug!(
            id = %inv.id,
            op = %mutation.op,
            version = inv.version,
            progress = inv.progress,
            "persisted investigation"
        );

        if inv.status != before_status {
            info!(
                id = %inv.id,
                from = %before_status,
                to = %inv.status,
                "investigation transitioned"
            );
        }
        self.mirror(&inv.id, mutation.op, mutation.data, now);
        Ok(inv)
    }

    /// Append to the trail. The store already holds the change, so a trail
    /// failure is logged rather than returned.
    fn mirror(&self, id: &str, op: LifecycleOp, data: serde_json::Value, now: DateTime<Utc>) {
        let event = LifecycleEvent {
            v: 1,
            ts: now.to_rfc3339(),
            investigation_id: id.to_string(),
            op,
            data,
        };
        if let Err(e) = self.trail.append(&event) {
            warn!(id, op = %op, "trail append failed: {e}");
        }
    }
}
