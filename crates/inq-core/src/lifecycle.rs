//! Investigation lifecycle state machine.
//!
//! ```text
//! submit → pending ─start→ running ─advance*→ running ─complete→ completed
//!             │                │
//!             └──────fail──────┴──fail→ failed
//! ```
//!
//! Every operation validates its inputs against the current record before
//! touching it, so a rejected call leaves the investigation unchanged.
//! The caller supplies `now`; persistence and retries are the caller's job.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::{Investigation, NewInvestigation};
use crate::enums::{EntityType, InvestigationStatus};
use crate::errors::CoreError;

/// Input to [`Investigation::advance`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub phase: String,
    pub progress: f64,
    pub records_processed: u64,
}

impl ProgressUpdate {
    #[must_use]
    pub fn new(phase: impl Into<String>, progress: f64, records_processed: u64) -> Self {
        Self {
            phase: phase.into(),
            progress,
            records_processed,
        }
    }
}

/// Input to [`Investigation::complete`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Completion {
    pub summary: String,
    #[serde(default)]
    pub results: Vec<serde_json::Value>,
    pub anomalies_found: u64,
    pub confidence_score: Option<f64>,
}

impl Completion {
    #[must_use]
    pub fn new(summary: impl Into<String>, anomalies_found: u64) -> Self {
        Self {
            summary: summary.into(),
            results: Vec::new(),
            anomalies_found,
            confidence_score: None,
        }
    }

    #[must_use]
    pub const fn confidence(mut self, score: f64) -> Self {
        self.confidence_score = Some(score);
        self
    }

    #[must_use]
    pub fn results(mut self, results: Vec<serde_json::Value>) -> Self {
        self.results = results;
        self
    }
}

impl Investigation {
    /// Build a `pending` investigation from a submission request.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Validation` if `user_id` or `query` is blank.
    pub fn submit(
        id: String,
        request: NewInvestigation,
        now: DateTime<Utc>,
    ) -> Result<Self, CoreError> {
        if request.user_id.trim().is_empty() {
            return Err(CoreError::Validation("user_id must not be empty".into()));
        }
        if request.query.trim().is_empty() {
            return Err(CoreError::Validation("query must not be empty".into()));
        }

        Ok(Self {
            id,
            user_id: request.user_id,
            session_id: request.session_id,
            query: request.query,
            data_source: request.data_source,
            status: InvestigationStatus::Pending,
            current_phase: None,
            progress: 0.0,
            anomalies_found: 0,
            total_records_analyzed: 0,
            confidence_score: None,
            filters: request.filters,
            anomaly_types: request.anomaly_types,
            results: Vec::new(),
            investigation_metadata: request.investigation_metadata,
            summary: None,
            error_message: None,
            created_at: now,
            updated_at: now,
            started_at: None,
            completed_at: None,
            processing_time_ms: None,
            version: 0,
        })
    }

    /// `pending → running`. Resets progress to `0.0` and stamps `started_at`.
    ///
    /// # Errors
    ///
    /// `CoreError::InvalidTransition` unless the investigation is `pending`.
    pub fn start(&mut self, now: DateTime<Utc>) -> Result<(), CoreError> {
        self.ensure_transition(InvestigationStatus::Running, "start")?;

        self.status = InvestigationStatus::Running;
        self.started_at = Some(now);
        self.progress = 0.0;
        self.updated_at = now;
        Ok(())
    }

    /// Record progress of a running investigation.
    ///
    /// # Errors
    ///
    /// - `CoreError::InvalidTransition` unless the investigation is `running`.
    /// - `CoreError::InvalidProgress` if `progress` is outside `[previous, 1.0]`
    ///   or `records_processed` is lower than the recorded total.
    pub fn advance(
        &mut self,
        update: &ProgressUpdate,
        now: DateTime<Utc>,
    ) -> Result<(), CoreError> {
        self.ensure_running("advance")?;

        if !update.progress.is_finite() || !(0.0..=1.0).contains(&update.progress) {
            return Err(self.progress_error(format!(
                "progress {} is outside [0.0, 1.0]",
                update.progress
            )));
        }
        if update.progress < self.progress {
            return Err(self.progress_error(format!(
                "progress {} is below previously recorded {}",
                update.progress, self.progress
            )));
        }
        if update.records_processed < self.total_records_analyzed {
            return Err(self.progress_error(format!(
                "records_processed {} is below previously recorded {}",
                update.records_processed, self.total_records_analyzed
            )));
        }

        self.current_phase = Some(update.phase.clone());
        self.progress = update.progress;
        self.total_records_analyzed = update.records_processed;
        self.updated_at = now;
        Ok(())
    }

    /// Append a finding to `results` and bump `anomalies_found`.
    ///
    /// # Errors
    ///
    /// - `CoreError::InvalidTransition` unless the investigation is `running`.
    /// - `CoreError::Validation` if the counter would exceed
    ///   `total_records_analyzed`.
    pub fn record_anomaly(
        &mut self,
        finding: serde_json::Value,
        now: DateTime<Utc>,
    ) -> Result<(), CoreError> {
        self.ensure_running("record anomaly")?;
        if self.anomalies_found >= self.total_records_analyzed {
            return Err(CoreError::Validation(format!(
                "anomaly {} exceeds total_records_analyzed {}",
                self.anomalies_found + 1,
                self.total_records_analyzed
            )));
        }

        self.results.push(finding);
        self.anomalies_found += 1;
        self.updated_at = now;
        Ok(())
    }

    /// `running → completed`. Progress is forced to exactly `1.0`.
    ///
    /// # Errors
    ///
    /// - `CoreError::InvalidTransition` unless the investigation is `running`.
    /// - `CoreError::InvalidProgress` if `anomalies_found` would decrease.
    /// - `CoreError::Validation` if the confidence score is outside `[0.0, 1.0]`
    ///   or more anomalies than analyzed records are reported.
    pub fn complete(
        &mut self,
        completion: Completion,
        now: DateTime<Utc>,
    ) -> Result<(), CoreError> {
        self.ensure_transition(InvestigationStatus::Completed, "complete")?;

        if completion.anomalies_found < self.anomalies_found {
            return Err(self.progress_error(format!(
                "anomalies_found {} is below previously recorded {}",
                completion.anomalies_found, self.anomalies_found
            )));
        }
        if let Some(score) = completion.confidence_score {
            if !score.is_finite() || !(0.0..=1.0).contains(&score) {
                return Err(CoreError::Validation(format!(
                    "confidence_score {score} is outside [0.0, 1.0]"
                )));
            }
        }
        if completion.anomalies_found > self.total_records_analyzed {
            return Err(CoreError::Validation(format!(
                "anomalies_found {} exceeds total_records_analyzed {}",
                completion.anomalies_found, self.total_records_analyzed
            )));
        }

        self.status = InvestigationStatus::Completed;
        self.progress = 1.0;
        self.results.extend(completion.results);
        self.anomalies_found = completion.anomalies_found;
        self.confidence_score = completion.confidence_score;
        self.summary = Some(completion.summary);
        self.error_message = None;
        self.finish(now);
        Ok(())
    }

    /// `pending | running → failed`. Progress keeps its last value.
    ///
    /// # Errors
    ///
    /// - `CoreError::InvalidTransition` from a terminal state.
    /// - `CoreError::Validation` if `error_message` is blank.
    pub fn fail(&mut self, error_message: &str, now: DateTime<Utc>) -> Result<(), CoreError> {
        self.ensure_transition(InvestigationStatus::Failed, "fail")?;

        if error_message.trim().is_empty() {
            return Err(CoreError::Validation(
                "a failed investigation requires a non-empty error_message".into(),
            ));
        }

        self.status = InvestigationStatus::Failed;
        self.error_message = Some(error_message.to_string());
        self.summary = None;
        self.finish(now);
        Ok(())
    }

    fn finish(&mut self, now: DateTime<Utc>) {
        self.completed_at = Some(now);
        self.updated_at = now;
        self.processing_time_ms = self
            .started_at
            .map(|started| u64::try_from((now - started).num_milliseconds()).unwrap_or(0));
    }

    fn ensure_transition(
        &self,
        next: InvestigationStatus,
        operation: &str,
    ) -> Result<(), CoreError> {
        if self.status.can_transition_to(next) {
            Ok(())
        } else {
            Err(self.transition_error(operation))
        }
    }

    fn ensure_running(&self, operation: &str) -> Result<(), CoreError> {
        if self.status == InvestigationStatus::Running {
            Ok(())
        } else {
            Err(self.transition_error(operation))
        }
    }

    fn transition_error(&self, operation: &str) -> CoreError {
        CoreError::InvalidTransition {
            entity_type: EntityType::Investigation.as_str().to_string(),
            id: self.id.clone(),
            from: self.status.as_str().to_string(),
            operation: operation.to_string(),
        }
    }

    fn progress_error(&self, reason: String) -> CoreError {
        CoreError::InvalidProgress {
            id: self.id.clone(),
            reason,
        }
    }
}
