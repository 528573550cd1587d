use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::{DataSource, InvestigationStatus};

/// One user-initiated analysis task against a public data source.
///
/// Status and progress change only through the operations in
/// [`crate::lifecycle`]; the remaining fields are fixed at submission.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct Investigation {
    pub id: String,
    pub user_id: String,
    pub session_id: Option<String>,
    pub query: String,
    pub data_source: DataSource,
    pub status: InvestigationStatus,
    pub current_phase: Option<String>,
    /// Fractional completion in `[0.0, 1.0]`.
    pub progress: f64,
    pub anomalies_found: u64,
    pub total_records_analyzed: u64,
    pub confidence_score: Option<f64>,
    #[serde(default)]
    pub filters: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub anomaly_types: Vec<String>,
    #[serde(default)]
    pub results: Vec<serde_json::Value>,
    #[serde(default)]
    pub investigation_metadata: BTreeMap<String, serde_json::Value>,
    pub summary: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub processing_time_ms: Option<u64>,
    /// Optimistic concurrency counter, bumped on every persisted mutation.
    pub version: u64,
}

/// Submission request for a new investigation.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct NewInvestigation {
    pub user_id: String,
    #[serde(default)]
    pub session_id: Option<String>,
    pub query: String,
    pub data_source: DataSource,
    #[serde(default)]
    pub filters: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub anomaly_types: Vec<String>,
    #[serde(default)]
    pub investigation_metadata: BTreeMap<String, serde_json::Value>,
}

impl NewInvestigation {
    #[must_use]
    pub fn new(user_id: impl Into<String>, query: impl Into<String>, source: DataSource) -> Self {
        Self {
            user_id: user_id.into(),
            session_id: None,
            query: query.into(),
            data_source: source,
            filters: BTreeMap::new(),
            anomaly_types: Vec::new(),
            investigation_metadata: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    #[must_use]
    pub fn filter(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.filters.insert(key.into(), value);
        self
    }

    #[must_use]
    pub fn anomaly_type(mut self, anomaly_type: impl Into<String>) -> Self {
        self.anomaly_types.push(anomaly_type.into());
        self
    }
}
