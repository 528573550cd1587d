use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::Severity;

/// An irregularity flagged while an investigation was running.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct Anomaly {
    pub id: String,
    pub investigation_id: String,
    pub anomaly_type: String,
    pub severity: Severity,
    /// Detector certainty in `[0.0, 1.0]`.
    pub confidence: f64,
    pub description: String,
    pub contract_id: Option<String>,
    #[serde(default)]
    pub evidence: BTreeMap<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// Input for recording an anomaly against a running investigation.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct NewAnomaly {
    pub anomaly_type: String,
    pub severity: Severity,
    pub confidence: f64,
    pub description: String,
    #[serde(default)]
    pub contract_id: Option<String>,
    #[serde(default)]
    pub evidence: BTreeMap<String, serde_json::Value>,
}

impl Anomaly {
    /// Compact JSON form appended to the owning investigation's `results`.
    #[must_use]
    pub fn as_result(&self) -> serde_json::Value {
        serde_json::json!({
            "anomaly_id": self.id,
            "anomaly_type": self.anomaly_type,
            "severity": self.severity,
            "confidence": self.confidence,
            "description": self.description,
            "contract_id": self.contract_id,
        })
    }
}
