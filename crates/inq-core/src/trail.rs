//! JSONL lifecycle event envelope.
//!
//! Every service mutation can be mirrored as a `LifecycleEvent` in a
//! per-investigation `{trail_dir}/{investigation_id}.jsonl` file.
//!
//! Events without a `v` field deserialize with `v == 1` via `#[serde(default)]`.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::LifecycleOp;

const fn default_event_version() -> u32 {
    1
}

/// A single lifecycle operation recorded in the JSONL trail.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct LifecycleEvent {
    /// Envelope version. Defaults to 1 for lines written without this field.
    #[serde(default = "default_event_version")]
    pub v: u32,

    /// RFC 3339 timestamp of the operation.
    pub ts: String,

    pub investigation_id: String,

    pub op: LifecycleOp,

    /// Operation payload: the full record for `Submit`, the input for the rest.
    pub data: serde_json::Value,
}
