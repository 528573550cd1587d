//! JSONL lifecycle trail configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

fn default_trail_dir() -> String {
    ".inquest/trail".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrailConfig {
    /// Whether lifecycle events are mirrored to JSONL files.
    #[serde(default)]
    pub enabled: bool,

    /// Directory holding one `{investigation_id}.jsonl` file per investigation.
    #[serde(default = "default_trail_dir")]
    pub dir: String,
}

impl Default for TrailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            dir: default_trail_dir(),
        }
    }
}

impl TrailConfig {
    /// Trail directory when enabled, `None` otherwise.
    #[must_use]
    pub fn active_dir(&self) -> Option<PathBuf> {
        self.enabled.then(|| PathBuf::from(&self.dir))
    }
}
