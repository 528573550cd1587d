//! JSONL lifecycle trail.
//!
//! Appends `LifecycleEvent` records to per-investigation
//! `{trail_dir}/{investigation_id}.jsonl` files using
//! `serde_jsonlines::append_json_lines`. The trail mirrors the store; it is
//! never read back into it.

use std::path::{Path, PathBuf};

use inq_core::ids::{PREFIX_INVESTIGATION, has_prefix};
use inq_core::trail::LifecycleEvent;

use crate::error::DatabaseError;

pub struct TrailWriter {
    trail_dir: PathBuf,
    enabled: bool,
}

impl TrailWriter {
    /// Create a writer for `trail_dir`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the directory cannot be created.
    pub fn new(trail_dir: PathBuf) -> Result<Self, DatabaseError> {
        std::fs::create_dir_all(&trail_dir).map_err(|e| DatabaseError::Other(e.into()))?;
        Ok(Self {
            trail_dir,
            enabled: true,
        })
    }

    /// A writer that drops every event.
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            trail_dir: PathBuf::new(),
            enabled: false,
        }
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[must_use]
    pub fn trail_dir(&self) -> &Path {
        &self.trail_dir
    }

    /// Only generated investigation IDs map to a file, so no ID can name a
    /// path outside `trail_dir`.
    fn path_for(&self, investigation_id: &str) -> Result<PathBuf, DatabaseError> {
        if !has_prefix(investigation_id, PREFIX_INVESTIGATION) {
            return Err(DatabaseError::InvalidState(format!(
                "'{investigation_id}' is not an investigation id"
            )));
        }
        Ok(self.trail_dir.join(format!("{investigation_id}.jsonl")))
    }

    /// Append one event to its investigation's file.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the id is malformed or the file write fails.
    pub fn append(&self, event: &LifecycleEvent) -> Result<(), DatabaseError> {
        if !self.enabled {
            return Ok(());
        }
        serde_jsonlines::append_json_lines(self.path_for(&event.investigation_id)?, [event])
            .map_err(|e| DatabaseError::Other(e.into()))?;
        Ok(())
    }

    /// Read every event recorded for `investigation_id`, oldest first.
    ///
    /// A missing file (or a disabled writer) yields no events.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the id is malformed, the file cannot be
    /// read, or a line fails to parse.
    pub fn read(&self, investigation_id: &str) -> Result<Vec<LifecycleEvent>, DatabaseError> {
        let path = self.path_for(investigation_id)?;
        if !self.enabled || !path.exists() {
            return Ok(Vec::new());
        }
        serde_jsonlines::json_lines(&path)
            .map_err(|e| DatabaseError::Other(e.into()))?
            .collect::<std::io::Result<Vec<LifecycleEvent>>>()
            .map_err(|e| DatabaseError::Other(e.into()))
    }
}
