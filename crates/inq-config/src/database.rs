//! Investigation store configuration.

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Which `InvestigationStore` implementation backs the service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// Process-local map; nothing survives a restart.
    Memory,
    /// Embedded libSQL database file.
    #[default]
    Libsql,
}

fn default_path() -> String {
    ".inquest/inquest.db".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub backend: StoreBackend,

    /// Database file for the `libsql` backend. `:memory:` opens a throwaway database.
    #[serde(default = "default_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            path: default_path(),
        }
    }
}

impl DatabaseConfig {
    /// Whether records outlive the process.
    pub fn is_persistent(&self) -> bool {
        self.backend == StoreBackend::Libsql && self.path != ":memory:"
    }

    /// Reject combinations that cannot be opened.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backend == StoreBackend::Libsql && self.path.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "database.path".into(),
                reason: "libsql backend requires a database path".into(),
            });
        }
        Ok(())
    }
}
