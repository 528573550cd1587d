//! # inq-db
//!
//! Persistence and orchestration for Inquest investigations.
//!
//! - [`InqDb`] wraps a libSQL database: schema migrations, investigation,
//!   anomaly, and audit repositories.
//! - [`store::InvestigationStore`] is the storage seam; libSQL and an
//!   in-process map both implement it.
//! - [`service::InvestigationService`] applies the lifecycle state machine
//!   from `inq-core` under per-record locks and optimistic versioning, then
//!   mirrors each mutation to the audit table and the JSONL trail.

pub mod error;
pub mod helpers;
pub mod locks;
pub mod migrations;
pub mod repos;
pub mod service;
pub mod store;
pub mod trail;

#[cfg(test)]
mod test_support;

use std::path::Path;

use error::DatabaseError;
use libsql::Builder;
use tokio::sync::{Mutex, MutexGuard};

/// Central database handle for investigation state.
///
/// All statements go through a single connection. `gate` serializes access
/// so a transaction opened by one task never interleaves with statements
/// from another.
pub struct InqDb {
    #[allow(dead_code)]
    db: libsql::Database,
    conn: libsql::Connection,
    gate: Mutex<()>,
}

impl InqDb {
    /// Open a local database at the given path, or `":memory:"`.
    ///
    /// Creates the parent directory for file paths and runs pending
    /// migrations before returning.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the database cannot be opened or
    /// migrations fail.
    pub async fn open_local(path: &str) -> Result<Self, DatabaseError> {
        if path != ":memory:" {
            if let Some(parent) = Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|e| DatabaseError::Other(e.into()))?;
                }
            }
        }

        let db = Builder::new_local(path).build().await?;
        let conn = db.connect()?;

        // Enable foreign keys (must be per-connection in SQLite)
        conn.execute("PRAGMA foreign_keys = ON", ())
            .await
            .map_err(|e| DatabaseError::Migration(format!("PRAGMA foreign_keys: {e}")))?;

        let inq_db = Self {
            db,
            conn,
            gate: Mutex::new(()),
        };
        inq_db.run_migrations().await?;
        Ok(inq_db)
    }

    /// Access the underlying libSQL connection for direct queries.
    ///
    /// Callers outside the repos must hold [`Self::lock`] while using it.
    #[must_use]
    pub const fn conn(&self) -> &libsql::Connection {
        &self.conn
    }

    /// Acquire exclusive use of the connection.
    pub async fn lock(&self) -> MutexGuard<'_, ()> {
        self.gate.lock().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_db() -> InqDb {
        InqDb::open_local(":memory:").await.unwrap()
    }

    #[tokio::test]
    async fn open_local_creates_schema() {
        let db = test_db().await;

        let tables = [
            "schema_migrations",
            "investigations",
            "contracts",
            "anomalies",
            "agent_messages",
            "api_keys",
            "api_key_rotations",
            "ip_whitelists",
            "audit_trail",
        ];
        for table in &tables {
            let mut rows = db
                .conn()
                .query(
                    "SELECT name FROM sqlite_master WHERE type='table' AND name=?1",
                    [*table],
                )
                .await
                .unwrap();
            let row = rows.next().await.unwrap();
            assert!(row.is_some(), "table '{table}' should exist");
        }
    }

    #[tokio::test]
    async fn progress_columns_added_by_later_migration() {
        let db = test_db().await;
        let mut rows = db
            .conn()
            .query("SELECT name FROM pragma_table_info('investigations')", ())
            .await
            .unwrap();
        let mut columns = Vec::new();
        while let Some(row) = rows.next().await.unwrap() {
            columns.push(row.get::<String>(0).unwrap());
        }
        for expected in ["current_phase", "progress", "version"] {
            assert!(
                columns.iter().any(|c| c == expected),
                "column '{expected}' missing from {columns:?}"
            );
        }
    }

    #[tokio::test]
    async fn foreign_keys_enabled() {
        let db = test_db().await;
        let mut rows = db.conn().query("PRAGMA foreign_keys", ()).await.unwrap();
        let row = rows.next().await.unwrap().unwrap();
        assert_eq!(row.get::<i64>(0).unwrap(), 1);
    }

    #[tokio::test]
    async fn open_local_creates_parent_dir() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("inquest.db");
        let db = InqDb::open_local(path.to_str().unwrap()).await.unwrap();
        drop(db);
        assert!(path.exists());
    }
}
