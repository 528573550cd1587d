//! Database migration runner.
//!
//! Embeds the SQL migration files at compile time. Migrations form a single
//! linear chain: every revision names the one it builds on, and the chain
//! is checked before any SQL runs. Applied revisions are recorded in
//! `schema_migrations`, so reopening a database only runs what is new.

use chrono::Utc;
use serde::Serialize;
use tracing::info;

use crate::InqDb;
use crate::error::DatabaseError;
use crate::helpers::{commit_or_rollback, fmt_datetime, get_opt_string, parse_datetime};

/// One embedded schema revision.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub revision: &'static str,
    pub down_revision: Option<&'static str>,
    pub sql: &'static str,
}

/// A revision recorded in `schema_migrations`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedMigration {
    pub revision: String,
    pub down_revision: Option<String>,
    pub applied_at: chrono::DateTime<Utc>,
}

pub const MIGRATIONS: &[Migration] = &[
    Migration {
        revision: "0001_investigations",
        down_revision: None,
        sql: include_str!("../migrations/0001_investigations.sql"),
    },
    Migration {
        revision: "0002_progress_tracking",
        down_revision: Some("0001_investigations"),
        sql: include_str!("../migrations/0002_progress_tracking.sql"),
    },
    Migration {
        revision: "0003_anomalies",
        down_revision: Some("0002_progress_tracking"),
        sql: include_str!("../migrations/0003_anomalies.sql"),
    },
    Migration {
        revision: "0004_access_control",
        down_revision: Some("0003_anomalies"),
        sql: include_str!("../migrations/0004_access_control.sql"),
    },
    Migration {
        revision: "0005_audit_trail",
        down_revision: Some("0004_access_control"),
        sql: include_str!("../migrations/0005_audit_trail.sql"),
    },
];

const CREATE_SCHEMA_MIGRATIONS: &str = "CREATE TABLE IF NOT EXISTS schema_migrations (
    revision TEXT PRIMARY KEY,
    down_revision TEXT,
    applied_at TEXT NOT NULL
)";

/// Check that `chain` is a single linear history starting from a root.
///
/// # Errors
///
/// Returns `DatabaseError::Migration` on a missing root, a duplicate
/// revision, or a revision whose parent is not the one before it.
pub fn verify_chain(chain: &[Migration]) -> Result<(), DatabaseError> {
    let mut previous: Option<&str> = None;
    for (i, migration) in chain.iter().enumerate() {
        if chain[..i].iter().any(|m| m.revision == migration.revision) {
            return Err(DatabaseError::Migration(format!(
                "duplicate revision {}",
                migration.revision
            )));
        }
        if migration.down_revision != previous {
            return Err(DatabaseError::Migration(format!(
                "revision {} expects parent {:?}, chain has {:?}",
                migration.revision, migration.down_revision, previous
            )));
        }
        previous = Some(migration.revision);
    }
    Ok(())
}

impl InqDb {
    /// Apply every embedded migration not yet recorded.
    pub(crate) async fn run_migrations(&self) -> Result<(), DatabaseError> {
        self.apply_chain(MIGRATIONS).await
    }

    pub(crate) async fn apply_chain(&self, chain: &[Migration]) -> Result<(), DatabaseError> {
        verify_chain(chain)?;

        let _guard = self.lock().await;
        self.conn
            .execute(CREATE_SCHEMA_MIGRATIONS, ())
            .await
            .map_err(|e| DatabaseError::Migration(format!("schema_migrations: {e}")))?;

        let applied = self.applied_revisions().await?;
        if let Some(unknown) = applied
            .iter()
            .find(|rev| !chain.iter().any(|m| m.revision == rev.as_str()))
        {
            return Err(DatabaseError::Migration(format!(
                "database is at unknown revision {unknown}"
            )));
        }

        for migration in chain {
            if applied.iter().any(|rev| rev == migration.revision) {
                continue;
            }
            let tx = self.conn.transaction().await?;
            let written = async {
                tx.execute_batch(migration.sql).await?;
                tx.execute(
                    "INSERT INTO schema_migrations (revision, down_revision, applied_at)
                     VALUES (?1, ?2, ?3)",
                    libsql::params![
                        migration.revision,
                        migration.down_revision,
                        fmt_datetime(&Utc::now())
                    ],
                )
                .await?;
                Ok::<(), DatabaseError>(())
            }
            .await
            .map_err(|e| DatabaseError::Migration(format!("{}: {e}", migration.revision)));
            commit_or_rollback(tx, written).await?;
            info!(revision = migration.revision, "applied migration");
        }
        Ok(())
    }

    async fn applied_revisions(&self) -> Result<Vec<String>, DatabaseError> {
        let mut rows = self
            .conn
            .query("SELECT revision FROM schema_migrations", ())
            .await?;
        let mut revisions = Vec::new();
        while let Some(row) = rows.next().await? {
            revisions.push(row.get::<String>(0)?);
        }
        Ok(revisions)
    }

    /// List applied revisions in the order they were applied.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn applied_migrations(&self) -> Result<Vec<AppliedMigration>, DatabaseError> {
        let _guard = self.lock().await;
        let mut rows = self
            .conn
            .query(
                "SELECT revision, down_revision, applied_at FROM schema_migrations
                 ORDER BY applied_at, rowid",
                (),
            )
            .await?;
        let mut applied = Vec::new();
        while let Some(row) = rows.next().await? {
            applied.push(AppliedMigration {
                revision: row.get(0)?,
                down_revision: get_opt_string(&row, 1)?,
                applied_at: parse_datetime(&row.get::<String>(2)?)?,
            });
        }
        Ok(applied)
    }
}
