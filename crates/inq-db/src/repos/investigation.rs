//! Investigation repository: insert, get, versioned update, filtered list.

use inq_core::entities::{Anomaly, AuditEntry, Investigation};
use inq_core::enums::InvestigationStatus;
use libsql::Value;
use tracing::debug;

use crate::InqDb;
use crate::error::DatabaseError;
use crate::helpers::{
    commit_or_rollback, datetime, get_opt_string, get_opt_u64, get_u64, integer, json,
    opt_datetime, opt_integer, opt_real, opt_text, parse_datetime, parse_enum, parse_json_column,
    parse_optional_datetime, text,
};
use crate::repos::DEFAULT_LIMIT;
use crate::repos::anomaly::insert_anomaly_on;
use crate::repos::audit::insert_audit_on;

const SELECT_COLS: &str = "id, user_id, session_id, query, data_source, status, current_phase, \
    progress, anomalies_found, total_records_analyzed, confidence_score, filters, anomaly_types, \
    results, investigation_metadata, summary, error_message, created_at, updated_at, started_at, \
    completed_at, processing_time_ms, version";

const COLUMN_COUNT: usize = 23;

/// Filter criteria for investigation listings.
#[derive(Debug, Clone, Default)]
pub struct InvestigationFilter {
    pub user_id: Option<String>,
    pub status: Option<InvestigationStatus>,
    pub limit: Option<u32>,
    /// Oldest first instead of the default newest first.
    pub oldest_first: bool,
}

impl InvestigationFilter {
    #[must_use]
    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn status(mut self, status: InvestigationStatus) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub const fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub const fn oldest_first(mut self) -> Self {
        self.oldest_first = true;
        self
    }

    /// Whether `inv` passes the user and status criteria.
    #[must_use]
    pub fn matches(&self, inv: &Investigation) -> bool {
        self.user_id.as_deref().is_none_or(|u| inv.user_id == u)
            && self.status.is_none_or(|s| inv.status == s)
    }
}

fn row_to_investigation(row: &libsql::Row) -> Result<Investigation, DatabaseError> {
    Ok(Investigation {
        id: row.get(0)?,
        user_id: row.get(1)?,
        session_id: get_opt_string(row, 2)?,
        query: row.get(3)?,
        data_source: parse_enum(&row.get::<String>(4)?)?,
        status: parse_enum(&row.get::<String>(5)?)?,
        current_phase: get_opt_string(row, 6)?,
        progress: row.get::<f64>(7)?,
        anomalies_found: get_u64(row, 8)?,
        total_records_analyzed: get_u64(row, 9)?,
        confidence_score: row.get::<Option<f64>>(10)?,
        filters: parse_json_column(get_opt_string(row, 11)?.as_deref())?,
        anomaly_types: parse_json_column(get_opt_string(row, 12)?.as_deref())?,
        results: parse_json_column(get_opt_string(row, 13)?.as_deref())?,
        investigation_metadata: parse_json_column(get_opt_string(row, 14)?.as_deref())?,
        summary: get_opt_string(row, 15)?,
        error_message: get_opt_string(row, 16)?,
        created_at: parse_datetime(&row.get::<String>(17)?)?,
        updated_at: parse_datetime(&row.get::<String>(18)?)?,
        started_at: parse_optional_datetime(get_opt_string(row, 19)?.as_deref())?,
        completed_at: parse_optional_datetime(get_opt_string(row, 20)?.as_deref())?,
        processing_time_ms: get_opt_u64(row, 21)?,
        version: get_u64(row, 22)?,
    })
}

/// Bind every column in `SELECT_COLS` order.
fn insert_params(inv: &Investigation) -> Result<Vec<Value>, DatabaseError> {
    Ok(vec![
        text(&inv.id),
        text(&inv.user_id),
        opt_text(inv.session_id.as_deref()),
        text(&inv.query),
        text(inv.data_source.as_str()),
        text(inv.status.as_str()),
        opt_text(inv.current_phase.as_deref()),
        Value::Real(inv.progress),
        integer(inv.anomalies_found)?,
        integer(inv.total_records_analyzed)?,
        opt_real(inv.confidence_score),
        json(&inv.filters)?,
        json(&inv.anomaly_types)?,
        json(&inv.results)?,
        json(&inv.investigation_metadata)?,
        opt_text(inv.summary.as_deref()),
        opt_text(inv.error_message.as_deref()),
        datetime(&inv.created_at),
        datetime(&inv.updated_at),
        opt_datetime(inv.started_at.as_ref()),
        opt_datetime(inv.completed_at.as_ref()),
        opt_integer(inv.processing_time_ms)?,
        integer(inv.version)?,
    ])
}

const UPDATE_SQL: &str = "UPDATE investigations SET
    status = ?2, current_phase = ?3, progress = ?4, anomalies_found = ?5,
    total_records_analyzed = ?6, confidence_score = ?7, results = ?8,
    investigation_metadata = ?9, summary = ?10, error_message = ?11,
    updated_at = ?12, started_at = ?13, completed_at = ?14,
    processing_time_ms = ?15, version = ?16
    WHERE id = ?1 AND version = ?17";

fn update_params(inv: &Investigation, expected_version: u64) -> Result<Vec<Value>, DatabaseError> {
    Ok(vec![
        text(&inv.id),
        text(inv.status.as_str()),
        opt_text(inv.current_phase.as_deref()),
        Value::Real(inv.progress),
        integer(inv.anomalies_found)?,
        integer(inv.total_records_analyzed)?,
        opt_real(inv.confidence_score),
        json(&inv.results)?,
        json(&inv.investigation_metadata)?,
        opt_text(inv.summary.as_deref()),
        opt_text(inv.error_message.as_deref()),
        datetime(&inv.updated_at),
        opt_datetime(inv.started_at.as_ref()),
        opt_datetime(inv.completed_at.as_ref()),
        opt_integer(inv.processing_time_ms)?,
        integer(inv.version)?,
        integer(expected_version)?,
    ])
}

async fn apply_update(
    conn: &libsql::Connection,
    inv: &Investigation,
    params: Vec<Value>,
    expected_version: u64,
    anomaly: Option<&Anomaly>,
    audit: &[AuditEntry],
) -> Result<(), DatabaseError> {
    let changed = conn
        .execute(UPDATE_SQL, libsql::params_from_iter(params))
        .await?;
    if changed == 0 {
        let mut rows = conn
            .query("SELECT 1 FROM investigations WHERE id = ?1", [inv.id.as_str()])
            .await?;
        return Err(if rows.next().await?.is_some() {
            DatabaseError::Conflict {
                id: inv.id.clone(),
                expected_version,
            }
        } else {
            DatabaseError::NoResult
        });
    }

    if let Some(anomaly) = anomaly {
        insert_anomaly_on(conn, anomaly).await?;
    }
    for entry in audit {
        insert_audit_on(conn, entry).await?;
    }
    Ok(())
}

impl InqDb {
    /// Insert a new investigation together with its creation audit entries.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the INSERT fails (including a duplicate ID).
    pub async fn insert_investigation(
        &self,
        inv: &Investigation,
        audit: &[AuditEntry],
    ) -> Result<(), DatabaseError> {
        let placeholders = (1..=COLUMN_COUNT)
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let params = insert_params(inv)?;

        let _guard = self.lock().await;
        let tx = self.conn().transaction().await?;
        let written = async {
            tx.execute(
                &format!("INSERT INTO investigations ({SELECT_COLS}) VALUES ({placeholders})"),
                libsql::params_from_iter(params),
            )
            .await?;
            for entry in audit {
                insert_audit_on(&tx, entry).await?;
            }
            Ok::<(), DatabaseError>(())
        }
        .await;
        commit_or_rollback(tx, written).await?;

        debug!(id = %inv.id, user_id = %inv.user_id, "inserted investigation");
        Ok(())
    }

    /// Fetch one investigation by ID.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails or the row cannot be decoded.
    pub async fn get_investigation(
        &self,
        id: &str,
    ) -> Result<Option<Investigation>, DatabaseError> {
        let _guard = self.lock().await;
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {SELECT_COLS} FROM investigations WHERE id = ?1"),
                [id],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(row_to_investigation(&row)?)),
            None => Ok(None),
        }
    }

    /// Replace the mutable columns of `inv` if the stored version is still
    /// `expected_version`. The optional anomaly and the audit entries are
    /// written in the same transaction.
    ///
    /// # Errors
    ///
    /// - `DatabaseError::NoResult` if the investigation does not exist.
    /// - `DatabaseError::Conflict` if the stored version has moved on.
    /// - `DatabaseError` for any other statement failure.
    pub async fn update_investigation(
        &self,
        inv: &Investigation,
        expected_version: u64,
        anomaly: Option<&Anomaly>,
        audit: &[AuditEntry],
    ) -> Result<(), DatabaseError> {
        let params = update_params(inv, expected_version)?;

        let _guard = self.lock().await;
        let tx = self.conn().transaction().await?;
        let written = apply_update(&tx, inv, params, expected_version, anomaly, audit).await;
        commit_or_rollback(tx, written).await?;

        debug!(
            id = %inv.id,
            status = %inv.status,
            version = inv.version,
            "updated investigation"
        );
        Ok(())
    }

    /// List investigations matching `filter`, newest first unless
    /// `oldest_first` is set. Ties on `created_at` keep insertion order.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn list_investigations(
        &self,
        filter: &InvestigationFilter,
    ) -> Result<Vec<Investigation>, DatabaseError> {
        let mut conditions = Vec::new();
        let mut params: Vec<Value> = Vec::new();

        if let Some(ref user_id) = filter.user_id {
            params.push(text(user_id));
            conditions.push(format!("user_id = ?{}", params.len()));
        }
        if let Some(status) = filter.status {
            let mut slots = Vec::new();
            for spelling in status.stored_spellings() {
                params.push(text(spelling));
                slots.push(format!("?{}", params.len()));
            }
            conditions.push(format!("status IN ({})", slots.join(", ")));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };
        let direction = if filter.oldest_first { "ASC" } else { "DESC" };
        let limit = filter.limit.unwrap_or(DEFAULT_LIMIT);
        let sql = format!(
            "SELECT {SELECT_COLS} FROM investigations {where_clause}
             ORDER BY created_at {direction}, rowid {direction} LIMIT {limit}"
        );

        let _guard = self.lock().await;
        let mut rows = self
            .conn()
            .query(&sql, libsql::params_from_iter(params))
            .await?;
        let mut investigations = Vec::new();
        while let Some(row) = rows.next().await? {
            investigations.push(row_to_investigation(&row)?);
        }
        Ok(investigations)
    }
}
