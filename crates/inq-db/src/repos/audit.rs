//! Audit trail repository.
//!
//! Append-only entries recording every investigation mutation, written in
//! the same transaction as the mutation itself.

use inq_core::entities::AuditEntry;
use inq_core::enums::AuditAction;
use libsql::Value;

use crate::InqDb;
use crate::error::DatabaseError;
use crate::helpers::{
    datetime, get_opt_string, parse_datetime, parse_enum, parse_optional_json, text,
};
use crate::repos::DEFAULT_LIMIT;

const SELECT_COLS: &str =
    "id, investigation_id, entity_type, entity_id, action, detail, created_at";

/// Filter criteria for audit queries.
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    pub investigation_id: Option<String>,
    pub action: Option<AuditAction>,
    pub limit: Option<u32>,
}

impl AuditFilter {
    #[must_use]
    pub fn for_investigation(investigation_id: impl Into<String>) -> Self {
        Self {
            investigation_id: Some(investigation_id.into()),
            ..Self::default()
        }
    }

    /// Whether `entry` passes the investigation and action criteria.
    #[must_use]
    pub fn matches(&self, entry: &AuditEntry) -> bool {
        self.investigation_id
            .as_deref()
            .is_none_or(|id| entry.investigation_id == id)
            && self.action.is_none_or(|a| entry.action == a)
    }
}

fn row_to_audit(row: &libsql::Row) -> Result<AuditEntry, DatabaseError> {
    Ok(AuditEntry {
        id: row.get(0)?,
        investigation_id: row.get(1)?,
        entity_type: parse_enum(&row.get::<String>(2)?)?,
        entity_id: row.get(3)?,
        action: parse_enum(&row.get::<String>(4)?)?,
        detail: parse_optional_json(get_opt_string(row, 5)?.as_deref())?,
        created_at: parse_datetime(&row.get::<String>(6)?)?,
    })
}

pub(crate) async fn insert_audit_on(
    conn: &libsql::Connection,
    entry: &AuditEntry,
) -> Result<(), DatabaseError> {
    let detail = entry
        .detail
        .as_ref()
        .map_or(Value::Null, |d| Value::Text(d.to_string()));
    conn.execute(
        &format!("INSERT INTO audit_trail ({SELECT_COLS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"),
        libsql::params_from_iter(vec![
            text(&entry.id),
            text(&entry.investigation_id),
            text(entry.entity_type.as_str()),
            text(&entry.entity_id),
            text(entry.action.as_str()),
            detail,
            datetime(&entry.created_at),
        ]),
    )
    .await?;
    Ok(())
}

impl InqDb {
    /// Append a standalone audit entry outside any investigation update.
    #[cfg(test)]
    pub(crate) async fn append_audit(&self, entry: &AuditEntry) -> Result<(), DatabaseError> {
        let _guard = self.lock().await;
        insert_audit_on(self.conn(), entry).await
    }

    /// Query audit entries with optional filters, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn query_audit(
        &self,
        filter: &AuditFilter,
    ) -> Result<Vec<AuditEntry>, DatabaseError> {
        let mut conditions = Vec::new();
        let mut params: Vec<Value> = Vec::new();

        if let Some(ref investigation_id) = filter.investigation_id {
            params.push(text(investigation_id));
            conditions.push(format!("investigation_id = ?{}", params.len()));
        }
        if let Some(action) = filter.action {
            params.push(text(action.as_str()));
            conditions.push(format!("action = ?{}", params.len()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };
        let limit = filter.limit.unwrap_or(DEFAULT_LIMIT);
        let sql = format!(
            "SELECT {SELECT_COLS} FROM audit_trail {where_clause}
             ORDER BY created_at, rowid LIMIT {limit}"
        );

        let _guard = self.lock().await;
        let mut rows = self
            .conn()
            .query(&sql, libsql::params_from_iter(params))
            .await?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next().await? {
            entries.push(row_to_audit(&row)?);
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use inq_core::enums::EntityType;
    use pretty_assertions::assert_eq;

    use super::*;

    fn entry(id: &str, investigation_id: &str, action: AuditAction, seconds: i64) -> AuditEntry {
        AuditEntry {
            id: id.to_string(),
            investigation_id: investigation_id.to_string(),
            entity_type: EntityType::Investigation,
            entity_id: investigation_id.to_string(),
            action,
            detail: Some(serde_json::json!({"from": "pending", "to": "running"})),
            created_at: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
                + Duration::seconds(seconds),
        }
    }

    #[tokio::test]
    async fn append_and_query_by_investigation() {
        let db = InqDb::open_local(":memory:").await.unwrap();
        db.append_audit(&entry("aud-1", "inv-a", AuditAction::Created, 0)).await.unwrap();
        db.append_audit(&entry("aud-2", "inv-b", AuditAction::Created, 1)).await.unwrap();
        db.append_audit(&entry("aud-3", "inv-a", AuditAction::StatusChanged, 2)).await.unwrap();

        let entries = db
            .query_audit(&AuditFilter::for_investigation("inv-a"))
            .await
            .unwrap();
        let ids: Vec<&str> = entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["aud-1", "aud-3"]);
        assert_eq!(entries[1], entry("aud-3", "inv-a", AuditAction::StatusChanged, 2));
    }

    #[tokio::test]
    async fn query_by_action_and_limit() {
        let db = InqDb::open_local(":memory:").await.unwrap();
        for i in 0..5 {
            db.append_audit(&entry(&format!("aud-{i}"), "inv-a", AuditAction::ProgressAdvanced, i))
                .await
                .unwrap();
        }
        db.append_audit(&entry("aud-x", "inv-a", AuditAction::Created, 10)).await.unwrap();

        let filter = AuditFilter {
            action: Some(AuditAction::ProgressAdvanced),
            limit: Some(3),
            ..AuditFilter::default()
        };
        let entries = db.query_audit(&filter).await.unwrap();
        assert_eq!(entries.len(), 3);
        assert!(entries.iter().all(|e| e.action == AuditAction::ProgressAdvanced));
    }

    #[tokio::test]
    async fn entry_without_detail_roundtrips() {
        let db = InqDb::open_local(":memory:").await.unwrap();
        let mut bare = entry("aud-1", "inv-a", AuditAction::Created, 0);
        bare.detail = None;
        db.append_audit(&bare).await.unwrap();
        assert_eq!(db.query_audit(&AuditFilter::default()).await.unwrap(), vec![bare]);
    }
}
