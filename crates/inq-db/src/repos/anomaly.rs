//! Anomaly repository.
//!
//! Anomalies are only ever inserted inside the transaction that updates
//! their investigation; see `InqDb::update_investigation`.

use inq_core::entities::Anomaly;

use crate::InqDb;
use crate::error::DatabaseError;
use crate::helpers::{
    datetime, get_opt_string, json, opt_text, parse_datetime, parse_enum, parse_json_column, text,
};

const SELECT_COLS: &str = "id, investigation_id, anomaly_type, severity, confidence, \
    description, contract_id, evidence, created_at";

fn row_to_anomaly(row: &libsql::Row) -> Result<Anomaly, DatabaseError> {
    Ok(Anomaly {
        id: row.get(0)?,
        investigation_id: row.get(1)?,
        anomaly_type: row.get(2)?,
        severity: parse_enum(&row.get::<String>(3)?)?,
        confidence: row.get::<f64>(4)?,
        description: row.get(5)?,
        contract_id: get_opt_string(row, 6)?,
        evidence: parse_json_column(get_opt_string(row, 7)?.as_deref())?,
        created_at: parse_datetime(&row.get::<String>(8)?)?,
    })
}

pub(crate) async fn insert_anomaly_on(
    conn: &libsql::Connection,
    anomaly: &Anomaly,
) -> Result<(), DatabaseError> {
    conn.execute(
        &format!(
            "INSERT INTO anomalies ({SELECT_COLS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
        ),
        libsql::params_from_iter(vec![
            text(&anomaly.id),
            text(&anomaly.investigation_id),
            text(&anomaly.anomaly_type),
            text(anomaly.severity.as_str()),
            libsql::Value::Real(anomaly.confidence),
            text(&anomaly.description),
            opt_text(anomaly.contract_id.as_deref()),
            json(&anomaly.evidence)?,
            datetime(&anomaly.created_at),
        ]),
    )
    .await?;
    Ok(())
}

impl InqDb {
    /// Anomalies recorded for one investigation, in detection order.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn list_anomalies(
        &self,
        investigation_id: &str,
    ) -> Result<Vec<Anomaly>, DatabaseError> {
        let _guard = self.lock().await;
        let mut rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {SELECT_COLS} FROM anomalies WHERE investigation_id = ?1
                     ORDER BY created_at, rowid"
                ),
                [investigation_id],
            )
            .await?;
        let mut anomalies = Vec::new();
        while let Some(row) = rows.next().await? {
            anomalies.push(row_to_anomaly(&row)?);
        }
        Ok(anomalies)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::Utc;
    use inq_core::entities::{Investigation, NewInvestigation};
    use inq_core::enums::{DataSource, Severity};
    use inq_core::lifecycle::ProgressUpdate;
    use pretty_assertions::assert_eq;

    use super::*;

    fn anomaly(id: &str, investigation_id: &str, confidence: f64) -> Anomaly {
        Anomaly {
            id: id.to_string(),
            investigation_id: investigation_id.to_string(),
            anomaly_type: "price_deviation".to_string(),
            severity: Severity::High,
            confidence,
            description: "Unit price 4x the regional median".to_string(),
            contract_id: Some("ctr-1".to_string()),
            evidence: BTreeMap::from([("ratio".to_string(), serde_json::json!(4.1))]),
            created_at: Utc::now(),
        }
    }

    async fn db_with_running() -> (InqDb, Investigation) {
        let db = InqDb::open_local(":memory:").await.unwrap();
        let mut inv = Investigation::submit(
            "inv-00000001".into(),
            NewInvestigation::new("usr-1", "q", DataSource::Biddings),
            Utc::now(),
        )
        .unwrap();
        db.insert_investigation(&inv, &[]).await.unwrap();
        inv.start(Utc::now()).unwrap();
        inv.version = 1;
        db.update_investigation(&inv, 0, None, &[]).await.unwrap();
        (db, inv)
    }

    #[tokio::test]
    async fn anomaly_written_with_update() {
        let (db, mut inv) = db_with_running().await;
        let found = anomaly("anm-00000001", &inv.id, 0.8);
        inv.advance(&ProgressUpdate::new("scan", 0.5, 10), Utc::now()).unwrap();
        inv.record_anomaly(found.as_result(), Utc::now()).unwrap();
        inv.version = 2;
        db.update_investigation(&inv, 1, Some(&found), &[]).await.unwrap();

        let stored = db.list_anomalies(&inv.id).await.unwrap();
        assert_eq!(stored, vec![found]);
    }

    #[tokio::test]
    async fn conflicting_update_drops_anomaly() {
        let (db, mut inv) = db_with_running().await;
        let found = anomaly("anm-00000001", &inv.id, 0.8);
        inv.version = 2;
        assert!(db.update_investigation(&inv, 0, Some(&found), &[]).await.is_err());
        assert!(db.list_anomalies(&inv.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn out_of_range_confidence_rolls_back_update() {
        let (db, mut inv) = db_with_running().await;
        let bad = anomaly("anm-00000001", &inv.id, 1.5);
        inv.version = 2;
        assert!(db.update_investigation(&inv, 1, Some(&bad), &[]).await.is_err());

        let stored = db.get_investigation(&inv.id).await.unwrap().unwrap();
        assert_eq!(stored.version, 1);
    }

    #[tokio::test]
    async fn unknown_investigation_has_no_anomalies() {
        let db = InqDb::open_local(":memory:").await.unwrap();
        assert!(db.list_anomalies("inv-ffffffff").await.unwrap().is_empty());
    }
}
