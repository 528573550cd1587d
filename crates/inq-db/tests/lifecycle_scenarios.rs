//! End-to-end lifecycle scenarios, run against both store backends.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use rstest::rstest;

use inq_config::StoreBackend;
use inq_core::entities::{NewAnomaly, NewInvestigation};
use inq_core::enums::{DataSource, InvestigationStatus, Severity};
use inq_core::errors::CoreError;
use inq_core::lifecycle::{Completion, ProgressUpdate};
use inq_db::InqDb;
use inq_db::error::InvestigationError;
use inq_db::repos::InvestigationFilter;
use inq_db::service::InvestigationService;
use inq_db::store::MemoryStore;
use inq_db::trail::TrailWriter;

async fn service(backend: StoreBackend) -> InvestigationService {
    match backend {
        StoreBackend::Memory => {
            InvestigationService::new(Arc::new(MemoryStore::new()), TrailWriter::disabled())
        }
        StoreBackend::Libsql => {
            let db = InqDb::open_local(":memory:").await.unwrap();
            InvestigationService::new(Arc::new(db), TrailWriter::disabled())
        }
    }
}

fn request() -> NewInvestigation {
    NewInvestigation::new("usr-42", "emergency purchases in 2024", DataSource::Contracts)
        .session("ses-1")
        .filter("state", serde_json::json!("SP"))
        .anomaly_type("price_deviation")
}

#[rstest]
#[case::memory(StoreBackend::Memory)]
#[case::libsql(StoreBackend::Libsql)]
#[tokio::test]
async fn happy_path_to_completed(#[case] backend: StoreBackend) {
    let svc = service(backend).await;
    let inv = svc.submit(request()).await.unwrap();
    assert_eq!(inv.status, InvestigationStatus::Pending);

    let inv = svc.start(&inv.id).await.unwrap();
    assert_eq!(inv.status, InvestigationStatus::Running);
    assert_eq!(inv.progress, 0.0);
    assert!(inv.started_at.is_some());

    svc.advance(&inv.id, &ProgressUpdate::new("fetch", 0.3, 100))
        .await
        .unwrap();
    let inv = svc
        .advance(&inv.id, &ProgressUpdate::new("analyze", 0.8, 500))
        .await
        .unwrap();
    assert_eq!(inv.current_phase.as_deref(), Some("analyze"));
    assert_eq!(inv.total_records_analyzed, 500);

    let done = svc
        .complete(&inv.id, Completion::new("done", 3).confidence(0.91))
        .await
        .unwrap();
    assert_eq!(done.status, InvestigationStatus::Completed);
    assert_eq!(done.progress, 1.0);
    assert_eq!(done.anomalies_found, 3);
    assert_eq!(done.confidence_score, Some(0.91));
    assert!(done.completed_at.is_some());
    assert!(done.processing_time_ms.is_some());

    // Persist-then-read yields the same record.
    assert_eq!(svc.get(&done.id).await.unwrap(), done);
}

#[rstest]
#[case::memory(StoreBackend::Memory)]
#[case::libsql(StoreBackend::Libsql)]
#[tokio::test]
async fn failure_keeps_last_progress(#[case] backend: StoreBackend) {
    let svc = service(backend).await;
    let inv = svc.submit(request()).await.unwrap();
    svc.start(&inv.id).await.unwrap();
    svc.advance(&inv.id, &ProgressUpdate::new("fetch", 0.3, 100))
        .await
        .unwrap();

    let failed = svc.fail(&inv.id, "LLM timeout").await.unwrap();
    assert_eq!(failed.status, InvestigationStatus::Failed);
    assert_eq!(failed.error_message.as_deref(), Some("LLM timeout"));
    assert_eq!(failed.progress, 0.3);
    assert_eq!(svc.get(&inv.id).await.unwrap(), failed);
}

#[rstest]
#[case::memory(StoreBackend::Memory)]
#[case::libsql(StoreBackend::Libsql)]
#[tokio::test]
async fn pending_can_fail_directly(#[case] backend: StoreBackend) {
    let svc = service(backend).await;
    let inv = svc.submit(request()).await.unwrap();
    let failed = svc.fail(&inv.id, "quota exceeded").await.unwrap();
    assert_eq!(failed.status, InvestigationStatus::Failed);
    assert_eq!(failed.started_at, None);
    assert_eq!(failed.processing_time_ms, None);
}

#[rstest]
#[case::memory(StoreBackend::Memory)]
#[case::libsql(StoreBackend::Libsql)]
#[tokio::test]
async fn terminal_states_reject_everything(#[case] backend: StoreBackend) {
    let svc = service(backend).await;
    let inv = svc.submit(request()).await.unwrap();
    svc.fail(&inv.id, "cancelled").await.unwrap();

    assert!(svc.start(&inv.id).await.unwrap_err().is_invalid_transition());
    assert!(
        svc.advance(&inv.id, &ProgressUpdate::new("fetch", 0.5, 1))
            .await
            .unwrap_err()
            .is_invalid_transition()
    );
    assert!(
        svc.complete(&inv.id, Completion::new("late", 0))
            .await
            .unwrap_err()
            .is_invalid_transition()
    );
    assert!(svc.fail(&inv.id, "again").await.unwrap_err().is_invalid_transition());
    let anomaly = NewAnomaly {
        anomaly_type: "late".into(),
        severity: Severity::Low,
        confidence: 0.1,
        description: "after the fact".into(),
        contract_id: None,
        evidence: Default::default(),
    };
    assert!(
        svc.record_anomaly(&inv.id, anomaly)
            .await
            .unwrap_err()
            .is_invalid_transition()
    );

    // The record itself never moved past its first failure.
    let stored = svc.get(&inv.id).await.unwrap();
    assert_eq!(stored.error_message.as_deref(), Some("cancelled"));
    assert_eq!(stored.version, 1);
}

#[rstest]
#[case::memory(StoreBackend::Memory)]
#[case::libsql(StoreBackend::Libsql)]
#[tokio::test]
async fn regressive_progress_rejected(#[case] backend: StoreBackend) {
    let svc = service(backend).await;
    let inv = svc.submit(request()).await.unwrap();
    svc.start(&inv.id).await.unwrap();
    svc.advance(&inv.id, &ProgressUpdate::new("analyze", 0.6, 300))
        .await
        .unwrap();

    let lower = svc
        .advance(&inv.id, &ProgressUpdate::new("fetch", 0.4, 300))
        .await
        .unwrap_err();
    assert!(lower.is_invalid_progress());

    let fewer_records = svc
        .advance(&inv.id, &ProgressUpdate::new("analyze", 0.7, 200))
        .await
        .unwrap_err();
    assert!(fewer_records.is_invalid_progress());

    let stored = svc.get(&inv.id).await.unwrap();
    assert_eq!(stored.progress, 0.6);
    assert_eq!(stored.total_records_analyzed, 300);
}

#[rstest]
#[case::memory(StoreBackend::Memory)]
#[case::libsql(StoreBackend::Libsql)]
#[tokio::test]
async fn blank_inputs_are_validation_errors(#[case] backend: StoreBackend) {
    let svc = service(backend).await;

    let err = svc
        .submit(NewInvestigation::new("usr-1", "   ", DataSource::Servants))
        .await
        .unwrap_err();
    assert!(matches!(err, InvestigationError::Lifecycle(CoreError::Validation(_))));

    let inv = svc.submit(request()).await.unwrap();
    let err = svc.fail(&inv.id, "  ").await.unwrap_err();
    assert!(matches!(err, InvestigationError::Lifecycle(CoreError::Validation(_))));
    assert_eq!(svc.get(&inv.id).await.unwrap().status, InvestigationStatus::Pending);
}

#[rstest]
#[case::memory(StoreBackend::Memory)]
#[case::libsql(StoreBackend::Libsql)]
#[tokio::test]
async fn list_by_user_and_status(#[case] backend: StoreBackend) {
    let svc = service(backend).await;
    let a = svc.submit(request()).await.unwrap();
    let b = svc.submit(request()).await.unwrap();
    svc.submit(NewInvestigation::new("usr-7", "other", DataSource::Expenses))
        .await
        .unwrap();
    svc.start(&b.id).await.unwrap();

    let mine = svc.list(&InvestigationFilter::for_user("usr-42")).await.unwrap();
    let ids: Vec<&str> = mine.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec![b.id.as_str(), a.id.as_str()]);

    let running = svc
        .list(&InvestigationFilter::for_user("usr-42").status(InvestigationStatus::Running))
        .await
        .unwrap();
    assert_eq!(running.len(), 1);
    assert_eq!(running[0].id, b.id);

    let limited = svc.list(&InvestigationFilter::default().limit(1)).await.unwrap();
    assert_eq!(limited.len(), 1);
}
