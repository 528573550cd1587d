//! Concurrent access: per-record serialization, optimistic versioning, claims.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use pretty_assertions::assert_eq;
use rstest::rstest;

use inq_config::StoreBackend;
use inq_core::entities::{Investigation, NewInvestigation};
use inq_core::enums::{DataSource, InvestigationStatus};
use inq_core::lifecycle::ProgressUpdate;
use inq_db::InqDb;
use inq_db::error::DatabaseError;
use inq_db::service::{InvestigationService, WORKER_ID_KEY};
use inq_db::store::{InvestigationStore, MemoryStore};
use inq_db::trail::TrailWriter;

async fn store(backend: StoreBackend) -> Arc<dyn InvestigationStore> {
    match backend {
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
        StoreBackend::Libsql => Arc::new(InqDb::open_local(":memory:").await.unwrap()),
    }
}

fn request() -> NewInvestigation {
    NewInvestigation::new("usr-1", "vendor concentration", DataSource::Biddings)
}

#[rstest]
#[case::memory(StoreBackend::Memory)]
#[case::libsql(StoreBackend::Libsql)]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_advances_never_regress(#[case] backend: StoreBackend) {
    let svc = Arc::new(InvestigationService::new(
        store(backend).await,
        TrailWriter::disabled(),
    ));
    let inv = svc.submit(request()).await.unwrap();
    svc.start(&inv.id).await.unwrap();

    let mut handles = Vec::new();
    for step in 1..=20u32 {
        let svc = Arc::clone(&svc);
        let id = inv.id.clone();
        handles.push(tokio::spawn(async move {
            let update = ProgressUpdate::new(
                format!("step-{step}"),
                f64::from(step) / 20.0,
                u64::from(step) * 10,
            );
            svc.advance(&id, &update).await
        }));
    }

    let mut accepted = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => accepted += 1,
            Err(e) => assert!(e.is_invalid_progress(), "unexpected error: {e}"),
        }
    }

    let stored = svc.get(&inv.id).await.unwrap();
    // Whichever order the tasks ran in, the highest step is never lost
    // behind a lower one and every accepted call bumped the version once.
    assert_eq!(stored.progress, 1.0);
    assert_eq!(stored.total_records_analyzed, 200);
    assert_eq!(stored.version, 1 + accepted);
}

#[rstest]
#[case::memory(StoreBackend::Memory)]
#[case::libsql(StoreBackend::Libsql)]
#[tokio::test]
async fn stale_writer_gets_conflict(#[case] backend: StoreBackend) {
    let store = store(backend).await;
    let svc = InvestigationService::new(Arc::clone(&store), TrailWriter::disabled());
    let inv = svc.submit(request()).await.unwrap();

    // Another process read the record before this service started it.
    let mut stale: Investigation = store.get(&inv.id).await.unwrap().unwrap();
    svc.start(&inv.id).await.unwrap();

    stale.fail("stale writer", Utc::now()).unwrap();
    stale.version += 1;
    let err = store.update(&stale, 0, None, &[]).await.unwrap_err();
    assert!(matches!(err, DatabaseError::Conflict { expected_version: 0, .. }));

    let current = svc.get(&inv.id).await.unwrap();
    assert_eq!(current.status, InvestigationStatus::Running);
    assert_eq!(current.version, 1);
}

#[rstest]
#[case::memory(StoreBackend::Memory)]
#[case::libsql(StoreBackend::Libsql)]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn competing_claimers_take_each_record_once(#[case] backend: StoreBackend) {
    let shared = store(backend).await;
    // Separate services share only the store, like separate processes.
    let workers: Vec<Arc<InvestigationService>> = (0..3)
        .map(|_| {
            Arc::new(InvestigationService::new(
                Arc::clone(&shared),
                TrailWriter::disabled(),
            ))
        })
        .collect();

    let mut submitted = HashSet::new();
    for _ in 0..6 {
        submitted.insert(workers[0].submit(request()).await.unwrap().id);
    }

    let mut handles = Vec::new();
    for (n, svc) in workers.iter().enumerate() {
        let svc = Arc::clone(svc);
        handles.push(tokio::spawn(async move {
            let worker = format!("worker-{n}");
            let mut mine = Vec::new();
            while let Some(inv) = svc.claim_next(&worker).await.unwrap() {
                mine.push(inv);
            }
            mine
        }));
    }

    let mut claimed = HashSet::new();
    for handle in handles {
        for inv in handle.await.unwrap() {
            assert_eq!(inv.status, InvestigationStatus::Running);
            assert!(inv.investigation_metadata.contains_key(WORKER_ID_KEY));
            assert!(claimed.insert(inv.id), "record claimed twice");
        }
    }
    assert_eq!(claimed, submitted);
}
