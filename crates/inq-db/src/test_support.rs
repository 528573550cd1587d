//! Shared test utilities for inq-db unit tests.

use std::path::PathBuf;
use std::sync::Arc;

use inq_core::entities::{Investigation, NewInvestigation};
use inq_core::enums::DataSource;

use crate::InqDb;
use crate::service::InvestigationService;
use crate::trail::TrailWriter;

/// Service over an in-memory libSQL database, trail disabled.
pub async fn libsql_service() -> InvestigationService {
    let db = InqDb::open_local(":memory:").await.unwrap();
    InvestigationService::new(Arc::new(db), TrailWriter::disabled())
}

/// Service over an in-memory libSQL database, trail written to `trail_dir`.
pub async fn libsql_service_with_trail(trail_dir: PathBuf) -> InvestigationService {
    let db = InqDb::open_local(":memory:").await.unwrap();
    InvestigationService::new(Arc::new(db), TrailWriter::new(trail_dir).unwrap())
}

/// Submit and start an investigation, returning the running record.
pub async fn running(svc: &InvestigationService) -> Investigation {
    let inv = svc
        .submit(NewInvestigation::new("usr-1", "suspicious biddings", DataSource::Biddings))
        .await
        .unwrap();
    svc.start(&inv.id).await.unwrap()
}
