use inq_core::entities::{Anomaly, Investigation, NewAnomaly};
use inq_core::enums::Severity;
use inq_core::lifecycle::{Completion, ProgressUpdate};
use inq_db::service::InvestigationService;
use serde::Serialize;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::{AdvanceArgs, AnomalyArgs, CompleteArgs, FailArgs, IdArgs};
use crate::commands::shared::parse::{parse_enum, parse_key_values};
use crate::context::AppContext;
use crate::output::output;

#[derive(Debug, Serialize)]
struct AnomalyRecorded {
    investigation: Investigation,
    anomaly: Anomaly,
}

pub async fn handle_start(
    args: &IdArgs,
    ctx: &AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    let investigation = ctx.service.start(&args.id).await?;
    output(&investigation, flags.format)
}

/// Build the progress update; an omitted `--records` keeps the stored total.
pub async fn build_progress(
    args: &AdvanceArgs,
    service: &InvestigationService,
) -> anyhow::Result<ProgressUpdate> {
    let records = match args.records {
        Some(records) => records,
        None => service.get(&args.id).await?.total_records_analyzed,
    };
    Ok(ProgressUpdate::new(&args.phase, args.progress, records))
}

pub async fn handle_advance(
    args: &AdvanceArgs,
    ctx: &AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    let update = build_progress(args, &ctx.service).await?;
    let investigation = ctx.service.advance(&args.id, &update).await?;
    output(&investigation, flags.format)
}

/// Build the anomaly request from CLI arguments.
pub fn build_anomaly(args: &AnomalyArgs) -> anyhow::Result<NewAnomaly> {
    let severity: Severity = parse_enum(&args.severity, "severity")?;
    Ok(NewAnomaly {
        anomaly_type: args.anomaly_type.clone(),
        severity,
        confidence: args.confidence,
        description: args.description.clone(),
        contract_id: args.contract.clone(),
        evidence: parse_key_values(&args.evidence, "evidence")?,
    })
}

pub async fn handle_anomaly(
    args: &AnomalyArgs,
    ctx: &AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    let request = build_anomaly(args)?;
    let (investigation, anomaly) = ctx.service.record_anomaly(&args.id, request).await?;
    output(&AnomalyRecorded { investigation, anomaly }, flags.format)
}

pub async fn handle_complete(
    args: &CompleteArgs,
    ctx: &AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    let mut completion = Completion::new(&args.summary, args.anomalies);
    if let Some(score) = args.confidence {
        completion = completion.confidence(score);
    }
    let investigation = ctx.service.complete(&args.id, completion).await?;
    output(&investigation, flags.format)
}

pub async fn handle_fail(
    args: &FailArgs,
    ctx: &AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    let investigation = ctx.service.fail(&args.id, &args.message).await?;
    output(&investigation, flags.format)
}

#[cfg(test)]
mod tests {
    use inq_core::entities::NewInvestigation;
    use inq_core::enums::{DataSource, Severity};
    use inq_core::lifecycle::ProgressUpdate;
    use inq_db::service::InvestigationService;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::{build_anomaly, build_progress};
    use crate::cli::root_commands::{AdvanceArgs, AnomalyArgs};

    fn advance(id: &str, progress: f64, records: Option<u64>) -> AdvanceArgs {
        AdvanceArgs {
            id: id.into(),
            phase: "analyze".into(),
            progress,
            records,
        }
    }

    #[tokio::test]
    async fn omitted_records_keep_recorded_total() {
        let svc = InvestigationService::in_memory();
        let inv = svc
            .submit(NewInvestigation::new("usr-1", "fuel cards", DataSource::Expenses))
            .await
            .unwrap();
        svc.start(&inv.id).await.unwrap();
        svc.advance(&inv.id, &ProgressUpdate::new("fetch", 0.3, 40))
            .await
            .unwrap();

        let update = build_progress(&advance(&inv.id, 0.5, None), &svc).await.unwrap();
        assert_eq!(update.records_processed, 40);
        let advanced = svc.advance(&inv.id, &update).await.unwrap();
        assert_eq!(advanced.total_records_analyzed, 40);
        assert_eq!(advanced.progress, 0.5);

        let explicit = build_progress(&advance(&inv.id, 0.6, Some(90)), &svc).await.unwrap();
        assert_eq!(explicit.records_processed, 90);
    }

    #[tokio::test]
    async fn omitted_records_on_unknown_id_is_not_found() {
        let svc = InvestigationService::in_memory();
        let err = build_progress(&advance("inv-ffffffffffffffff", 0.5, None), &svc)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("inv-ffffffffffffffff"));
    }

    fn args(severity: &str) -> AnomalyArgs {
        AnomalyArgs {
            id: "inv-1".into(),
            anomaly_type: "price_deviation".into(),
            severity: severity.into(),
            confidence: 0.82,
            description: "unit price 4x market median".into(),
            contract: Some("ct-77".into()),
            evidence: vec!["ratio=4.1".into()],
        }
    }

    #[test]
    fn anomaly_request_maps_arguments() {
        let anomaly = build_anomaly(&args("critical")).expect("anomaly should build");
        assert_eq!(anomaly.severity, Severity::Critical);
        assert_eq!(anomaly.contract_id.as_deref(), Some("ct-77"));
        assert_eq!(anomaly.evidence["ratio"], json!(4.1));
    }

    #[test]
    fn unknown_severity_is_rejected() {
        assert!(build_anomaly(&args("extreme")).is_err());
    }
}
