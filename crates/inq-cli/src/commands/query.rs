use inq_core::enums::InvestigationStatus;
use inq_db::repos::InvestigationFilter;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::{IdArgs, ListArgs};
use crate::commands::shared::limit::effective_limit;
use crate::commands::shared::parse::parse_enum;
use crate::context::AppContext;
use crate::output::output;

pub async fn handle_get(
    args: &IdArgs,
    ctx: &AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    let investigation = ctx.service.get(&args.id).await?;
    output(&investigation, flags.format)
}

/// Build the list filter; the limit falls back to the configured default.
pub fn build_filter(
    args: &ListArgs,
    flags: &GlobalFlags,
    default_limit: u32,
) -> anyhow::Result<InvestigationFilter> {
    let mut filter = InvestigationFilter {
        user_id: args.user.clone(),
        ..InvestigationFilter::default()
    };
    if let Some(raw) = &args.status {
        let status: InvestigationStatus = parse_enum(raw, "status")?;
        filter = filter.status(status);
    }
    if args.oldest_first {
        filter = filter.oldest_first();
    }
    Ok(filter.limit(effective_limit(None, flags.limit, default_limit)))
}

pub async fn handle_list(
    args: &ListArgs,
    ctx: &AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    let filter = build_filter(args, flags, ctx.config.general.default_limit)?;
    let investigations = ctx.service.list(&filter).await?;
    output(&investigations, flags.format)
}

pub async fn handle_anomalies(
    args: &IdArgs,
    ctx: &AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    let anomalies = ctx.service.anomalies(&args.id).await?;
    output(&anomalies, flags.format)
}

pub async fn handle_trail(
    args: &IdArgs,
    ctx: &AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    if !ctx.service.trail().is_enabled() {
        tracing::warn!("trail is disabled; set trail.enabled to record lifecycle events");
    }
    let events = ctx.service.trail_events(&args.id).await?;
    output(&events, flags.format)
}
