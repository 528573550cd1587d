use inq_core::entities::NewInvestigation;
use inq_core::enums::DataSource;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::SubmitArgs;
use crate::commands::shared::parse::{parse_enum, parse_key_values};
use crate::context::AppContext;
use crate::output::output;

/// Build the submission request from CLI arguments.
pub fn build_request(args: &SubmitArgs) -> anyhow::Result<NewInvestigation> {
    let source: DataSource = parse_enum(&args.source, "source")?;
    let mut request = NewInvestigation::new(&args.user, &args.query, source);
    if let Some(session) = &args.session {
        request = request.session(session);
    }
    request.filters = parse_key_values(&args.filters, "filter")?;
    request.anomaly_types.clone_from(&args.anomaly_types);
    Ok(request)
}

pub async fn handle(
    args: &SubmitArgs,
    ctx: &AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    let request = build_request(args)?;
    let investigation = ctx.service.submit(request).await?;
    output(&investigation, flags.format)
}
