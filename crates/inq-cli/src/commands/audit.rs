use inq_core::enums::AuditAction;
use inq_db::repos::AuditFilter;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::AuditArgs;
use crate::commands::shared::limit::effective_limit;
use crate::commands::shared::parse::parse_enum;
use crate::context::AppContext;
use crate::output::output;

pub async fn handle(args: &AuditArgs, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let mut filter = AuditFilter {
        investigation_id: args.investigation.clone(),
        ..AuditFilter::default()
    };
    if let Some(raw) = &args.action {
        let action: AuditAction = parse_enum(raw, "action")?;
        filter.action = Some(action);
    }
    filter.limit = Some(effective_limit(None, flags.limit, ctx.config.general.default_limit));

    let entries = ctx.service.audit(&filter).await?;
    output(&entries, flags.format)
}
