use crate::cli::GlobalFlags;
use crate::cli::root_commands::ClaimArgs;
use crate::context::AppContext;
use crate::output::output;

/// Prints the claimed investigation, or `null` when nothing is pending.
pub async fn handle(args: &ClaimArgs, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let claimed = ctx.service.claim_next(&args.worker).await?;
    if claimed.is_none() {
        tracing::info!(worker = %args.worker, "no pending investigations to claim");
    }
    output(&claimed, flags.format)
}
