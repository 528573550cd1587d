use crate::cli::GlobalFlags;
use crate::cli::root_commands::Commands;
use crate::commands;
use crate::context::AppContext;

/// Dispatch a parsed command to the corresponding handler module.
pub async fn dispatch(
    command: Commands,
    ctx: &AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    match command {
        Commands::Submit(args) => commands::submit::handle(&args, ctx, flags).await,
        Commands::Start(args) => commands::lifecycle::handle_start(&args, ctx, flags).await,
        Commands::Advance(args) => commands::lifecycle::handle_advance(&args, ctx, flags).await,
        Commands::Anomaly(args) => commands::lifecycle::handle_anomaly(&args, ctx, flags).await,
        Commands::Complete(args) => commands::lifecycle::handle_complete(&args, ctx, flags).await,
        Commands::Fail(args) => commands::lifecycle::handle_fail(&args, ctx, flags).await,
        Commands::Claim(args) => commands::claim::handle(&args, ctx, flags).await,
        Commands::Get(args) => commands::query::handle_get(&args, ctx, flags).await,
        Commands::List(args) => commands::query::handle_list(&args, ctx, flags).await,
        Commands::Anomalies(args) => commands::query::handle_anomalies(&args, ctx, flags).await,
        Commands::Trail(args) => commands::query::handle_trail(&args, ctx, flags).await,
        Commands::Audit(args) => commands::audit::handle(&args, ctx, flags).await,
        Commands::Migrations | Commands::Config => {
            unreachable!("migrations/config are pre-dispatched in main")
        }
    }
}
