use anyhow::Context;
use inq_config::{InqConfig, StoreBackend};
use inq_db::InqDb;

use crate::cli::GlobalFlags;
use crate::output::output;

/// Open the configured database, which applies any pending revisions, then
/// print what `schema_migrations` holds.
pub async fn handle(config: &InqConfig, flags: &GlobalFlags) -> anyhow::Result<()> {
    if config.database.backend == StoreBackend::Memory {
        anyhow::bail!("migrations need the libsql backend; database.backend is 'memory'");
    }
    let path = &config.database.path;
    let db = InqDb::open_local(path)
        .await
        .with_context(|| format!("failed to open database at {path}"))?;
    let applied = db.applied_migrations().await?;
    output(&applied, flags.format)
}
