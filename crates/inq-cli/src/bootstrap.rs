use std::path::Path;

use anyhow::Context;
use inq_config::InqConfig;

use crate::cli::GlobalFlags;

/// Resolve configuration: an explicit `--config` file replaces the user and
/// project layers; environment variables still win either way.
pub fn load_config(flags: &GlobalFlags) -> anyhow::Result<InqConfig> {
    match flags.config.as_deref() {
        Some(path) => {
            let path = Path::new(path);
            if !path.exists() {
                anyhow::bail!("config file '{}' does not exist", path.display());
            }
            InqConfig::load_from_file(path)
                .with_context(|| format!("failed to load config from {}", path.display()))
        }
        None => InqConfig::load_with_dotenv().context("failed to load configuration"),
    }
}
