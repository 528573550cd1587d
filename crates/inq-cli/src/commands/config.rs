use inq_config::InqConfig;

use crate::cli::GlobalFlags;

/// Print the effective configuration as TOML; output format flags do not apply.
pub fn handle(config: &InqConfig, _flags: &GlobalFlags) -> anyhow::Result<()> {
    let rendered = toml::to_string_pretty(config)?;
    print!("{rendered}");
    Ok(())
}
