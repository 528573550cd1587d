//! # inq-config
//!
//! Layered configuration loading for Inquest using figment.
//!
//! Configuration sources (in priority order, highest wins):
//! 1. Environment variables (`INQ_*` prefix, `__` as separator)
//! 2. Project-level `.inquest/config.toml`
//! 3. User-level `~/.config/inquest/config.toml`
//! 4. Built-in defaults
//!
//! # Environment Variable Mapping
//!
//! Figment maps `INQ_DATABASE__BACKEND` -> `database.backend`,
//! `INQ_TRAIL__DIR` -> `trail.dir`, etc.
//!
//! # Usage
//!
//! ```no_run
//! use inq_config::InqConfig;
//!
//! let config = InqConfig::load_with_dotenv().expect("config");
//! println!("store: {:?} at {}", config.database.backend, config.database.path);
//! ```

mod database;
mod error;
mod general;
mod trail;

pub use database::{DatabaseConfig, StoreBackend};
pub use error::ConfigError;
pub use general::GeneralConfig;
pub use trail::TrailConfig;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const ENV_PREFIX: &str = "INQ_";
const PROJECT_CONFIG: &str = ".inquest/config.toml";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct InqConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub trail: TrailConfig,
    #[serde(default)]
    pub general: GeneralConfig,
}

impl InqConfig {
    /// Load configuration from all sources (TOML files + environment variables).
    ///
    /// Does NOT call `dotenvy` -- use [`Self::load_with_dotenv`] for `.env` support.
    pub fn load() -> Result<Self, ConfigError> {
        let config: Self = Self::figment().extract()?;
        config.database.validate()?;
        Ok(config)
    }

    /// Load configuration with `.env` file support.
    pub fn load_with_dotenv() -> Result<Self, ConfigError> {
        Self::load_dotenv_from_workspace();
        Self::load()
    }

    /// Load configuration from an explicit TOML file layered over the defaults,
    /// with environment variables still taking precedence.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let config: Self = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;
        config.database.validate()?;
        Ok(config)
    }

    /// Build the figment provider chain.
    pub fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                figment = figment.merge(Toml::file(global_path));
            }
        }

        let local_path = PathBuf::from(PROJECT_CONFIG);
        if local_path.exists() {
            figment = figment.merge(Toml::file(local_path));
        }

        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("inquest").join("config.toml"))
    }

    /// Load `.env` from the workspace root, falling back to the current dir.
    fn load_dotenv_from_workspace() {
        if let Ok(manifest_dir) = std::env::var("CARGO_MANIFEST_DIR") {
            let mut dir = PathBuf::from(manifest_dir);
            // crate -> crates/ -> workspace root
            for _ in 0..3 {
                let env_path = dir.join(".env");
                if env_path.exists() {
                    let _ = dotenvy::from_path(&env_path);
                    return;
                }
                if !dir.pop() {
                    break;
                }
            }
        }

        let _ = dotenvy::dotenv();
    }
}
