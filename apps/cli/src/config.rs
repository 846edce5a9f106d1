//! Layered CLI configuration
//!
//! Sources, later ones winning:
//! 1. built-in defaults
//! 2. `<config dir>/assetlsp/assetlsp.toml`
//! 3. `./assetlsp.toml`
//! 4. `ASSETLSP_*` environment variables (`.env` is read first), nested keys
//!    separated by `__`, e.g. `ASSETLSP_LOGGING__LEVEL=debug`
//! 5. command line flags

use std::path::PathBuf;

use anyhow::Context;
use config::{Config, Environment, File};
use serde::Deserialize;

const CONFIG_NAME: &str = "assetlsp";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Schema JSON describing types and enums.
    pub schema: Option<PathBuf>,
    /// Directory scanned for cross-referenced asset files.
    pub root: Option<PathBuf>,
    pub logging: LoggingConfig,
    pub evaluation: EvaluationConfig,
    pub workspace: WorkspaceConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EvaluationConfig {
    pub max_cross_reference_depth: u8,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkspaceConfig {
    pub cache_capacity: usize,
}

/// Values given on the command line.
#[derive(Debug, Default)]
pub struct Overrides {
    pub schema: Option<PathBuf>,
    pub root: Option<PathBuf>,
    pub log_level: Option<String>,
    pub log_json: bool,
}

impl Settings {
    pub fn load(overrides: &Overrides) -> anyhow::Result<Self> {
        // a missing .env is fine
        dotenvy::dotenv().ok();

        let mut builder = Config::builder()
            .set_default("logging.level", "warn")?
            .set_default("logging.json", false)?
            .set_default(
                "evaluation.max_cross_reference_depth",
                i64::from(assetlsp_values::context::DEFAULT_MAX_CROSS_REFERENCE_DEPTH),
            )?
            .set_default(
                "workspace.cache_capacity",
                assetlsp_workspace::DEFAULT_CACHE_CAPACITY as i64,
            )?;

        if let Some(dir) = dirs::config_dir() {
            let user = dir.join(CONFIG_NAME).join(format!("{}.toml", CONFIG_NAME));
            builder = builder.add_source(File::from(user).required(false));
        }

        let settings = builder
            .add_source(File::with_name(CONFIG_NAME).required(false))
            .add_source(
                Environment::with_prefix("ASSETLSP")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .set_override_option("schema", path_string(&overrides.schema))?
            .set_override_option("root", path_string(&overrides.root))?
            .set_override_option("logging.level", overrides.log_level.clone())?
            .set_override_option("logging.json", overrides.log_json.then_some(true))?
            .build()
            .context("Failed to read configuration")?;

        settings
            .try_deserialize()
            .context("Invalid configuration")
    }

    pub fn schema(&self) -> anyhow::Result<&PathBuf> {
        self.schema.as_ref().context(
            "No schema configured; pass --schema or set ASSETLSP_SCHEMA",
        )
    }
}

fn path_string(path: &Option<PathBuf>) -> Option<String> {
    path.as_ref().map(|p| p.display().to_string())
}
