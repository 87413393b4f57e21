//! Layered service configuration
//!
//! Values resolve from built-in defaults, then an optional TOML file, then
//! `MODELHUB__<SECTION>__<KEY>` environment variables. `MODELHUB_TRACKING_URI`
//! overrides the tracking root last.

use anyhow::{Context, Result};
use config::{Config, ConfigBuilder, Environment, File};
use modelhub_api::ApiConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const ENV_PREFIX: &str = "MODELHUB";
pub const TRACKING_URI_ENV: &str = "MODELHUB_TRACKING_URI";
const DEFAULT_CONFIG_NAME: &str = "modelhub";

/// Model catalog settings
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CatalogSettings {
    pub database_path: PathBuf,
}

/// Tracking store settings
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TrackingSettings {
    /// Root directory of the run store
    pub root: PathBuf,
    /// Experiment every run is filed under
    pub experiment: String,
}

/// Log output settings
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LoggingSettings {
    pub directory: PathBuf,
    /// Default filter when `RUST_LOG` is unset
    pub level: String,
    /// Write the log files as JSON lines
    pub json: bool,
    /// Rotated files kept on disk
    pub max_files: usize,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Settings {
    pub server: ApiConfig,
    pub catalog: CatalogSettings,
    pub tracking: TrackingSettings,
    pub logging: LoggingSettings,
}

impl Settings {
    /// Load settings from the process environment.
    ///
    /// An explicit `config_path` must exist; otherwise `modelhub.toml` in the
    /// working directory is read when present.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let env = Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true);
        let tracking_uri = std::env::var(TRACKING_URI_ENV).ok();
        Self::load_with(config_path, env, tracking_uri)
    }

    fn load_with(
        config_path: Option<&Path>,
        env: Environment,
        tracking_uri: Option<String>,
    ) -> Result<Self> {
        let mut builder = defaults()?;

        builder = match config_path {
            Some(path) => builder.add_source(File::from(path).required(true)),
            None => builder.add_source(File::with_name(DEFAULT_CONFIG_NAME).required(false)),
        };
        builder = builder.add_source(env);

        if let Some(uri) = tracking_uri.filter(|uri| !uri.is_empty()) {
            builder = builder
                .set_override("tracking.root", uri)
                .context("Invalid tracking URI override")?;
        }

        builder
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")
    }
}

fn defaults() -> Result<ConfigBuilder<config::builder::DefaultState>> {
    let defaults = ApiConfig::default();
    Config::builder()
        .set_default("server.host", defaults.host)?
        .set_default("server.rest_port", i64::from(defaults.rest_port))?
        .set_default("server.rpc_port", i64::from(defaults.rpc_port))?
        .set_default("catalog.database_path", "modelhub.db")?
        .set_default("tracking.root", "mlruns")?
        .set_default("tracking.experiment", "default")?
        .set_default("logging.directory", "logs")?
        .set_default("logging.level", "info")?
        .set_default("logging.json", false)?
        .set_default("logging.max_files", 10_i64)
        .context("Invalid built-in configuration")
}
