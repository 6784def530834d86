pub mod config;
pub mod doctor;
pub mod run;
pub mod scenarios;

use std::path::PathBuf;

use anyhow::Context;
use crosscheck_core::config::{
    AppConfig, ConfigError, ConfigOverrides, LoadOptions, LoadedConfig, LogFormat,
};
use serde::Serialize;
use tracing::warn;

pub const EXIT_OK: u8 = 0;
pub const EXIT_CHECK_FAILED: u8 = 1;
pub const EXIT_CONFIG: u8 = 2;
pub const EXIT_ORACLE_CONNECT: u8 = 3;
pub const EXIT_SCENARIO_FAILED: u8 = 6;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
}

impl CommandResult {
    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
        };
        Self { exit_code, output: serialize_payload(payload) }
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            escape_json(&error.to_string())
        )
    })
}

pub(crate) fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Loads config, brings up logging, then reports any file fallback.
pub(crate) fn load_config(
    config_path: Option<PathBuf>,
    overrides: ConfigOverrides,
) -> Result<LoadedConfig, ConfigError> {
    let loaded =
        AppConfig::load_detailed(LoadOptions { config_path, require_file: false, overrides })?;
    init_logging(&loaded.config);

    for warning in &loaded.warnings {
        warn!(
            event_name = "config.file.fallback",
            path = %warning.path.display(),
            error = %warning.error,
            "config file ignored; using remaining layers"
        );
    }

    Ok(loaded)
}

/// Logs go to stderr so stdout stays machine-readable. Repeated calls keep
/// the first subscriber.
pub fn init_logging(config: &AppConfig) {
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    let _ = match config.logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}

pub(crate) fn runtime() -> anyhow::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to initialize async runtime")
}
