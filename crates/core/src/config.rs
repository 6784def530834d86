use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::driver::DriverSettings;
use crate::oracle::ReadConsistency;
use crate::verify::VerifierSettings;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    pub service: ServiceConfig,
    pub database: DatabaseConfig,
    pub oracle: OracleConfig,
    pub runner: RunnerConfig,
    pub verification: VerificationConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceConfig {
    pub base_url: String,
    pub endpoint: String,
    pub request_timeout_secs: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OracleConfig {
    pub consistency: ConsistencyMode,
    pub convergence_timeout_ms: u64,
    pub poll_interval_ms: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunnerConfig {
    pub workers: usize,
    pub run_tag: Option<String>,
    pub teardown: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerificationConfig {
    pub require_json_errors: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsistencyMode {
    Strong,
    Eventual,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub base_url: Option<String>,
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub workers: Option<usize>,
    pub run_tag: Option<String>,
    pub teardown: Option<bool>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

/// A config file that was found but could not be used. Loading continues
/// with the remaining layers.
#[derive(Debug)]
pub struct ConfigWarning {
    pub path: PathBuf,
    pub error: ConfigError,
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ignoring config file `{}`: {}", self.path.display(), self.error)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigSource {
    Default,
    File,
    Env,
    Override,
}

impl ConfigSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::File => "file",
            Self::Env => "env",
            Self::Override => "override",
        }
    }
}

/// Which layer last set each key. Keys never touched came from defaults.
#[derive(Clone, Debug, Default)]
pub struct Provenance(BTreeMap<&'static str, ConfigSource>);

impl Provenance {
    fn mark(&mut self, key: &'static str, source: ConfigSource) {
        self.0.insert(key, source);
    }

    pub fn source_of(&self, key: &str) -> ConfigSource {
        self.0.get(key).copied().unwrap_or(ConfigSource::Default)
    }
}

#[derive(Debug)]
pub struct LoadedConfig {
    pub config: AppConfig,
    pub warnings: Vec<ConfigWarning>,
    pub provenance: Provenance,
    pub file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            service: ServiceConfig {
                base_url: "http://localhost:8081".to_string(),
                endpoint: "/api/customer".to_string(),
                request_timeout_secs: 10,
            },
            database: DatabaseConfig {
                url: "sqlite://customers.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            oracle: OracleConfig {
                consistency: ConsistencyMode::Eventual,
                convergence_timeout_ms: 3_000,
                poll_interval_ms: 100,
            },
            runner: RunnerConfig { workers: 4, run_tag: None, teardown: false },
            verification: VerificationConfig { require_json_errors: true },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for ConsistencyMode {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "strong" => Ok(Self::Strong),
            "eventual" => Ok(Self::Eventual),
            other => Err(ConfigError::Validation(format!(
                "unsupported oracle consistency `{other}` (expected strong|eventual)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        Self::load_detailed(options).map(|loaded| loaded.config)
    }

    /// Layers defaults, file, env and explicit overrides, then validates.
    ///
    /// An unreadable or unparseable file falls back to the other layers and
    /// is reported in `warnings`, unless `require_file` is set.
    pub fn load_detailed(options: LoadOptions) -> Result<LoadedConfig, ConfigError> {
        let mut config = Self::default();
        let mut provenance = Provenance::default();
        let mut warnings = Vec::new();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        let file = match maybe_path {
            Some(path) => match read_patch(&path) {
                Ok(patch) => {
                    config.apply_patch(patch, &mut provenance);
                    Some(path)
                }
                Err(error) if options.require_file => return Err(error),
                Err(error) => {
                    warnings.push(ConfigWarning { path, error });
                    None
                }
            },
            None if options.require_file => {
                let expected =
                    options.config_path.unwrap_or_else(|| PathBuf::from("crosscheck.toml"));
                return Err(ConfigError::MissingConfigFile(expected));
            }
            None => {
                if let Some(path) = options.config_path {
                    warnings.push(ConfigWarning {
                        path: path.clone(),
                        error: ConfigError::MissingConfigFile(path),
                    });
                }
                None
            }
        };

        config.apply_env_overrides(&mut provenance)?;
        config.apply_overrides(options.overrides, &mut provenance);
        config.validate()?;

        Ok(LoadedConfig { config, warnings, provenance, file })
    }

    fn apply_patch(&mut self, patch: ConfigPatch, provenance: &mut Provenance) {
        let from_file = ConfigSource::File;

        if let Some(service) = patch.service {
            if let Some(base_url) = service.base_url {
                self.service.base_url = base_url;
                provenance.mark("service.base_url", from_file);
            }
            if let Some(endpoint) = service.endpoint {
                self.service.endpoint = endpoint;
                provenance.mark("service.endpoint", from_file);
            }
            if let Some(request_timeout_secs) = service.request_timeout_secs {
                self.service.request_timeout_secs = request_timeout_secs;
                provenance.mark("service.request_timeout_secs", from_file);
            }
        }

        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
                provenance.mark("database.url", from_file);
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
                provenance.mark("database.max_connections", from_file);
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
                provenance.mark("database.timeout_secs", from_file);
            }
        }

        if let Some(oracle) = patch.oracle {
            if let Some(consistency) = oracle.consistency {
                self.oracle.consistency = consistency;
                provenance.mark("oracle.consistency", from_file);
            }
            if let Some(convergence_timeout_ms) = oracle.convergence_timeout_ms {
                self.oracle.convergence_timeout_ms = convergence_timeout_ms;
                provenance.mark("oracle.convergence_timeout_ms", from_file);
            }
            if let Some(poll_interval_ms) = oracle.poll_interval_ms {
                self.oracle.poll_interval_ms = poll_interval_ms;
                provenance.mark("oracle.poll_interval_ms", from_file);
            }
        }

        if let Some(runner) = patch.runner {
            if let Some(workers) = runner.workers {
                self.runner.workers = workers;
                provenance.mark("runner.workers", from_file);
            }
            if let Some(run_tag) = runner.run_tag {
                self.runner.run_tag = Some(run_tag);
                provenance.mark("runner.run_tag", from_file);
            }
            if let Some(teardown) = runner.teardown {
                self.runner.teardown = teardown;
                provenance.mark("runner.teardown", from_file);
            }
        }

        if let Some(verification) = patch.verification {
            if let Some(require_json_errors) = verification.require_json_errors {
                self.verification.require_json_errors = require_json_errors;
                provenance.mark("verification.require_json_errors", from_file);
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
                provenance.mark("logging.level", from_file);
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
                provenance.mark("logging.format", from_file);
            }
        }
    }

    fn apply_env_overrides(&mut self, provenance: &mut Provenance) -> Result<(), ConfigError> {
        let from_env = ConfigSource::Env;

        if let Some(value) = read_env("CROSSCHECK_SERVICE_BASE_URL") {
            self.service.base_url = value;
            provenance.mark("service.base_url", from_env);
        }
        if let Some(value) = read_env("CROSSCHECK_SERVICE_ENDPOINT") {
            self.service.endpoint = value;
            provenance.mark("service.endpoint", from_env);
        }
        if let Some(value) = read_env("CROSSCHECK_SERVICE_REQUEST_TIMEOUT_SECS") {
            self.service.request_timeout_secs =
                parse_u64("CROSSCHECK_SERVICE_REQUEST_TIMEOUT_SECS", &value)?;
            provenance.mark("service.request_timeout_secs", from_env);
        }

        if let Some(value) = read_env("CROSSCHECK_DATABASE_URL") {
            self.database.url = value;
            provenance.mark("database.url", from_env);
        }
        if let Some(value) = read_env("CROSSCHECK_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_u32("CROSSCHECK_DATABASE_MAX_CONNECTIONS", &value)?;
            provenance.mark("database.max_connections", from_env);
        }
        if let Some(value) = read_env("CROSSCHECK_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("CROSSCHECK_DATABASE_TIMEOUT_SECS", &value)?;
            provenance.mark("database.timeout_secs", from_env);
        }

        if let Some(value) = read_env("CROSSCHECK_ORACLE_CONSISTENCY") {
            self.oracle.consistency = value.parse()?;
            provenance.mark("oracle.consistency", from_env);
        }
        if let Some(value) = read_env("CROSSCHECK_ORACLE_CONVERGENCE_TIMEOUT_MS") {
            self.oracle.convergence_timeout_ms =
                parse_u64("CROSSCHECK_ORACLE_CONVERGENCE_TIMEOUT_MS", &value)?;
            provenance.mark("oracle.convergence_timeout_ms", from_env);
        }
        if let Some(value) = read_env("CROSSCHECK_ORACLE_POLL_INTERVAL_MS") {
            self.oracle.poll_interval_ms = parse_u64("CROSSCHECK_ORACLE_POLL_INTERVAL_MS", &value)?;
            provenance.mark("oracle.poll_interval_ms", from_env);
        }

        if let Some(value) = read_env("CROSSCHECK_RUNNER_WORKERS") {
            self.runner.workers = parse_usize("CROSSCHECK_RUNNER_WORKERS", &value)?;
            provenance.mark("runner.workers", from_env);
        }
        if let Some(value) = read_env("CROSSCHECK_RUNNER_RUN_TAG") {
            self.runner.run_tag = Some(value);
            provenance.mark("runner.run_tag", from_env);
        }
        if let Some(value) = read_env("CROSSCHECK_RUNNER_TEARDOWN") {
            self.runner.teardown = parse_bool("CROSSCHECK_RUNNER_TEARDOWN", &value)?;
            provenance.mark("runner.teardown", from_env);
        }

        if let Some(value) = read_env("CROSSCHECK_VERIFICATION_REQUIRE_JSON_ERRORS") {
            self.verification.require_json_errors =
                parse_bool("CROSSCHECK_VERIFICATION_REQUIRE_JSON_ERRORS", &value)?;
            provenance.mark("verification.require_json_errors", from_env);
        }

        let log_level =
            read_env("CROSSCHECK_LOGGING_LEVEL").or_else(|| read_env("CROSSCHECK_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
            provenance.mark("logging.level", from_env);
        }
        let log_format =
            read_env("CROSSCHECK_LOGGING_FORMAT").or_else(|| read_env("CROSSCHECK_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
            provenance.mark("logging.format", from_env);
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides, provenance: &mut Provenance) {
        let from_override = ConfigSource::Override;

        if let Some(base_url) = overrides.base_url {
            self.service.base_url = base_url;
            provenance.mark("service.base_url", from_override);
        }
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
            provenance.mark("database.url", from_override);
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
            provenance.mark("logging.level", from_override);
        }
        if let Some(workers) = overrides.workers {
            self.runner.workers = workers;
            provenance.mark("runner.workers", from_override);
        }
        if let Some(run_tag) = overrides.run_tag {
            self.runner.run_tag = Some(run_tag);
            provenance.mark("runner.run_tag", from_override);
        }
        if let Some(teardown) = overrides.teardown {
            self.runner.teardown = teardown;
            provenance.mark("runner.teardown", from_override);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_service(&self.service)?;
        validate_database(&self.database)?;
        validate_oracle(&self.oracle)?;
        validate_runner(&self.runner)?;
        validate_logging(&self.logging)?;
        Ok(())
    }

    pub fn read_consistency(&self) -> ReadConsistency {
        match self.oracle.consistency {
            ConsistencyMode::Strong => ReadConsistency::Strong,
            ConsistencyMode::Eventual => ReadConsistency::Eventual {
                timeout: Duration::from_millis(self.oracle.convergence_timeout_ms),
                interval: Duration::from_millis(self.oracle.poll_interval_ms),
            },
        }
    }

    pub fn driver_settings(&self) -> DriverSettings {
        DriverSettings {
            endpoint: self.service.endpoint.clone(),
            consistency: self.read_consistency(),
            verifier: VerifierSettings {
                require_json_errors: self.verification.require_json_errors,
            },
            teardown: self.runner.teardown,
        }
    }

    /// Every key with its rendered value, in file order.
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        let consistency = match self.oracle.consistency {
            ConsistencyMode::Strong => "strong",
            ConsistencyMode::Eventual => "eventual",
        };
        let format = match self.logging.format {
            LogFormat::Compact => "compact",
            LogFormat::Pretty => "pretty",
            LogFormat::Json => "json",
        };

        vec![
            ("service.base_url", self.service.base_url.clone()),
            ("service.endpoint", self.service.endpoint.clone()),
            ("service.request_timeout_secs", self.service.request_timeout_secs.to_string()),
            ("database.url", self.database.url.clone()),
            ("database.max_connections", self.database.max_connections.to_string()),
            ("database.timeout_secs", self.database.timeout_secs.to_string()),
            ("oracle.consistency", consistency.to_string()),
            ("oracle.convergence_timeout_ms", self.oracle.convergence_timeout_ms.to_string()),
            ("oracle.poll_interval_ms", self.oracle.poll_interval_ms.to_string()),
            ("runner.workers", self.runner.workers.to_string()),
            ("runner.run_tag", self.runner.run_tag.clone().unwrap_or_default()),
            ("runner.teardown", self.runner.teardown.to_string()),
            (
                "verification.require_json_errors",
                self.verification.require_json_errors.to_string(),
            ),
            ("logging.level", self.logging.level.clone()),
            ("logging.format", format.to_string()),
        ]
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("crosscheck.toml"), PathBuf::from("config/crosscheck.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_service(service: &ServiceConfig) -> Result<(), ConfigError> {
    let base_url = service.base_url.trim();
    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        return Err(ConfigError::Validation(
            "service.base_url must start with http:// or https://".to_string(),
        ));
    }

    if !service.endpoint.starts_with('/') {
        return Err(ConfigError::Validation(
            "service.endpoint must be an absolute path such as `/api/customer`".to_string(),
        ));
    }

    if service.request_timeout_secs == 0 || service.request_timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "service.request_timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_oracle(oracle: &OracleConfig) -> Result<(), ConfigError> {
    if oracle.consistency == ConsistencyMode::Strong {
        return Ok(());
    }

    if oracle.convergence_timeout_ms == 0 || oracle.convergence_timeout_ms > 60_000 {
        return Err(ConfigError::Validation(
            "oracle.convergence_timeout_ms must be in range 1..=60000".to_string(),
        ));
    }

    if oracle.poll_interval_ms == 0 || oracle.poll_interval_ms > oracle.convergence_timeout_ms {
        return Err(ConfigError::Validation(
            "oracle.poll_interval_ms must be greater than zero and at most the convergence timeout"
                .to_string(),
        ));
    }

    Ok(())
}

fn validate_runner(runner: &RunnerConfig) -> Result<(), ConfigError> {
    if runner.workers == 0 || runner.workers > 64 {
        return Err(ConfigError::Validation("runner.workers must be in range 1..=64".to_string()));
    }

    if let Some(tag) = &runner.run_tag {
        let usable = !tag.is_empty()
            && tag.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_');
        if !usable {
            return Err(ConfigError::Validation(
                "runner.run_tag may only contain ascii letters, digits, `-` and `_`".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.parse::<usize>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigPatch {
    service: Option<ServicePatch>,
    database: Option<DatabasePatch>,
    oracle: Option<OraclePatch>,
    runner: Option<RunnerPatch>,
    verification: Option<VerificationPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct ServicePatch {
    base_url: Option<String>,
    endpoint: Option<String>,
    request_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct OraclePatch {
    consistency: Option<ConsistencyMode>,
    convergence_timeout_ms: Option<u64>,
    poll_interval_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct RunnerPatch {
    workers: Option<usize>,
    run_tag: Option<String>,
    teardown: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct VerificationPatch {
    require_json_errors: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
