use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::product::Platform;

#[derive(Clone, Debug, Serialize)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub monitor: MonitorConfig,
    pub session: SessionConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, Serialize)]
pub struct ApiConfig {
    pub base_url: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct MonitorConfig {
    pub probe_interval_secs: u64,
    pub max_retries: u32,
    pub retry_delay_secs: u64,
}

#[derive(Clone, Debug, Serialize)]
pub struct SessionConfig {
    pub default_platform: Platform,
    pub fallback: FallbackMode,
    pub greeting: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// What to offer the user after an add-to-cart attempt fails.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackMode {
    Disabled,
    CartPage,
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
    pub api_base_url: Option<String>,
    pub default_platform: Option<Platform>,
    pub fallback: Option<FallbackMode>,
    pub log_level: Option<String>,
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

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig { base_url: "http://localhost:3000".to_string() },
            monitor: MonitorConfig { probe_interval_secs: 30, max_retries: 3, retry_delay_secs: 2 },
            session: SessionConfig {
                default_platform: Platform::Motonet,
                fallback: FallbackMode::Disabled,
                greeting: true,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for FallbackMode {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "disabled" | "off" | "none" => Ok(Self::Disabled),
            "cart_page" | "cart-page" => Ok(Self::CartPage),
            other => Err(ConfigError::Validation(format!(
                "unsupported fallback mode `{other}` (expected disabled|cart_page)"
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

impl MonitorConfig {
    pub fn probe_interval(&self) -> Duration {
        Duration::from_secs(self.probe_interval_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}

impl ApiConfig {
    /// Base URL without a trailing slash, ready for [`join_url`].
    pub fn normalized_base_url(&self) -> &str {
        self.base_url.trim().trim_end_matches('/')
    }
}

/// Joins a base URL and a path with exactly one slash between them.
pub fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("cartchat.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(api) = patch.api {
            if let Some(base_url) = api.base_url {
                self.api.base_url = base_url;
            }
        }

        if let Some(monitor) = patch.monitor {
            if let Some(probe_interval_secs) = monitor.probe_interval_secs {
                self.monitor.probe_interval_secs = probe_interval_secs;
            }
            if let Some(max_retries) = monitor.max_retries {
                self.monitor.max_retries = max_retries;
            }
            if let Some(retry_delay_secs) = monitor.retry_delay_secs {
                self.monitor.retry_delay_secs = retry_delay_secs;
            }
        }

        if let Some(session) = patch.session {
            if let Some(default_platform) = session.default_platform {
                self.session.default_platform = Platform::parse(&default_platform);
            }
            if let Some(fallback) = session.fallback {
                self.session.fallback = fallback;
            }
            if let Some(greeting) = session.greeting {
                self.session.greeting = greeting;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("CARTCHAT_API_BASE_URL") {
            self.api.base_url = value;
        }

        if let Some(value) = read_env("CARTCHAT_MONITOR_PROBE_INTERVAL_SECS") {
            self.monitor.probe_interval_secs =
                parse_u64("CARTCHAT_MONITOR_PROBE_INTERVAL_SECS", &value)?;
        }
        if let Some(value) = read_env("CARTCHAT_MONITOR_MAX_RETRIES") {
            self.monitor.max_retries = parse_u32("CARTCHAT_MONITOR_MAX_RETRIES", &value)?;
        }
        if let Some(value) = read_env("CARTCHAT_MONITOR_RETRY_DELAY_SECS") {
            self.monitor.retry_delay_secs = parse_u64("CARTCHAT_MONITOR_RETRY_DELAY_SECS", &value)?;
        }

        if let Some(value) = read_env("CARTCHAT_SESSION_DEFAULT_PLATFORM") {
            self.session.default_platform = Platform::parse(&value);
        }
        if let Some(value) = read_env("CARTCHAT_SESSION_FALLBACK") {
            self.session.fallback = value.parse()?;
        }
        if let Some(value) = read_env("CARTCHAT_SESSION_GREETING") {
            self.session.greeting = parse_bool("CARTCHAT_SESSION_GREETING", &value)?;
        }

        let log_level =
            read_env("CARTCHAT_LOGGING_LEVEL").or_else(|| read_env("CARTCHAT_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("CARTCHAT_LOGGING_FORMAT").or_else(|| read_env("CARTCHAT_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(api_base_url) = overrides.api_base_url {
            self.api.base_url = api_base_url;
        }
        if let Some(default_platform) = overrides.default_platform {
            self.session.default_platform = default_platform;
        }
        if let Some(fallback) = overrides.fallback {
            self.session.fallback = fallback;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_api(&self.api)?;
        validate_monitor(&self.monitor)?;
        validate_session(&self.session)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("cartchat.toml"), PathBuf::from("config/cartchat.toml")]
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

fn validate_api(api: &ApiConfig) -> Result<(), ConfigError> {
    let base_url = api.base_url.trim();
    if base_url.is_empty() {
        return Err(ConfigError::Validation("api.base_url is required".to_string()));
    }
    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        return Err(ConfigError::Validation(
            "api.base_url must start with http:// or https://".to_string(),
        ));
    }
    Ok(())
}

fn validate_monitor(monitor: &MonitorConfig) -> Result<(), ConfigError> {
    if monitor.probe_interval_secs == 0 {
        return Err(ConfigError::Validation(
            "monitor.probe_interval_secs must be greater than zero".to_string(),
        ));
    }
    if monitor.retry_delay_secs >= monitor.probe_interval_secs {
        return Err(ConfigError::Validation(
            "monitor.retry_delay_secs must be shorter than monitor.probe_interval_secs"
                .to_string(),
        ));
    }
    Ok(())
}

fn validate_session(session: &SessionConfig) -> Result<(), ConfigError> {
    let name = session.default_platform.as_str();
    let well_formed =
        !name.is_empty() && name.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '-');
    if !well_formed {
        return Err(ConfigError::Validation(
            "session.default_platform must be a non-empty alphanumeric platform name".to_string(),
        ));
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

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    api: Option<ApiPatch>,
    monitor: Option<MonitorPatch>,
    session: Option<SessionPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiPatch {
    base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct MonitorPatch {
    probe_interval_secs: Option<u64>,
    max_retries: Option<u32>,
    retry_delay_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct SessionPatch {
    default_platform: Option<String>,
    fallback: Option<FallbackMode>,
    greeting: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
