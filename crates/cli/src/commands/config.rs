use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use cartchat_core::config::{AppConfig, ConfigOverrides, LoadOptions};
use serde::Serialize;
use toml::Value;

use crate::commands::CommandResult;

/// Config key, its environment variables in lookup order, and the CLI flag overriding it.
const FIELDS: &[(&str, &[&str], Option<&str>)] = &[
    ("api.base_url", &["CARTCHAT_API_BASE_URL"], Some("--api-url")),
    ("monitor.probe_interval_secs", &["CARTCHAT_MONITOR_PROBE_INTERVAL_SECS"], None),
    ("monitor.max_retries", &["CARTCHAT_MONITOR_MAX_RETRIES"], None),
    ("monitor.retry_delay_secs", &["CARTCHAT_MONITOR_RETRY_DELAY_SECS"], None),
    ("session.default_platform", &["CARTCHAT_SESSION_DEFAULT_PLATFORM"], Some("--platform")),
    ("session.fallback", &["CARTCHAT_SESSION_FALLBACK"], Some("--fallback")),
    ("session.greeting", &["CARTCHAT_SESSION_GREETING"], None),
    ("logging.level", &["CARTCHAT_LOGGING_LEVEL", "CARTCHAT_LOG_LEVEL"], Some("--log-level")),
    ("logging.format", &["CARTCHAT_LOGGING_FORMAT", "CARTCHAT_LOG_FORMAT"], None),
];

#[derive(Debug, Serialize)]
struct ConfigReport {
    command: &'static str,
    status: &'static str,
    precedence: &'static str,
    config_file: Option<String>,
    config: AppConfig,
    sources: BTreeMap<&'static str, String>,
}

pub fn run(options: LoadOptions) -> CommandResult {
    let config_file_path = detect_config_path(options.config_path.as_deref());
    let overrides = options.overrides.clone();

    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure("config", "config_validation", error.to_string(), 2);
        }
    };

    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let sources = FIELDS
        .iter()
        .map(|(key, env_keys, flag)| {
            let source = field_source(
                key,
                env_keys,
                flag.filter(|_| overridden(&overrides, key)),
                config_file_doc.as_ref(),
                config_file_path.as_deref(),
            );
            (*key, source)
        })
        .collect();

    CommandResult::report(
        0,
        &ConfigReport {
            command: "config",
            status: "ok",
            precedence: "cli > env > file > default",
            config_file: config_file_path.map(|path| path.display().to_string()),
            config,
            sources,
        },
    )
}

fn overridden(overrides: &ConfigOverrides, key: &str) -> bool {
    match key {
        "api.base_url" => overrides.api_base_url.is_some(),
        "session.default_platform" => overrides.default_platform.is_some(),
        "session.fallback" => overrides.fallback.is_some(),
        "logging.level" => overrides.log_level.is_some(),
        _ => false,
    }
}

fn detect_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.exists().then(|| path.to_path_buf());
    }

    let root = PathBuf::from("cartchat.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/cartchat.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    cli_flag: Option<&str>,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(flag) = cli_flag {
        return format!("cli ({flag})");
    }

    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}
