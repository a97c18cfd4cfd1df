mod support;

use std::env;
use std::io::Write;
use std::sync::{Arc, Mutex, OnceLock};

use cartchat_api::HttpCartApi;
use cartchat_cli::commands::{ask, config, doctor};
use cartchat_cli::GlobalArgs;
use cartchat_core::config::{AppConfig, LoadOptions};
use serde_json::Value;
use support::{spawn_stub_api, unreachable_api, StubApi};

#[test]
fn config_reports_env_sources() {
    with_env(&[("CARTCHAT_API_BASE_URL", "http://cart-proxy:3000")], || {
        let result = config::run(LoadOptions::default());
        assert_eq!(result.exit_code, 0, "expected config to load");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "config");
        assert_eq!(payload["status"], "ok");
        assert_eq!(payload["config"]["api"]["base_url"], "http://cart-proxy:3000");
        assert_eq!(payload["sources"]["api.base_url"], "env (CARTCHAT_API_BASE_URL)");
        assert_eq!(payload["sources"]["monitor.max_retries"], "default");
    });
}

#[test]
fn config_reports_cli_and_file_sources() {
    with_env(&[], || {
        let mut file = tempfile::NamedTempFile::new().expect("temp config");
        writeln!(file, "[session]\nfallback = \"cart_page\"\n\n[monitor]\nmax_retries = 5")
            .expect("write config");

        let args = GlobalArgs {
            config: Some(file.path().to_path_buf()),
            api_url: Some("https://carts.example".to_string()),
            ..GlobalArgs::default()
        };
        let result = config::run(args.load_options());
        assert_eq!(result.exit_code, 0, "expected config to load");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["config"]["session"]["fallback"], "cart_page");
        assert_eq!(payload["config"]["monitor"]["max_retries"], 5);
        assert_eq!(payload["sources"]["api.base_url"], "cli (--api-url)");
        let fallback_source = payload["sources"]["session.fallback"].as_str().unwrap_or_default();
        assert!(fallback_source.starts_with("file ("), "unexpected source {fallback_source}");
    });
}

#[test]
fn config_returns_validation_failure_for_bad_env() {
    with_env(&[("CARTCHAT_MONITOR_MAX_RETRIES", "many")], || {
        let result = config::run(LoadOptions::default());
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "config");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn missing_explicit_config_file_is_an_error() {
    with_env(&[], || {
        let args = GlobalArgs {
            config: Some("/nonexistent/cartchat.toml".into()),
            ..GlobalArgs::default()
        };
        let result = config::run(args.load_options());
        assert_eq!(result.exit_code, 2);
    });
}

#[test]
fn doctor_fails_when_api_is_unreachable() {
    let config = config_for(&unreachable_api());
    let api = Arc::new(HttpCartApi::from_config(&config.api));

    let result = doctor::run_with_api(&config, api, true);
    assert_eq!(result.exit_code, 1);

    let payload = parse_payload(&result.output);
    assert_eq!(payload["overall_status"], "fail");
    assert_eq!(check(&payload, "api_health")["status"], "fail");
    assert_eq!(check(&payload, "cookie_status")["status"], "skipped");
}

#[test]
fn doctor_passes_against_healthy_api() {
    let config = config_for(&spawn_stub_api(StubApi::default()));
    let api = Arc::new(HttpCartApi::from_config(&config.api));

    let result = doctor::run_with_api(&config, api, true);
    assert_eq!(result.exit_code, 0);

    let payload = parse_payload(&result.output);
    assert_eq!(payload["overall_status"], "pass");
    assert_eq!(check(&payload, "cookie_status")["status"], "pass");
}

#[test]
fn doctor_warns_about_missing_cookies_in_human_output() {
    let config = config_for(&spawn_stub_api(StubApi { cookies: false, add_error: None }));
    let api = Arc::new(HttpCartApi::from_config(&config.api));

    let result = doctor::run_with_api(&config, api, false);
    assert_eq!(result.exit_code, 0);
    assert!(result.output.starts_with("doctor: ready with warnings"));
    assert!(result.output.contains("- [warn] cookie_status: missing cookies for `motonet`"));
}

#[test]
fn ask_adds_to_cart_when_online() {
    let config = config_for(&spawn_stub_api(StubApi::default()));
    let api = Arc::new(HttpCartApi::from_config(&config.api));

    let result = ask::run_with_api(&config, api, "add 2 winter tires to my cart");
    assert_eq!(result.exit_code, 0);

    let payload = parse_payload(&result.output);
    assert_eq!(payload["command"], "ask");
    assert_eq!(payload["connection"]["status"], "connected");
    assert_eq!(payload["turn"]["intent"]["intent"], "add_item");
    assert_eq!(payload["turn"]["intent"]["quantity"], 2);
    assert_eq!(payload["cart"]["lines"][0]["quantity"], 2);
    assert_eq!(payload["cart"]["lines"][0]["product_name"], "winter tires");
    assert_eq!(payload["turn"]["entries"].as_array().map(Vec::len), Some(3));
}

#[test]
fn ask_reports_rejection_in_diagnostics() {
    let stub = StubApi { cookies: true, add_error: Some("Product not found") };
    let config = config_for(&spawn_stub_api(stub));
    let api = Arc::new(HttpCartApi::from_config(&config.api));

    let result = ask::run_with_api(&config, api, "add motor oil product id 59-5064");
    assert_eq!(result.exit_code, 0);

    let payload = parse_payload(&result.output);
    assert_eq!(payload["cart"]["lines"].as_array().map(Vec::len), Some(0));
    assert_eq!(payload["turn"]["add_item"]["outcome"]["outcome"], "failure");
    assert_eq!(payload["turn"]["add_item"]["outcome"]["reason"], "not_found");
    assert_eq!(payload["diagnostics"][0]["title"], "Add to Cart Error");
}

#[test]
fn ask_is_gated_while_offline() {
    let config = config_for(&unreachable_api());
    let api = Arc::new(HttpCartApi::from_config(&config.api));

    let result = ask::run_with_api(&config, api, "add 2 winter tires to my cart");
    assert_eq!(result.exit_code, 0);

    let payload = parse_payload(&result.output);
    assert_eq!(payload["connection"]["status"], "disconnected");
    let entries = payload["turn"]["entries"].as_array().cloned().unwrap_or_default();
    assert_eq!(entries.len(), 2);
    let reply = entries[1]["text"].as_str().unwrap_or_default();
    assert!(reply.contains("not connected to the server"), "unexpected reply {reply}");
}

#[test]
fn ask_rejects_blank_utterances() {
    let config = config_for(&unreachable_api());
    let api = Arc::new(HttpCartApi::from_config(&config.api));

    let result = ask::run_with_api(&config, api, "   ");
    assert_eq!(result.exit_code, 2);

    let payload = parse_payload(&result.output);
    assert_eq!(payload["error_class"], "input");
}

fn config_for(base_url: &str) -> AppConfig {
    let mut config = AppConfig::default();
    config.api.base_url = base_url.to_string();
    config
}

fn check<'a>(payload: &'a Value, name: &str) -> &'a Value {
    payload["checks"]
        .as_array()
        .and_then(|checks| checks.iter().find(|check| check["name"] == name))
        .unwrap_or(&Value::Null)
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "CARTCHAT_API_BASE_URL",
        "CARTCHAT_MONITOR_PROBE_INTERVAL_SECS",
        "CARTCHAT_MONITOR_MAX_RETRIES",
        "CARTCHAT_MONITOR_RETRY_DELAY_SECS",
        "CARTCHAT_SESSION_DEFAULT_PLATFORM",
        "CARTCHAT_SESSION_FALLBACK",
        "CARTCHAT_SESSION_GREETING",
        "CARTCHAT_LOGGING_LEVEL",
        "CARTCHAT_LOGGING_FORMAT",
        "CARTCHAT_LOG_LEVEL",
        "CARTCHAT_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
