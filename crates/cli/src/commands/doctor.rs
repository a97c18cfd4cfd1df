use std::sync::Arc;

use cartchat_api::HttpCartApi;
use cartchat_core::api::{CartApi, HealthReport};
use cartchat_core::config::{AppConfig, LoadOptions};
use serde::Serialize;

use crate::commands::{current_thread_runtime, CommandResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Warn,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    command: &'static str,
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(options: LoadOptions, json_output: bool) -> CommandResult {
    let report = match AppConfig::load(options) {
        Ok(config) => {
            let api: Arc<dyn CartApi> = Arc::new(HttpCartApi::from_config(&config.api));
            build_report(&config, api)
        }
        Err(error) => config_failure_report(error.to_string()),
    };
    render(&report, json_output)
}

/// Doctor against an already-built API client.
pub fn run_with_api(config: &AppConfig, api: Arc<dyn CartApi>, json_output: bool) -> CommandResult {
    render(&build_report(config, api), json_output)
}

fn render(report: &DoctorReport, json_output: bool) -> CommandResult {
    let exit_code = if report.overall_status == CheckStatus::Fail { 1 } else { 0 };
    if json_output {
        return CommandResult::report(exit_code, report);
    }
    CommandResult { exit_code, output: render_human(report) }
}

fn build_report(config: &AppConfig, api: Arc<dyn CartApi>) -> DoctorReport {
    let mut checks = vec![DoctorCheck {
        name: "config_validation",
        status: CheckStatus::Pass,
        details: "configuration loaded and validated".to_string(),
    }];

    match probe_health(api) {
        Ok(report) => {
            checks.push(DoctorCheck {
                name: "api_health",
                status: CheckStatus::Pass,
                details: format!("`{}` is responding", config.api.normalized_base_url()),
            });
            checks.push(check_cookies(config, &report));
        }
        Err(details) => {
            checks.push(DoctorCheck { name: "api_health", status: CheckStatus::Fail, details });
            checks.push(skipped("cookie_status", "api health check failed"));
        }
    }

    finalize_report(checks)
}

fn config_failure_report(error: String) -> DoctorReport {
    finalize_report(vec![
        DoctorCheck { name: "config_validation", status: CheckStatus::Fail, details: error },
        skipped("api_health", "configuration did not load"),
        skipped("cookie_status", "configuration did not load"),
    ])
}

fn finalize_report(checks: Vec<DoctorCheck>) -> DoctorReport {
    let any_fail = checks.iter().any(|check| check.status == CheckStatus::Fail);
    let any_warn = checks.iter().any(|check| check.status == CheckStatus::Warn);
    let (overall_status, summary) = if any_fail {
        (CheckStatus::Fail, "doctor: one or more readiness checks failed")
    } else if any_warn {
        (CheckStatus::Warn, "doctor: ready with warnings")
    } else {
        (CheckStatus::Pass, "doctor: all readiness checks passed")
    };

    DoctorReport { command: "doctor", overall_status, summary: summary.to_string(), checks }
}

fn probe_health(api: Arc<dyn CartApi>) -> Result<HealthReport, String> {
    let runtime = current_thread_runtime()
        .map_err(|error| format!("failed to initialize async runtime: {error}"))?;
    runtime.block_on(api.health()).map_err(|error| error.to_string())
}

fn check_cookies(config: &AppConfig, report: &HealthReport) -> DoctorCheck {
    let platform =
        report.current_platform.clone().unwrap_or_else(|| config.session.default_platform.clone());
    if report.has_cookies_for(&platform) {
        DoctorCheck {
            name: "cookie_status",
            status: CheckStatus::Pass,
            details: format!("cookies present for `{platform}`"),
        }
    } else {
        DoctorCheck {
            name: "cookie_status",
            status: CheckStatus::Warn,
            details: format!("missing cookies for `{platform}`; add-to-cart will likely fail"),
        }
    }
}

fn skipped(name: &'static str, reason: &str) -> DoctorCheck {
    DoctorCheck { name, status: CheckStatus::Skipped, details: format!("skipped because {reason}") }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Warn => "warn",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}
