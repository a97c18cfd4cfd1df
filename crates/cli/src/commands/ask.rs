use std::sync::Arc;

use cartchat_agent::TurnReport;
use cartchat_api::HttpCartApi;
use cartchat_core::api::CartApi;
use cartchat_core::config::{AppConfig, LoadOptions};
use cartchat_core::connectivity::ConnectionState;
use cartchat_core::diagnostics::DiagnosticReport;
use cartchat_core::domain::cart::Cart;
use cartchat_core::errors::ChatError;
use serde::Serialize;

use crate::commands::chat::ChatApp;
use crate::commands::{current_thread_runtime, CommandResult};
use crate::logging::init_logging;

#[derive(Debug, Serialize)]
struct AskReport {
    command: &'static str,
    status: &'static str,
    connection: ConnectionState,
    turn: TurnReport,
    cart: Cart,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    diagnostics: Vec<DiagnosticReport>,
}

pub fn run(options: LoadOptions, utterance: &str) -> CommandResult {
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure("ask", "config_validation", error.to_string(), 2);
        }
    };
    init_logging(&config.logging);

    let api: Arc<dyn CartApi> = Arc::new(HttpCartApi::from_config(&config.api));
    run_with_api(&config, api, utterance)
}

/// One probe, one turn. The exit code is 0 whenever the turn was answered, even when the
/// answer is an apology.
pub fn run_with_api(config: &AppConfig, api: Arc<dyn CartApi>, utterance: &str) -> CommandResult {
    let runtime = match current_thread_runtime() {
        Ok(runtime) => runtime,
        Err(error) => return CommandResult::failure("ask", "runtime", error.to_string(), 1),
    };

    let mut config = config.clone();
    config.session.greeting = false;
    let mut app = ChatApp::new(&config, api);

    let turn = runtime.block_on(app.ask(utterance));
    match turn {
        Ok(turn) => {
            let report = AskReport {
                command: "ask",
                status: "ok",
                connection: app.monitor().state().clone(),
                turn,
                cart: app.session().cart().clone(),
                diagnostics: app.diagnostics().reports(),
            };
            CommandResult::report(0, &report)
        }
        Err(error @ ChatError::EmptyUtterance) => {
            CommandResult::failure("ask", "input", error.user_message(), 2)
        }
        Err(error) => CommandResult::failure("ask", "chat", error.to_string(), 1),
    }
}
