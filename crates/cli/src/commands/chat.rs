use std::io::Write;
use std::sync::Arc;

use anyhow::Result;
use cartchat_agent::{AddToCartOrchestrator, ChatSession, SyntheticIdResolver, TurnReport};
use cartchat_api::{ConnectivityMonitor, HttpCartApi, RetryPolicy};
use cartchat_core::api::CartApi;
use cartchat_core::config::{AppConfig, LoadOptions};
use cartchat_core::connectivity::LinkTransition;
use cartchat_core::diagnostics::{DiagnosticReport, DiagnosticSink, InMemoryDiagnosticSink};
use cartchat_core::domain::conversation::{ConversationEntry, Speaker};
use cartchat_core::domain::product::{Platform, ProductId};
use cartchat_core::errors::ChatError;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use crate::commands::{current_thread_runtime, CommandResult};
use crate::logging::init_logging;

const BOT_PREFIX: &str = "assistant>";
const COMMAND_HELP: &str = "Commands: /cart, /cart-url, /remove <product-id>, /platform <name>, \
                            /status, /details, /dismiss, /help, /quit";

pub fn run(options: LoadOptions) -> CommandResult {
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure("chat", "config_validation", error.to_string(), 2);
        }
    };
    init_logging(&config.logging);

    let runtime = match current_thread_runtime() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure("chat", "runtime", error.to_string(), 1);
        }
    };

    let api: Arc<dyn CartApi> = Arc::new(HttpCartApi::from_config(&config.api));
    let mut app = ChatApp::new(&config, api);
    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = std::io::stdout();

    match runtime.block_on(app.run(stdin, &mut stdout)) {
        Ok(()) => CommandResult::silent(0),
        Err(error) => CommandResult::failure("chat", "io", error.to_string(), 1),
    }
}

/// What the REPL should do after a line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// A chat session wired to its connectivity monitor and diagnostic surface.
pub struct ChatApp {
    session: ChatSession,
    monitor: ConnectivityMonitor,
    diagnostics: InMemoryDiagnosticSink,
}

impl ChatApp {
    pub fn new(config: &AppConfig, api: Arc<dyn CartApi>) -> Self {
        let diagnostics = InMemoryDiagnosticSink::default();
        let orchestrator = AddToCartOrchestrator::new(
            api.clone(),
            Arc::new(SyntheticIdResolver::new()),
            Arc::new(diagnostics.clone()),
        )
        .with_fallback(config.session.fallback);

        let mut session = ChatSession::new(orchestrator);
        if config.session.greeting {
            session = session.with_welcome();
        }
        let monitor = ConnectivityMonitor::new(
            api,
            RetryPolicy::from(&config.monitor),
            config.session.default_platform.clone(),
        );

        Self { session, monitor, diagnostics }
    }

    pub fn session(&self) -> &ChatSession {
        &self.session
    }

    pub fn monitor(&self) -> &ConnectivityMonitor {
        &self.monitor
    }

    pub fn diagnostics(&self) -> &InMemoryDiagnosticSink {
        &self.diagnostics
    }

    /// Runs the REPL until end of input, `/quit` or Ctrl-C.
    ///
    /// Input lines, the probe interval and the pending retry deadline are serviced from one
    /// task, so every mutation of the session and the monitor happens here.
    pub async fn run<R, W>(&mut self, input: R, out: &mut W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        let mut lines = input.lines();
        let mut probe_interval = self.monitor.interval();

        for entry in self.session.log().entries() {
            write_entry(out, entry)?;
        }
        let transition = self.monitor.probe().await;
        self.report_transition(out, transition)?;
        writeln!(out, "{COMMAND_HELP}")?;

        loop {
            let retry_due = self.monitor.wait_for_retry();
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line? else {
                        break;
                    };
                    if self.handle_line(&line, out).await? == Flow::Quit {
                        break;
                    }
                }
                _ = probe_interval.tick() => {
                    let transition = self.monitor.tick().await;
                    self.report_transition(out, transition)?;
                }
                _ = retry_due => {
                    let transition = self.monitor.on_retry_due().await;
                    self.report_transition(out, transition)?;
                }
                _ = tokio::signal::ctrl_c() => {
                    info!(event_name = "chat.session.interrupted", "interrupt received");
                    break;
                }
            }
            out.flush()?;
        }

        self.monitor.shutdown();
        info!(
            event_name = "chat.session.ended",
            entries = self.session.log().len(),
            cart_lines = self.session.cart().len(),
            "chat session ended"
        );
        Ok(())
    }

    /// Probes once, then answers a single utterance.
    pub async fn ask(&mut self, utterance: &str) -> Result<TurnReport, ChatError> {
        self.monitor.probe().await;
        self.session.handle_utterance(utterance, self.monitor.state()).await
    }

    /// Handles one input line: a slash command or an utterance.
    pub async fn handle_line<W: Write>(&mut self, line: &str, out: &mut W) -> Result<Flow> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(Flow::Continue);
        }
        if let Some(command) = line.strip_prefix('/') {
            return self.handle_command(command, out).await;
        }

        let reports_before = self.diagnostics.reports().len();
        match self.session.handle_utterance(line, self.monitor.state()).await {
            Ok(turn) => {
                for entry in turn.entries.iter().filter(|entry| entry.speaker == Speaker::Bot) {
                    write_entry(out, entry)?;
                }
            }
            Err(error) => writeln!(out, "{BOT_PREFIX} {}", error.user_message())?,
        }
        self.announce_new_diagnostic(out, reports_before)?;
        Ok(Flow::Continue)
    }

    async fn handle_command<W: Write>(&mut self, command: &str, out: &mut W) -> Result<Flow> {
        let (name, argument) = match command.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (command, ""),
        };

        match name {
            "quit" | "exit" => return Ok(Flow::Quit),
            "help" => writeln!(out, "{COMMAND_HELP}")?,
            "cart" => self.print_cart(out)?,
            "cart-url" => self.print_cart_url(out).await?,
            "remove" if !argument.is_empty() => {
                match self.session.remove_line(&ProductId(argument.to_string())) {
                    Some(line) => writeln!(out, "Removed {} from the cart.", line.product_name)?,
                    None => writeln!(out, "No cart line with product id {argument}.")?,
                }
            }
            "platform" if !argument.is_empty() => self.switch_platform(argument, out).await?,
            "status" => {
                let state = self.monitor.state();
                writeln!(
                    out,
                    "[{}] {} (platform: {}, retries used: {}/{})",
                    status_label(state.connected()),
                    state.status_text,
                    state.active_platform,
                    state.retry_count,
                    self.monitor.policy().max_retries
                )?;
            }
            "details" => match self.diagnostics.current() {
                Some(report) => write_report(out, &report)?,
                None => writeln!(out, "No error details to show.")?,
            },
            "dismiss" => {
                self.diagnostics.dismiss();
                writeln!(out, "Error details dismissed.")?;
            }
            _ => writeln!(out, "Unknown command `/{command}`. {COMMAND_HELP}")?,
        }
        Ok(Flow::Continue)
    }

    async fn switch_platform<W: Write>(&mut self, name: &str, out: &mut W) -> Result<()> {
        let requested = Platform::parse(name);
        match self.monitor.request_platform_switch(requested).await {
            Ok(true) => {
                let state = self.monitor.state();
                let entry = self.session.announce_platform_switch(&state.active_platform);
                write_entry(out, entry)?;
                writeln!(out, "[{}] {}", status_label(state.connected()), state.status_text)?;
            }
            Ok(false) => {
                writeln!(out, "Already using the {} store.", self.monitor.state().active_platform)?;
            }
            Err(error) => {
                self.publish_error(&error);
                writeln!(out, "{BOT_PREFIX} {}", error.user_message())?;
            }
        }
        Ok(())
    }

    fn print_cart<W: Write>(&self, out: &mut W) -> Result<()> {
        let cart = self.session.cart();
        if cart.is_empty() {
            writeln!(out, "Your cart is empty.")?;
            return Ok(());
        }
        writeln!(out, "Cart ({} items):", cart.total_quantity())?;
        for line in cart.lines() {
            writeln!(out, "- {} x {} ({})", line.quantity, line.product_name, line.product_id)?;
        }
        Ok(())
    }

    async fn print_cart_url<W: Write>(&self, out: &mut W) -> Result<()> {
        let platform = self.monitor.state().active_platform.clone();
        match self.session.cart_page_url(&platform).await {
            Ok(Some(url)) => writeln!(out, "Open your {platform} cart: {url}")?,
            Ok(None) => writeln!(out, "Your cart is empty; add something first.")?,
            Err(error) => {
                self.publish_error(&error);
                writeln!(out, "{BOT_PREFIX} {}", error.user_message())?;
            }
        }
        Ok(())
    }

    fn publish_error(&self, error: &ChatError) {
        if let Some(title) = error.diagnostic_title() {
            self.diagnostics.emit(DiagnosticReport::new(title, error.to_string()));
        }
    }

    fn announce_new_diagnostic<W: Write>(&self, out: &mut W, reports_before: usize) -> Result<()> {
        if self.diagnostics.reports().len() > reports_before {
            if let Some(report) = self.diagnostics.current() {
                warn!(
                    event_name = "chat.diagnostic.published",
                    report_id = %report.report_id,
                    title = %report.title,
                    "diagnostic report available"
                );
                writeln!(out, "! {}: {} (type /details)", report.title, report.message)?;
            }
        }
        Ok(())
    }

    fn report_transition<W: Write>(&self, out: &mut W, transition: LinkTransition) -> Result<()> {
        if transition.changed() {
            let state = self.monitor.state();
            writeln!(out, "[{}] {}", status_label(state.connected()), state.status_text)?;
        }
        Ok(())
    }
}

fn status_label(connected: bool) -> &'static str {
    if connected {
        "online"
    } else {
        "offline"
    }
}

fn write_entry<W: Write>(out: &mut W, entry: &ConversationEntry) -> Result<()> {
    match entry.speaker {
        Speaker::Bot => writeln!(out, "{BOT_PREFIX} {}", entry.text)?,
        Speaker::User => writeln!(out, "you> {}", entry.text)?,
    }
    Ok(())
}

fn write_report<W: Write>(out: &mut W, report: &DiagnosticReport) -> Result<()> {
    writeln!(out, "{} ({})", report.title, report.occurred_at.to_rfc3339())?;
    writeln!(out, "{}", report.message)?;
    if let Some(details) = report.pretty_details() {
        writeln!(out, "{details}")?;
    }
    Ok(())
}
