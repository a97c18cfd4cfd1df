pub mod commands;
pub mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use cartchat_core::config::{ConfigOverrides, FallbackMode, LoadOptions};
use cartchat_core::domain::product::Platform;
use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "cartchat",
    about = "Chat-driven shopping cart assistant",
    long_about = "Talk to a retailer cart API in plain language: add products, clear the cart, \
                  switch stores, and inspect connectivity.",
    after_help = "Examples:\n  cartchat chat --platform rusta\n  cartchat ask add 2 winter tires \
                  to my cart\n  cartchat doctor --json"
)]
pub struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Clone, Debug, Default, Args)]
pub struct GlobalArgs {
    #[arg(long, global = true, help = "Path to a cartchat.toml file (must exist when given)")]
    pub config: Option<PathBuf>,
    #[arg(long, global = true, help = "Override the cart API base URL")]
    pub api_url: Option<String>,
    #[arg(long, global = true, help = "Store platform to start on (motonet, rusta, ...)")]
    pub platform: Option<String>,
    #[arg(long, global = true, help = "What to offer after a failed add: disabled | cart_page")]
    pub fallback: Option<FallbackMode>,
    #[arg(long, global = true, help = "Log level override (error, warn, info, debug, trace)")]
    pub log_level: Option<String>,
}

impl GlobalArgs {
    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            config_path: self.config.clone(),
            require_file: self.config.is_some(),
            overrides: ConfigOverrides {
                api_base_url: self.api_url.clone(),
                default_platform: self.platform.as_deref().map(Platform::parse),
                fallback: self.fallback,
                log_level: self.log_level.clone(),
            },
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Start an interactive chat session (default when no command is given)")]
    Chat,
    #[command(about = "Probe the API once, answer a single utterance and print the result as JSON")]
    Ask {
        #[arg(required = true, num_args = 1.., help = "The utterance, e.g. `add 2 winter tires`")]
        words: Vec<String>,
    },
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Validate config and check cart API reachability")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let options = cli.global.load_options();

    let result = match cli.command.unwrap_or(Command::Chat) {
        Command::Chat => commands::chat::run(options),
        Command::Ask { words } => commands::ask::run(options, &words.join(" ")),
        Command::Config => commands::config::run(options),
        Command::Doctor { json } => commands::doctor::run(options, json),
    };

    if !result.output.is_empty() {
        println!("{}", result.output);
    }
    ExitCode::from(result.exit_code)
}
