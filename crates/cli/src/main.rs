use std::process::ExitCode;

fn main() -> ExitCode {
    cartchat_cli::run()
}
