//! luk3 CLI

use std::process::ExitCode;

use clap::Parser;
use luk3_core::Reporter;
use tracing_subscriber::EnvFilter;

use luk3_cli::cmd::{self, EXIT_SETUP_FAILURE};
use luk3_cli::ui::{ConsoleReporter, wait_for_enter};
use luk3_cli::{Cli, Commands};

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let (result, pause) = match cli.command {
        Some(Commands::Bootstrap(args)) => (cmd::bootstrap::bootstrap(&args).await, args.pause),
        Some(Commands::Clean { path }) => (cmd::clean::clean(&path), false),
        None => (
            cmd::bootstrap::bootstrap(&cli.bootstrap).await,
            cli.bootstrap.pause,
        ),
    };

    let code = result.unwrap_or_else(|e| {
        ConsoleReporter::new().error(&format!("{e:#}"));
        ExitCode::from(EXIT_SETUP_FAILURE)
    });

    if pause {
        wait_for_enter();
    }
    code
}
