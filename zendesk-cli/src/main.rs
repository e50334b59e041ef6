// ABOUTME: Main entry point for the zd Zendesk CLI application
// ABOUTME: Parses arguments, sets up logging and cancellation, and reports failures

use clap::Parser;
use log::debug;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use zendesk_cli::cli::Cli;
use zendesk_cli::cli_output::CliOutput;
use zendesk_cli::commands::App;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let ui = CliOutput::from_flags(cli.no_color);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("Interrupt received, cancelling");
            on_interrupt.cancel();
        }
    });

    let result = match App::from_flags(cli.config, cli.instance, cli.no_color, cli.retry, cancel) {
        Ok(mut app) => app.run(cli.command).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            ui.report_error(&e);
            ExitCode::FAILURE
        }
    }
}
