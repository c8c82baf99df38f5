mod cli;
mod log;

use clap::Parser;
use cli::Cli;
use miette::{IntoDiagnostic, Result, WrapErr};
use shposh_core::{Session, Shutdown, Sink, TerminalInput, is_interactive};
use std::process::ExitCode;
use tracing::{debug, info};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    log::init_tracing(cli.level(), cli.log_file.as_deref())?;

    if !is_interactive() {
        println!("shposh requires a supported terminal to run correctly.");
        return Ok(ExitCode::FAILURE);
    }

    let shutdown = Shutdown::new();
    shutdown
        .install_signals()
        .into_diagnostic()
        .wrap_err("failed to install signal handlers")?;
    let mut input = TerminalInput::spawn()
        .into_diagnostic()
        .wrap_err("failed to start reading from the terminal")?;

    let settings = cli.settings();
    debug!(?settings, "starting session");
    let report = Session::new(settings, Sink::stdout(), shutdown.clone())
        .run(&mut input)
        .await;

    if let Some(signal) = shutdown.last_signal() {
        info!("stopped by {signal}");
    }
    debug!(?report, "session finished");

    Ok(if report.exit.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
