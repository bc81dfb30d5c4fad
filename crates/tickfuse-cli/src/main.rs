mod cli;
mod commands;
mod error;
mod logging;
mod output;

use clap::Parser;
use std::process::ExitCode;
use tickfuse_core::EnvelopeStatus;

use crate::cli::{Cli, Command};
use crate::error::CliError;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_logging(cli.log_format);

    match run(&cli).await {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::from(error.exit_code())
        }
    }
}

async fn run(cli: &Cli) -> Result<ExitCode, CliError> {
    let config = commands::load_config(cli.config.as_deref())?;

    match &cli.command {
        Command::Aggregate(args) => {
            let envelope = commands::aggregate(args, config).await?;
            output::render_envelope(&envelope, cli.format, cli.pretty)?;
            Ok(ExitCode::from(status_exit_code(envelope.status())))
        }
        Command::Breakers => {
            let report = commands::breakers(config);
            output::render_breakers(&report, cli.format, cli.pretty)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

const fn status_exit_code(status: EnvelopeStatus) -> u8 {
    match status {
        EnvelopeStatus::Success => 0,
        EnvelopeStatus::Partial => 3,
        EnvelopeStatus::Error => 4,
    }
}
