use super::commands::{Cli, Command};
use super::handlers::{self, Outcome};
use crate::config::ConfigLoader;
use crate::logging::setup_logging;
use anyhow::{Context, Result};
use clap::Parser;
use glitchflow_common::error_message;
use std::process::ExitCode;
use tokio::runtime::Runtime;

/// Parses the command line, runs the command and maps the outcome to an exit code: non-zero
/// when anything failed, whether fatally or for individual jobs and streams.
pub fn process_command() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(Outcome::Clean) => ExitCode::SUCCESS,
        Ok(Outcome::Failures) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!("{e:?}");
            error_message!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<Outcome> {
    let mut config = ConfigLoader::load(cli.config.as_deref(), &cli.overrides)?;
    setup_logging(&config.layout().log_file(), cli.verbose)?;
    tracing::debug!(?config, "configuration loaded");

    let runtime = Runtime::new().context("failed to start async runtime")?;
    match cli.command {
        Command::Segments { json } => runtime.block_on(handlers::segments(config, json)),
        Command::Generate => runtime.block_on(handlers::generate(config)),
        Command::Execute { retry_failed } => {
            runtime.block_on(handlers::execute(config, cli.dry_run, retry_failed))
        }
        Command::Merge { mode } => {
            if let Some(mode) = mode {
                config.merge.mode = mode;
            }
            handlers::merge(config)
        }
        Command::Run { retry_failed } => {
            runtime.block_on(handlers::run(config, cli.dry_run, retry_failed))
        }
    }
}
