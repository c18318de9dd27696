mod cli;
mod color;
mod commands;
mod config;
mod logging;
mod output;
mod sample;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use cli::{Cli, Commands};
use commands::config::handle_config;
use commands::preview::handle_preview;
use commands::run::{handle_dry_run, handle_run, handle_schedule};
use config::{Config, RunMode};
use output::output_error;
use std::process::ExitCode;
use tracing::info;

fn main() -> ExitCode {
    // A .env file fills in variables the environment does not already set,
    // including the ones clap reads for its flags
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let ansi = color::init(cli.color);

    if let Err(e) = run(&cli, ansi) {
        output_error(&e, cli.format);
        return ExitCode::from(1);
    }

    ExitCode::SUCCESS
}

fn run(cli: &Cli, ansi: bool) -> Result<()> {
    match &cli.command {
        Some(Commands::Completions { shell }) => {
            clap_complete::generate(
                *shell,
                &mut Cli::command(),
                "jira-digest",
                &mut std::io::stdout(),
            );
            Ok(())
        }
        Some(Commands::Config { action }) => handle_config(cli.config.as_deref(), *action, cli.format),
        Some(Commands::Run { dry_run: true }) => handle_dry_run(&load(cli, ansi)?),
        Some(Commands::Run { dry_run: false }) => handle_run(&load(cli, ansi)?, cli.format),
        Some(Commands::Schedule) => handle_schedule(&load(cli, ansi)?),
        Some(Commands::Preview { sample }) => handle_preview(&load(cli, ansi)?, *sample, cli.format),
        None => {
            let config = load(cli, ansi)?;
            info!(mode = %config.run_mode, "Using configured run mode");
            match config.run_mode {
                RunMode::Once => handle_run(&config, cli.format),
                RunMode::Loop => handle_schedule(&config),
            }
        }
    }
}

/// Load the configuration and start logging with it
fn load(cli: &Cli, ansi: bool) -> Result<Config> {
    let config = Config::load(cli.config.as_deref())?;
    let level = cli.log_level.as_deref().unwrap_or(&config.log_level);
    logging::init(&config, level, ansi)?;
    Ok(config)
}
