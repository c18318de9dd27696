use anyhow::{anyhow, Result};
use chrono::Utc;
use digest_core::next_trigger;
use std::path::Path;

use crate::cli::{ConfigCommands, OutputFormat};
use crate::config::{config_paths, to_toml, Config};
use crate::output::output_check;

/// Triggers listed by `config check`
const NEXT_RUNS: usize = 3;

pub fn handle_config(
    config_path: Option<&Path>,
    action: ConfigCommands,
    format: OutputFormat,
) -> Result<()> {
    match action {
        ConfigCommands::Path => {
            for path in config_paths(config_path) {
                let marker = if path.exists() { "" } else { " (not found)" };
                println!("{}{}", path.display(), marker);
            }
            Ok(())
        }
        ConfigCommands::Show => {
            let config = Config::load(config_path)?.masked();
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&config)?),
                OutputFormat::Text => print!("{}", to_toml(&config)?),
            }
            Ok(())
        }
        ConfigCommands::Check => {
            let config = Config::load(config_path)?;
            let settings = config.resolve()?;

            let mut runs = Vec::with_capacity(NEXT_RUNS);
            let mut after = Utc::now();
            while runs.len() < NEXT_RUNS {
                let next = next_trigger(&settings.schedule, settings.timezone, after)
                    .ok_or_else(|| anyhow!("Cron expression '{}' never fires", settings.schedule))?;
                after = next.with_timezone(&Utc);
                runs.push(next);
            }

            output_check(settings.schedule.expression(), settings.timezone, &runs, format)?;
            Ok(())
        }
    }
}
