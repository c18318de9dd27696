use anyhow::{anyhow, Context, Result};
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Layer, Registry};

use crate::config::{Config, LogFormat};

/// Install the global subscriber.
///
/// `RUST_LOG` wins over `level`. Events go to stderr, plus the log file when
/// one is configured, so stdout stays free for payloads.
pub fn init(config: &Config, level: &str, ansi: bool) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(normalize_level(level))
            .with_context(|| format!("Invalid log level '{}'", level))?,
    };

    let stderr_layer: Box<dyn Layer<Registry> + Send + Sync> = match config.log_format {
        LogFormat::Text => fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(ansi)
            .with_target(false)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed(),
    };

    let file_layer = match &config.log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .with(filter)
        .try_init()
        .map_err(|e| anyhow!("Failed to initialize logging: {}", e))
}

/// Accept level names as written for other logging stacks (`INFO`, `WARNING`).
fn normalize_level(level: &str) -> String {
    match level.trim().to_ascii_lowercase().as_str() {
        "warning" => "warn".to_string(),
        "critical" | "fatal" => "error".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_foreign_level_names() {
        assert_eq!(normalize_level("INFO"), "info");
        assert_eq!(normalize_level("WARNING"), "warn");
        assert_eq!(normalize_level("critical"), "error");
        assert_eq!(normalize_level("jira_backend=debug"), "jira_backend=debug");
    }
}
