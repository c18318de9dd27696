use crate::cli::OutputFormat;
use anyhow::{Context, Result};
use chrono_tz::Tz;
use colored::Colorize;
use digest_core::{DeliveryResult, Message, PostElement, RunError, RunSummary};
use lark_backend::WebhookPayload;
use serde::Serialize;

#[derive(Serialize)]
pub struct JsonError {
    pub error: bool,
    pub code: String,
    pub message: String,
}

pub fn output_error(err: &anyhow::Error, format: OutputFormat) {
    let message = match format {
        OutputFormat::Json => {
            let json_err = JsonError {
                error: true,
                code: error_code(err).to_string(),
                message: format!("{:#}", err),
            };
            serde_json::to_string_pretty(&json_err).unwrap_or_else(|_| {
                format!(r#"{{"error": true, "message": "{}"}}"#, err)
            })
        }
        OutputFormat::Text => format!("{}: {:#}", "Error".red().bold(), err),
    };
    eprintln!("{}", message);
}

/// Failure kind of a run error (`auth`, `query`, ...), `error` for anything else
fn error_code(err: &anyhow::Error) -> &'static str {
    err.downcast_ref::<RunError>()
        .map(|e| e.error.kind())
        .unwrap_or("error")
}

/// Print a rendered message: readable text, or the exact webhook payload as JSON
pub fn output_message(message: &Message, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => output_payload(message)?,
        OutputFormat::Text => println!("{}", message_text(message)),
    }
    Ok(())
}

pub fn output_payload(message: &Message) -> Result<()> {
    println!("{}", to_json(&WebhookPayload::from(message))?);
    Ok(())
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("Failed to serialize output")
}

fn message_text(message: &Message) -> String {
    match message {
        Message::Text { body } => body.clone(),
        Message::Post { title, rows } => {
            let mut lines = vec![title.bold().to_string()];
            lines.extend(rows.iter().map(|row| {
                row.iter()
                    .map(|element| match element {
                        PostElement::Text { text } => text.clone(),
                        PostElement::Link { text, href } => {
                            format!("{} {}", text.cyan().bold(), format!("<{}>", href).dimmed())
                        }
                    })
                    .collect::<String>()
            }));
            lines.join("\n")
        }
    }
}

#[derive(Serialize)]
struct JsonSummary<'a> {
    issues: usize,
    groups: usize,
    status: Option<u16>,
    code: Option<i64>,
    message: Option<&'a str>,
    attempts: Option<u32>,
}

pub fn output_summary(summary: &RunSummary, format: OutputFormat) -> Result<()> {
    let delivery: Option<&DeliveryResult> = summary.delivery.as_ref();
    match format {
        OutputFormat::Json => {
            let json = JsonSummary {
                issues: summary.issues,
                groups: summary.groups,
                status: delivery.map(|d| d.status),
                code: delivery.map(|d| d.code),
                message: delivery.map(|d| d.message.as_str()),
                attempts: delivery.map(|d| d.attempts),
            };
            println!("{}", to_json(&json)?);
        }
        OutputFormat::Text => {
            let mut line = format!(
                "{} {} {} in {} {}",
                "Delivered".green().bold(),
                summary.issues,
                plural(summary.issues, "issue", "issues"),
                summary.groups,
                plural(summary.groups, "project", "projects"),
            );
            if let Some(d) = delivery {
                line.push_str(
                    &format!(
                        " (HTTP {}, code {}, {} {})",
                        d.status,
                        d.code,
                        d.attempts,
                        plural(d.attempts as usize, "attempt", "attempts")
                    )
                    .dimmed()
                    .to_string(),
                );
            }
            println!("{}", line);
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct JsonCheck<'a> {
    valid: bool,
    cron: &'a str,
    timezone: String,
    next_runs: Vec<String>,
}

/// Report of a successful `config check`
pub fn output_check(
    cron: &str,
    tz: Tz,
    next_runs: &[chrono::DateTime<Tz>],
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let json = JsonCheck {
                valid: true,
                cron,
                timezone: tz.to_string(),
                next_runs: next_runs.iter().map(|t| t.to_rfc3339()).collect(),
            };
            println!("{}", to_json(&json)?);
        }
        OutputFormat::Text => {
            println!("{}", "Configuration OK".green().bold());
            println!("  {}: {} ({})", "Schedule".dimmed(), cron, tz);
            println!("  {}:", "Next runs".dimmed());
            for run in next_runs {
                println!("    {}", run.format("%Y-%m-%d %H:%M:%S %Z"));
            }
        }
    }
    Ok(())
}

fn plural<'a>(n: usize, one: &'a str, many: &'a str) -> &'a str {
    if n == 1 {
        one
    } else {
        many
    }
}
