use anyhow::Result;
use chrono::Utc;
use digest_core::{prepare, run_once, Pipeline, RunScheduler, SystemClock};
use tracing::info;

use super::{jira_client, lark_client};
use crate::cli::OutputFormat;
use crate::config::Config;
use crate::output::{output_payload, output_summary};

/// One-shot run. A failed run is returned as an error so the exit status shows it.
pub fn handle_run(config: &Config, format: OutputFormat) -> Result<()> {
    let settings = config.resolve()?;
    let jira = jira_client(&settings.jira, &settings.retry);
    let lark = lark_client(&settings);
    let pipeline = Pipeline::new(&jira, &lark, settings.pipeline);

    let summary = run_once(|| pipeline.run(Utc::now()))?;
    output_summary(&summary, format)?;
    Ok(())
}

/// Fetch and render, print the payload that would be posted
pub fn handle_dry_run(config: &Config) -> Result<()> {
    let options = config.pipeline_options()?;
    let jira_settings = config.jira_settings()?;
    let jira = jira_client(&jira_settings, &config.retry_policy()?);

    info!(jql = %options.jql, "Dry run, nothing will be delivered");
    let prepared = prepare(&jira, &options, Utc::now())?;
    output_payload(&prepared.message)?;
    Ok(())
}

/// Recurring mode: only configuration errors end it
pub fn handle_schedule(config: &Config) -> Result<()> {
    let settings = config.resolve()?;
    let jira = jira_client(&settings.jira, &settings.retry);
    let lark = lark_client(&settings);
    let pipeline = Pipeline::new(&jira, &lark, settings.pipeline);

    let mut scheduler = RunScheduler::new(settings.schedule, settings.timezone, SystemClock);
    scheduler.run(|| pipeline.run(Utc::now()))?;
    Ok(())
}
