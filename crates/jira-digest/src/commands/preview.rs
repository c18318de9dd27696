use anyhow::Result;
use chrono::Utc;
use digest_core::{prepare, IssueSource};

use super::jira_client;
use crate::cli::OutputFormat;
use crate::config::Config;
use crate::output::output_message;
use crate::sample::SampleSource;

pub fn handle_preview(config: &Config, sample: bool, format: OutputFormat) -> Result<()> {
    let options = config.pipeline_options()?;

    let source: Box<dyn IssueSource> = if sample {
        Box::new(SampleSource::new(config.jira.base_url.as_deref()))
    } else {
        let jira = config.jira_settings()?;
        Box::new(jira_client(&jira, &config.retry_policy()?))
    };

    let prepared = prepare(source.as_ref(), &options, Utc::now())?;
    output_message(&prepared.message, format)?;
    Ok(())
}
