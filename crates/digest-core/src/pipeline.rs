//! Fetch → build → render → deliver, once per trigger

use std::fmt;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use thiserror::Error;
use tracing::{info, info_span};

use crate::error::DigestError;
use crate::models::{Message, MessageType, Report};
use crate::render::{render, RenderOptions};
use crate::report;
use crate::retry::Deadline;
use crate::traits::{DeliveryResult, IssueSource, NotificationSink};

/// Stage of a run that can fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetch,
    Deliver,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Fetch => write!(f, "fetch"),
            Stage::Deliver => write!(f, "deliver"),
        }
    }
}

/// Failure of a run, tagged with the stage that failed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{stage} stage failed: {error}")]
pub struct RunError {
    pub stage: Stage,
    pub error: DigestError,
}

impl RunError {
    pub fn new(stage: Stage, error: DigestError) -> Self {
        Self { stage, error }
    }
}

/// What a completed run did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Issues fetched from the tracker
    pub issues: usize,
    /// Project groups in the report
    pub groups: usize,
    /// Sink acknowledgement, absent for dry runs
    pub delivery: Option<DeliveryResult>,
}

/// Per-run settings, fixed for the life of the process
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub jql: String,
    pub max_results: usize,
    pub top_n: usize,
    pub message_type: MessageType,
    pub enable_links: bool,
    pub title: String,
    /// Timezone used for the report date
    pub timezone: Tz,
    /// Wall-clock ceiling for one run, fetch and delivery together
    pub run_timeout: Duration,
}

/// Rendered output of a run that has not been delivered
#[derive(Debug, Clone)]
pub struct Prepared {
    pub report: Report,
    pub message: Message,
}

/// One report pipeline wired to its source and sink
pub struct Pipeline<'a> {
    source: &'a dyn IssueSource,
    sink: &'a dyn NotificationSink,
    options: PipelineOptions,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        source: &'a dyn IssueSource,
        sink: &'a dyn NotificationSink,
        options: PipelineOptions,
    ) -> Self {
        Self {
            source,
            sink,
            options,
        }
    }

    /// Execute a full run: nothing is delivered unless fetching and rendering
    /// both completed.
    pub fn run(&self, now: DateTime<Utc>) -> Result<RunSummary, RunError> {
        let span = info_span!("run", started = %now.with_timezone(&self.options.timezone));
        let _guard = span.enter();

        let deadline = Deadline::after(self.options.run_timeout);
        let prepared = self.prepare_with(now, &deadline)?;

        let started = Instant::now();
        let delivery = self
            .sink
            .deliver(&prepared.message, &deadline)
            .map_err(|e| RunError::new(Stage::Deliver, e))?;
        info!(
            message_type = %prepared.message.message_type(),
            attempts = delivery.attempts,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Report delivered"
        );

        Ok(RunSummary {
            issues: prepared.report.total_issues,
            groups: prepared.report.groups.len(),
            delivery: Some(delivery),
        })
    }

    /// Fetch and render without delivering.
    pub fn prepare(&self, now: DateTime<Utc>) -> Result<Prepared, RunError> {
        prepare(self.source, &self.options, now)
    }

    fn prepare_with(&self, now: DateTime<Utc>, deadline: &Deadline) -> Result<Prepared, RunError> {
        prepare_within(self.source, &self.options, now, deadline)
    }
}

/// Fetch and render a report from `source` alone, for previews that have no
/// sink to deliver to.
pub fn prepare(
    source: &dyn IssueSource,
    options: &PipelineOptions,
    now: DateTime<Utc>,
) -> Result<Prepared, RunError> {
    let deadline = Deadline::after(options.run_timeout);
    prepare_within(source, options, now, &deadline)
}

fn prepare_within(
    source: &dyn IssueSource,
    options: &PipelineOptions,
    now: DateTime<Utc>,
    deadline: &Deadline,
) -> Result<Prepared, RunError> {
    let started = Instant::now();
    let issues = source
        .fetch(&options.jql, options.max_results, deadline)
        .map_err(|e| RunError::new(Stage::Fetch, e))?;
    info!(
        issues = issues.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Fetched issues"
    );

    let report = report::build(&issues, options.top_n);
    let message = render(&report, &render_options(options, now));
    info!(
        groups = report.groups.len(),
        message_type = %message.message_type(),
        "Report rendered"
    );

    Ok(Prepared { report, message })
}

fn render_options(options: &PipelineOptions, now: DateTime<Utc>) -> RenderOptions {
    RenderOptions {
        message_type: options.message_type,
        enable_links: options.enable_links,
        title: options.title.clone(),
        generated_on: now.with_timezone(&options.timezone).date_naive(),
    }
}
