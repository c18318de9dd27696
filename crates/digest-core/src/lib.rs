pub mod error;
pub mod models;
pub mod pagination;
pub mod pipeline;
pub mod render;
pub mod report;
pub mod retry;
pub mod schedule;
pub mod scheduler;
pub mod traits;

pub use error::{DigestError, Result};
pub use models::*;
pub use pagination::{collect_pages, Page, PageCursor};
pub use pipeline::{prepare, Pipeline, PipelineOptions, Prepared, RunError, RunSummary, Stage};
pub use render::{render, RenderOptions};
pub use retry::{Deadline, RetryPolicy, Retryable};
pub use schedule::{next_trigger, parse_timezone, triggers_between, CronSchedule, ScheduleError};
pub use scheduler::{run_once, Clock, RunScheduler, SchedulerState, SystemClock, TickOutcome};
pub use traits::{DeliveryResult, IssueSource, NotificationSink};
