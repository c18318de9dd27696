//! Built-in issues for previews without a Jira connection

use chrono::{Duration, Utc};
use digest_core::{Deadline, Issue, IssueSource};

pub const SAMPLE_BASE_URL: &str = "https://your-domain.atlassian.net";

/// Issue source serving a fixed demo set
pub struct SampleSource {
    base_url: String,
}

impl SampleSource {
    pub fn new(base_url: Option<&str>) -> Self {
        Self {
            base_url: base_url.unwrap_or(SAMPLE_BASE_URL).to_string(),
        }
    }
}

impl IssueSource for SampleSource {
    fn fetch(&self, _jql: &str, max_results: usize, _deadline: &Deadline) -> digest_core::Result<Vec<Issue>> {
        let now = Utc::now();
        let issue = |key: &str, summary: &str, status: &str, assignee: Option<&str>, priority: &str, minutes: i64| {
            Issue::new(
                key,
                summary,
                status,
                assignee.map(str::to_string),
                now - Duration::minutes(minutes),
                &self.base_url,
            )
            .with_priority(Some(priority.to_string()))
        };

        Ok(vec![
            issue("ABC-101", "Fix error handling on failed login", "In Progress", Some("Alice"), "High", 20),
            issue("ABC-102", "Speed up report export", "Done", Some("Bob"), "Medium", 95),
            issue("XYZ-7", "Connect third-party payment sandbox", "To Do", None, "Low", 240),
        ]
        .into_iter()
        .take(max_results)
        .collect())
    }
}
