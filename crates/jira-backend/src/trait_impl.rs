//! IssueSource trait implementation for JiraClient

use digest_core::{Deadline, Issue, IssueSource, Result};

use crate::client::JiraClient;
use crate::error::JiraError;

impl IssueSource for JiraClient {
    fn fetch(&self, jql: &str, max_results: usize, deadline: &Deadline) -> Result<Vec<Issue>> {
        let issues = self.search_all(jql, max_results, deadline)?;
        issues
            .into_iter()
            .map(|issue| issue.into_issue(self.base_url(), self.field_paths()))
            .collect::<std::result::Result<Vec<_>, JiraError>>()
            .map_err(Into::into)
    }
}
