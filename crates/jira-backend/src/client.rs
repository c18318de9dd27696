use std::time::Duration;

use digest_core::{collect_pages, Deadline, Page, PageCursor, RetryPolicy};
use tracing::debug;
use ureq::Agent;

use crate::auth::Credentials;
use crate::error::{JiraError, Result};
use crate::fields::FieldPaths;
use crate::models::*;

/// Default number of issues requested per page
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Default ceiling for a single HTTP request
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Jira REST API client
pub struct JiraClient {
    agent: Agent,
    base_url: String,
    auth_header: String,
    api_version: String,
    page_size: usize,
    request_timeout: Duration,
    retry: RetryPolicy,
    fields: FieldPaths,
}

impl JiraClient {
    /// Create a new Jira client.
    ///
    /// The API version follows the credential type: v3 for Cloud API tokens,
    /// v2 for Server/Data Center logins. Override it with [`with_api_version`].
    ///
    /// [`with_api_version`]: JiraClient::with_api_version
    pub fn new(base_url: &str, credentials: &Credentials) -> Self {
        let agent = Agent::config_builder()
            .timeout_global(Some(DEFAULT_REQUEST_TIMEOUT))
            // Don't treat HTTP errors as errors - we'll handle them ourselves
            .http_status_as_error(false)
            .build()
            .into();

        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_header: credentials.authorization_header(),
            api_version: credentials.method().default_api_version().to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            retry: RetryPolicy::default(),
            fields: FieldPaths::default(),
        }
    }

    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_field_paths(mut self, fields: FieldPaths) -> Self {
        self.fields = fields;
        self
    }

    pub fn field_paths(&self) -> &FieldPaths {
        &self.fields
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/rest/api/{}{}", self.base_url, self.api_version, path)
    }

    /// Cloud v3 pages with tokens on `/search/jql`; older versions use offsets.
    fn uses_token_paging(&self) -> bool {
        self.api_version != "2"
    }

    /// Check response status and return error if not successful
    fn check_response(
        &self,
        mut response: ureq::http::Response<ureq::Body>,
    ) -> Result<ureq::http::Response<ureq::Body>> {
        let status = response.status().as_u16();

        if (200..300).contains(&status) {
            return Ok(response);
        }

        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs);

        let body = response
            .body_mut()
            .read_to_string()
            .unwrap_or_else(|_| String::new());
        let message = error_message(status, body);

        match status {
            401 | 403 => Err(JiraError::Unauthorized { status, message }),
            429 => Err(JiraError::RateLimited { retry_after }),
            _ => Err(JiraError::Api { status, message }),
        }
    }

    fn search_url(&self, jql: &str, cursor: Option<&PageCursor>, limit: usize) -> String {
        let fields = urlencoding::encode(&self.fields.search_fields().join(",")).into_owned();
        let jql_encoded = urlencoding::encode(jql);

        if self.uses_token_paging() {
            let mut url = format!(
                "{}?jql={}&maxResults={}&fields={}",
                self.api_url("/search/jql"),
                jql_encoded,
                limit,
                fields
            );
            if let Some(PageCursor::Token(token)) = cursor {
                url.push_str("&nextPageToken=");
                url.push_str(&urlencoding::encode(token));
            }
            url
        } else {
            let start_at = match cursor {
                Some(PageCursor::Offset(offset)) => *offset,
                _ => 0,
            };
            format!(
                "{}?jql={}&startAt={}&maxResults={}&fields={}",
                self.api_url("/search"),
                jql_encoded,
                start_at,
                limit,
                fields
            )
        }
    }

    /// Fetch one page of search results, retrying transient failures.
    pub fn search_page(
        &self,
        jql: &str,
        cursor: Option<&PageCursor>,
        limit: usize,
        deadline: &Deadline,
    ) -> Result<JiraSearchResult> {
        let url = self.search_url(jql, cursor, limit);
        self.retry
            .execute("jira.search", deadline, |attempt| {
                debug!(attempt, cursor = ?cursor, limit, "Requesting Jira search page");
                self.get_json(&url, deadline)
            })
    }

    /// Search with JQL, following pages until `max_results` unique issues are
    /// collected or Jira reports the last page.
    pub fn search_all(
        &self,
        jql: &str,
        max_results: usize,
        deadline: &Deadline,
    ) -> Result<Vec<JiraIssue>> {
        collect_pages(
            max_results,
            self.page_size,
            |issue: &JiraIssue| issue.key.clone(),
            |cursor, limit| -> Result<Page<JiraIssue>> {
                let result = self.search_page(jql, cursor, limit, deadline)?;
                let next = result.next_cursor();
                debug!(returned = result.issues.len(), next = ?next, "Jira search page received");
                Ok(Page {
                    items: result.issues,
                    next,
                })
            },
        )
    }

    fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str, deadline: &Deadline) -> Result<T> {
        let timeout = deadline
            .cap(self.request_timeout)
            .ok_or(JiraError::DeadlineExceeded)?;

        let response = self
            .agent
            .get(url)
            .config()
            .timeout_global(Some(timeout))
            .build()
            .header("Authorization", &self.auth_header)
            .header("Accept", "application/json")
            .call()?;

        let mut response = self.check_response(response)?;
        let body = response.body_mut().read_to_string()?;
        Ok(serde_json::from_str(&body)?)
    }
}

/// Jira error format: {"errorMessages":["..."], "errors":{"field":"..."}}
fn error_message(status: u16, body: String) -> String {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(&body) else {
        return if body.trim().is_empty() {
            format!("HTTP {}", status)
        } else {
            body
        };
    };

    let mut messages = Vec::new();
    if let Some(errors) = value.get("errorMessages").and_then(|e| e.as_array()) {
        messages.extend(errors.iter().filter_map(|e| e.as_str()).map(str::to_string));
    }
    if let Some(errors) = value.get("errors").and_then(|e| e.as_object()) {
        for (field, msg) in errors {
            if let Some(s) = msg.as_str() {
                messages.push(format!("{}: {}", field, s));
            }
        }
    }

    if messages.is_empty() {
        body
    } else {
        messages.join("; ")
    }
}
