use digest_core::PageCursor;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Jira issue, restricted to the fields the report reads
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JiraIssue {
    /// Internal numeric ID
    #[serde(default)]
    pub id: String,
    /// Issue key (e.g., "PROJ-123")
    pub key: String,
    pub fields: JiraIssueFields,
}

/// Issue fields container
///
/// Fields the report always reads are typed; assignee, custom fields and
/// anything else a configured path points at stay in `other`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JiraIssueFields {
    #[serde(default)]
    pub summary: String,
    pub status: Option<JiraStatus>,
    pub priority: Option<JiraPriority>,
    /// Last update timestamp, e.g. "2024-01-15T12:00:00.000+0000"
    pub updated: Option<String>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

/// Issue status
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JiraStatus {
    pub name: String,
}

/// Issue priority
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JiraPriority {
    pub name: String,
}

/// Search response
///
/// Jira Cloud's `/search/jql` pages with `nextPageToken`/`isLast`; the classic
/// `/search` endpoint pages with `startAt`/`total`. Both shapes land here.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JiraSearchResult {
    pub start_at: Option<usize>,
    pub max_results: Option<usize>,
    pub total: Option<usize>,
    #[serde(default)]
    pub issues: Vec<JiraIssue>,
    pub next_page_token: Option<String>,
    pub is_last: Option<bool>,
}

impl JiraSearchResult {
    /// Cursor of the following page, `None` on the last page
    pub fn next_cursor(&self) -> Option<PageCursor> {
        if self.is_last == Some(true) || self.issues.is_empty() {
            return None;
        }
        if let Some(token) = self.next_page_token.as_deref().filter(|t| !t.is_empty()) {
            return Some(PageCursor::Token(token.to_string()));
        }

        let end = self.start_at.unwrap_or(0) + self.issues.len();
        match self.total {
            Some(total) if end < total => Some(PageCursor::Offset(end)),
            _ => None,
        }
    }
}
