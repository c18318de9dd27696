use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Issue as seen by the report pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    /// Human-readable key (e.g., "ABC-123")
    pub key: String,
    /// Issue summary/title
    pub summary: String,
    /// Workflow status name
    pub status: String,
    /// Owner name, the assignee unless another field is configured
    pub assignee: Option<String>,
    /// Last update timestamp
    pub updated: DateTime<Utc>,
    /// Project key derived from the issue key prefix
    pub project_key: String,
    /// Browser URL of the issue
    pub link: String,
    /// Priority name, when the tracker reports one
    #[serde(default)]
    pub priority: Option<String>,
    /// Value of the configured environment field
    #[serde(default)]
    pub environment: Option<String>,
}

impl Issue {
    /// Build an issue, deriving the project key and the browse link from `key`.
    pub fn new(
        key: impl Into<String>,
        summary: impl Into<String>,
        status: impl Into<String>,
        assignee: Option<String>,
        updated: DateTime<Utc>,
        base_url: &str,
    ) -> Self {
        let key = key.into();
        Self {
            project_key: project_key_of(&key).to_string(),
            link: browse_url(base_url, &key),
            key,
            summary: summary.into(),
            status: status.into(),
            assignee,
            updated,
            priority: None,
            environment: None,
        }
    }

    pub fn with_priority(mut self, priority: Option<String>) -> Self {
        self.priority = priority.filter(|p| !p.trim().is_empty());
        self
    }

    pub fn with_environment(mut self, environment: Option<String>) -> Self {
        self.environment = environment.filter(|e| !e.trim().is_empty());
        self
    }

    /// Priority and environment, in that order, skipping absent values
    pub fn extras(&self) -> impl Iterator<Item = &str> {
        self.priority
            .as_deref()
            .into_iter()
            .chain(self.environment.as_deref())
    }
}

/// Project key of an issue key: everything before the last `-`.
///
/// Keys without a dash are their own project.
pub fn project_key_of(key: &str) -> &str {
    key.rsplit_once('-').map(|(prefix, _)| prefix).unwrap_or(key)
}

/// Browser URL for an issue key on a tracker instance
pub fn browse_url(base_url: &str, key: &str) -> String {
    format!("{}/browse/{}", base_url.trim_end_matches('/'), key)
}

/// Structured daily report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    /// Project groups in first-seen order
    pub groups: Vec<ProjectGroup>,
    /// Number of issues the report was built from
    pub total_issues: usize,
    /// Most frequent assignees, highest count first
    pub assignees: Vec<AssigneeCount>,
}

impl Report {
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Issues of one project, truncated to top-N
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectGroup {
    pub project_key: String,
    /// Shown issues, most recently updated first
    pub issues: Vec<Issue>,
    /// Number of issues in the group before truncation
    pub total: usize,
}

impl ProjectGroup {
    /// Number of issues cut by truncation
    pub fn hidden(&self) -> usize {
        self.total.saturating_sub(self.issues.len())
    }
}

/// Issue count for one assignee
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssigneeCount {
    pub name: String,
    pub count: usize,
}

/// Wire shape requested for the chat message
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    /// Plain text body
    Text,
    /// Rich post with block/link elements
    #[default]
    Post,
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageType::Text => write!(f, "text"),
            MessageType::Post => write!(f, "post"),
        }
    }
}

impl FromStr for MessageType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(MessageType::Text),
            "post" => Ok(MessageType::Post),
            other => Err(format!(
                "unknown message type '{}' (expected 'text' or 'post')",
                other
            )),
        }
    }
}

/// Rendered chat message, produced once per run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "msg_type", rename_all = "lowercase")]
pub enum Message {
    Text {
        body: String,
    },
    Post {
        title: String,
        /// Each row is one paragraph made of inline elements
        rows: Vec<Vec<PostElement>>,
    },
}

impl Message {
    pub fn message_type(&self) -> MessageType {
        match self {
            Message::Text { .. } => MessageType::Text,
            Message::Post { .. } => MessageType::Post,
        }
    }
}

/// Inline element of a post row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "tag")]
pub enum PostElement {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "a")]
    Link { text: String, href: String },
}

impl PostElement {
    pub fn text(text: impl Into<String>) -> Self {
        PostElement::Text { text: text.into() }
    }

    pub fn link(text: impl Into<String>, href: impl Into<String>) -> Self {
        PostElement::Link {
            text: text.into(),
            href: href.into(),
        }
    }

    /// Visible text of the element
    pub fn as_str(&self) -> &str {
        match self {
            PostElement::Text { text } | PostElement::Link { text, .. } => text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn project_key_is_prefix_before_last_dash() {
        assert_eq!(project_key_of("ABC-123"), "ABC");
        assert_eq!(project_key_of("MY-TEAM-7"), "MY-TEAM");
        assert_eq!(project_key_of("NODASH"), "NODASH");
    }

    #[test]
    fn issue_new_derives_project_and_link() {
        let updated = Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap();
        let issue = Issue::new(
            "ABC-1",
            "Fix login",
            "Open",
            None,
            updated,
            "https://jira.example.com/",
        );
        assert_eq!(issue.project_key, "ABC");
        assert_eq!(issue.link, "https://jira.example.com/browse/ABC-1");
    }

    #[test]
    fn message_type_parses_case_insensitively() {
        assert_eq!("POST".parse::<MessageType>().unwrap(), MessageType::Post);
        assert_eq!(" text ".parse::<MessageType>().unwrap(), MessageType::Text);
        assert!("interactive".parse::<MessageType>().is_err());
    }

    #[test]
    fn post_element_serializes_with_lark_tags() {
        let link = serde_json::to_value(PostElement::link("ABC-1", "https://x/browse/ABC-1"))
            .unwrap();
        assert_eq!(link["tag"], "a");
        assert_eq!(link["href"], "https://x/browse/ABC-1");
        let text = serde_json::to_value(PostElement::text("hello")).unwrap();
        assert_eq!(text["tag"], "text");
        assert_eq!(text["text"], "hello");
    }
}
