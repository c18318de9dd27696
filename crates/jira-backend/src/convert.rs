//! Conversion from Jira models to digest-core issues

use chrono::{DateTime, Utc};
use digest_core::Issue;

use crate::error::{JiraError, Result};
use crate::fields::{lookup, FieldPaths};
use crate::models::JiraIssue;

const UNKNOWN_STATUS: &str = "Unknown";

/// Parse a Jira timestamp.
///
/// Jira writes offsets without a colon ("2024-01-15T12:00:00.000+0000"); RFC 3339
/// is accepted as well.
pub fn parse_jira_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f%z")
        .or_else(|_| DateTime::parse_from_rfc3339(value))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

impl JiraIssue {
    /// Convert into a report issue with a browse link on `base_url`, reading
    /// owner and environment through `paths`.
    pub fn into_issue(self, base_url: &str, paths: &FieldPaths) -> Result<Issue> {
        let raw = self.fields.updated.clone().unwrap_or_default();
        let updated = parse_jira_timestamp(&raw).ok_or_else(|| JiraError::InvalidTimestamp {
            key: self.key.clone(),
            value: raw.clone(),
        })?;

        let values = serde_json::to_value(&self.fields)?;
        let owner = lookup(&values, &paths.owner);
        let environment = paths
            .environment
            .as_deref()
            .and_then(|path| lookup(&values, path));

        let fields = self.fields;
        let status = fields
            .status
            .map(|s| s.name)
            .unwrap_or_else(|| UNKNOWN_STATUS.to_string());

        Ok(Issue::new(self.key, fields.summary, status, owner, updated, base_url)
            .with_priority(fields.priority.map(|p| p.name))
            .with_environment(environment))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::*;
    use chrono::TimeZone;

    #[test]
    fn parses_jira_and_rfc3339_timestamps() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        assert_eq!(parse_jira_timestamp("2024-01-15T12:00:00.000+0000"), Some(expected));
        assert_eq!(parse_jira_timestamp("2024-01-15T20:00:00.000+0800"), Some(expected));
        assert_eq!(parse_jira_timestamp("2024-01-15T12:00:00Z"), Some(expected));
        assert_eq!(parse_jira_timestamp("yesterday"), None);
    }

    fn jira_issue(key: &str, fields: serde_json::Value) -> JiraIssue {
        serde_json::from_value(serde_json::json!({ "id": "1", "key": key, "fields": fields }))
            .unwrap()
    }

    #[test]
    fn converts_issue_with_missing_optional_fields() {
        let jira = jira_issue(
            "OPS-7",
            serde_json::json!({
                "summary": "Rotate certs",
                "status": null,
                "assignee": { "displayName": "Jo Doe", "name": "jdoe" },
                "updated": "2024-01-15T12:00:00.000+0000"
            }),
        );

        let issue = jira
            .into_issue("https://jira.example.com/", &FieldPaths::default())
            .unwrap();
        assert_eq!(issue.project_key, "OPS");
        assert_eq!(issue.status, "Unknown");
        assert_eq!(issue.assignee.as_deref(), Some("Jo Doe"));
        assert_eq!(issue.priority, None);
        assert_eq!(issue.environment, None);
        assert_eq!(issue.link, "https://jira.example.com/browse/OPS-7");
    }

    #[test]
    fn owner_and_environment_follow_configured_paths() {
        let jira = jira_issue(
            "PAY-3",
            serde_json::json!({
                "summary": "Refund webhook",
                "status": { "name": "In QA" },
                "priority": { "name": "High" },
                "assignee": { "displayName": "Dev Person" },
                "customfield_10020": [{ "displayName": "Quinn QA" }],
                "customfield_10030": { "value": "staging" },
                "updated": "2024-01-15T12:00:00.000+0000"
            }),
        );
        let paths = FieldPaths {
            owner: "customfield_10020.displayName".to_string(),
            environment: Some("customfield_10030".to_string()),
        };

        let issue = jira.into_issue("https://jira", &paths).unwrap();
        assert_eq!(issue.assignee.as_deref(), Some("Quinn QA"));
        assert_eq!(issue.priority.as_deref(), Some("High"));
        assert_eq!(issue.environment.as_deref(), Some("staging"));
    }

    #[test]
    fn unset_owner_field_means_unassigned() {
        let jira = jira_issue(
            "PAY-4",
            serde_json::json!({
                "summary": "Docs",
                "assignee": { "displayName": "Dev Person" },
                "customfield_10020": null,
                "updated": "2024-01-15T12:00:00.000+0000"
            }),
        );
        let paths = FieldPaths {
            owner: "customfield_10020".to_string(),
            environment: None,
        };
        assert_eq!(jira.into_issue("https://jira", &paths).unwrap().assignee, None);
    }

    #[test]
    fn rejects_unreadable_timestamp() {
        let jira = JiraIssue {
            id: "1".to_string(),
            key: "OPS-8".to_string(),
            fields: JiraIssueFields {
                updated: Some("not a date".to_string()),
                ..Default::default()
            },
        };
        assert!(matches!(
            jira.into_issue("https://jira", &FieldPaths::default()),
            Err(JiraError::InvalidTimestamp { .. })
        ));
    }
}
