//! Dotted field paths into a Jira issue's `fields` object

use serde_json::Value;

/// Default owner path: the assignee's display name
pub const DEFAULT_OWNER_PATH: &str = "assignee.displayName";

/// Fields every search requests regardless of configured paths
const BASE_FIELDS: &[&str] = &["summary", "status", "priority", "updated"];

/// Which issue fields feed the owner tally and the environment column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPaths {
    /// Path whose value counts as the issue owner, e.g. "customfield_10020.displayName"
    pub owner: String,
    /// Optional path shown after the priority on every issue line
    pub environment: Option<String>,
}

impl Default for FieldPaths {
    fn default() -> Self {
        Self {
            owner: DEFAULT_OWNER_PATH.to_string(),
            environment: None,
        }
    }
}

impl FieldPaths {
    /// Names for the `fields` query parameter: the base set plus the first
    /// segment of each configured path, without duplicates.
    pub fn search_fields(&self) -> Vec<String> {
        let mut fields: Vec<String> = BASE_FIELDS.iter().map(|f| f.to_string()).collect();
        let roots = std::iter::once(self.owner.as_str())
            .chain(self.environment.as_deref())
            .filter_map(|path| path.split('.').map(str::trim).find(|s| !s.is_empty()));
        for root in roots {
            if !fields.iter().any(|f| f == root) {
                fields.push(root.to_string());
            }
        }
        fields
    }
}

/// Resolve a dotted path against a `fields` object.
///
/// Arrays resolve to their first element. A path ending on an object yields
/// its `displayName`, `name` or `value`, so "assignee", "components" and
/// single-select custom fields read naturally. Blank results are `None`.
pub fn lookup(fields: &Value, path: &str) -> Option<String> {
    let mut current = fields;
    for segment in path.split('.').map(str::trim).filter(|s| !s.is_empty()) {
        current = first(current).get(segment)?;
    }
    label(first(current))
}

fn first(value: &Value) -> &Value {
    match value {
        Value::Array(items) => items.first().unwrap_or(&Value::Null),
        other => other,
    }
}

fn label(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Object(map) => ["displayName", "name", "value"]
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_str))?
            .to_string(),
        Value::Null | Value::Array(_) => return None,
    };
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields() -> Value {
        json!({
            "assignee": { "displayName": "Alice", "name": "alice" },
            "reporter": { "name": "jdoe" },
            "customfield_10020": [{ "displayName": "Quinn QA" }, { "displayName": "Other" }],
            "customfield_10030": { "value": "staging", "id": "10101" },
            "labels": ["backend", "urgent"],
            "storyPoints": 3,
            "blank": "   ",
            "nothing": null
        })
    }

    #[test]
    fn dotted_paths_and_object_labels() {
        let fields = fields();
        assert_eq!(lookup(&fields, "assignee.displayName").as_deref(), Some("Alice"));
        assert_eq!(lookup(&fields, "assignee").as_deref(), Some("Alice"));
        assert_eq!(lookup(&fields, "reporter").as_deref(), Some("jdoe"));
        assert_eq!(lookup(&fields, "customfield_10030").as_deref(), Some("staging"));
        assert_eq!(lookup(&fields, "storyPoints").as_deref(), Some("3"));
    }

    #[test]
    fn arrays_resolve_to_first_element() {
        let fields = fields();
        assert_eq!(lookup(&fields, "customfield_10020.displayName").as_deref(), Some("Quinn QA"));
        assert_eq!(lookup(&fields, "customfield_10020").as_deref(), Some("Quinn QA"));
        assert_eq!(lookup(&fields, "labels").as_deref(), Some("backend"));
    }

    #[test]
    fn missing_or_blank_values_are_none() {
        let fields = fields();
        assert_eq!(lookup(&fields, "reporter.displayName"), None);
        assert_eq!(lookup(&fields, "blank"), None);
        assert_eq!(lookup(&fields, "nothing"), None);
        assert_eq!(lookup(&fields, "absent.deeper"), None);
        assert_eq!(lookup(&json!({ "empty": [] }), "empty"), None);
    }

    #[test]
    fn search_fields_include_configured_roots_once() {
        let paths = FieldPaths {
            owner: "customfield_10020.displayName".to_string(),
            environment: Some("customfield_10030".to_string()),
        };
        assert_eq!(
            paths.search_fields(),
            vec!["summary", "status", "priority", "updated", "customfield_10020", "customfield_10030"]
        );

        let defaults = FieldPaths::default().search_fields();
        assert_eq!(defaults, vec!["summary", "status", "priority", "updated", "assignee"]);

        let repeated = FieldPaths {
            owner: "status.name".to_string(),
            environment: None,
        };
        assert_eq!(repeated.search_fields().len(), 4);
    }
}
