//! JQL helpers

/// Restrict a filter to the given projects, keeping a trailing `ORDER BY`.
///
/// `updated >= -1d ORDER BY updated DESC` scoped to `["ABC", "XYZ"]` becomes
/// `project in (ABC, XYZ) AND (updated >= -1d) ORDER BY updated DESC`.
pub fn scope_to_projects(jql: &str, project_keys: &[String]) -> String {
    let keys: Vec<&str> = project_keys
        .iter()
        .map(|k| k.trim())
        .filter(|k| !k.is_empty())
        .collect();
    if keys.is_empty() {
        return jql.to_string();
    }

    let (filter, order_by) = split_order_by(jql);
    let scope = format!("project in ({})", keys.join(", "));
    let scoped = if filter.is_empty() {
        scope
    } else {
        format!("{} AND ({})", scope, filter)
    };

    match order_by {
        Some(order) => format!("{} {}", scoped, order),
        None => scoped,
    }
}

fn split_order_by(jql: &str) -> (&str, Option<&str>) {
    let upper = jql.to_ascii_uppercase();
    match upper.rfind("ORDER BY") {
        Some(pos) if pos == 0 || upper[..pos].ends_with(char::is_whitespace) => {
            (jql[..pos].trim(), Some(jql[pos..].trim()))
        }
        _ => (jql.trim(), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(list: &[&str]) -> Vec<String> {
        list.iter().map(|k| k.to_string()).collect()
    }

    #[test]
    fn keeps_order_by_at_the_end() {
        assert_eq!(
            scope_to_projects("updated >= -1d ORDER BY updated DESC", &keys(&["ABC", "XYZ"])),
            "project in (ABC, XYZ) AND (updated >= -1d) ORDER BY updated DESC"
        );
        assert_eq!(
            scope_to_projects("status = Open order by key", &keys(&["ABC"])),
            "project in (ABC) AND (status = Open) order by key"
        );
    }

    #[test]
    fn order_only_filter() {
        assert_eq!(
            scope_to_projects("ORDER BY updated DESC", &keys(&["ABC"])),
            "project in (ABC) ORDER BY updated DESC"
        );
    }

    #[test]
    fn no_keys_leaves_filter_untouched() {
        let jql = "updated >= -1d ORDER BY updated DESC";
        assert_eq!(scope_to_projects(jql, &[]), jql);
        assert_eq!(scope_to_projects(jql, &keys(&[" ", ""])), jql);
    }
}
