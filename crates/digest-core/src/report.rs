//! Grouping of fetched issues into a report

use std::collections::HashMap;

use crate::models::{AssigneeCount, Issue, ProjectGroup, Report};

/// Label used in the assignee tally for unassigned issues
pub const UNASSIGNED: &str = "Unassigned";

/// Number of assignees kept in the tally
pub const TOP_ASSIGNEES: usize = 10;

/// Group issues by project and truncate each group to `top_n`.
///
/// Projects appear in first-seen order and issues keep their input order,
/// which is the tracker's recency order. Nothing is re-sorted.
pub fn build(issues: &[Issue], top_n: usize) -> Report {
    let mut groups: Vec<ProjectGroup> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for issue in issues {
        let slot = *index.entry(issue.project_key.as_str()).or_insert_with(|| {
            groups.push(ProjectGroup {
                project_key: issue.project_key.clone(),
                issues: Vec::new(),
                total: 0,
            });
            groups.len() - 1
        });

        let group = &mut groups[slot];
        group.total += 1;
        if group.issues.len() < top_n {
            group.issues.push(issue.clone());
        }
    }

    Report {
        groups,
        total_issues: issues.len(),
        assignees: tally_assignees(issues),
    }
}

/// Count issues per assignee, highest count first, ties broken by name.
fn tally_assignees(issues: &[Issue]) -> Vec<AssigneeCount> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for issue in issues {
        let name = issue
            .assignee
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(UNASSIGNED);
        *counts.entry(name).or_default() += 1;
    }

    let mut tally: Vec<AssigneeCount> = counts
        .into_iter()
        .map(|(name, count)| AssigneeCount {
            name: name.to_string(),
            count,
        })
        .collect();
    tally.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    tally.truncate(TOP_ASSIGNEES);
    tally
}
