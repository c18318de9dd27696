//! Rendering of a report into a chat message
//!
//! Both message shapes are produced from the same list of logical lines, so a
//! text and a post rendering of one report always carry the same issues in the
//! same order with the same truncation notes.

use chrono::NaiveDate;

use crate::models::{Message, MessageType, PostElement, Report};

/// Default report title
pub const DEFAULT_TITLE: &str = "Jira Daily Report";

/// How a report is turned into a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    pub message_type: MessageType,
    /// Render issue keys as links (post messages only)
    pub enable_links: bool,
    pub title: String,
    /// Date shown in the header, in the configured timezone
    pub generated_on: NaiveDate,
}

enum Line<'a> {
    Plain(String),
    Issue {
        key: &'a str,
        link: &'a str,
        rest: String,
    },
    Blank,
}

/// Render a report. Never fails; an empty report becomes a "no updates" notice.
pub fn render(report: &Report, options: &RenderOptions) -> Message {
    let lines = lines(report, options);
    match options.message_type {
        MessageType::Text => Message::Text {
            body: text_body(&lines),
        },
        MessageType::Post => Message::Post {
            title: options.title.clone(),
            rows: post_rows(&lines, options.enable_links),
        },
    }
}

fn lines<'a>(report: &'a Report, options: &RenderOptions) -> Vec<Line<'a>> {
    let date = options.generated_on.format("%Y-%m-%d");

    if report.is_empty() {
        return vec![Line::Plain(format!(
            "{} ({}): no issues were updated.",
            options.title, date
        ))];
    }

    let mut lines = vec![Line::Plain(format!(
        "{} ({}): {} updated {}",
        options.title,
        date,
        report.total_issues,
        plural(report.total_issues, "issue", "issues")
    ))];

    if !report.assignees.is_empty() {
        let tally = report
            .assignees
            .iter()
            .map(|a| format!("{} {}", a.name, a.count))
            .collect::<Vec<_>>()
            .join(", ");
        lines.push(Line::Plain(format!("Assignees: {}", tally)));
    }

    for group in &report.groups {
        lines.push(Line::Blank);
        lines.push(Line::Plain(format!("{} ({})", group.project_key, group.total)));
        for issue in &group.issues {
            let mut rest = format!(" — {} ({})", issue.summary, issue.status);
            for extra in issue.extras() {
                rest.push_str(" · ");
                rest.push_str(extra);
            }
            lines.push(Line::Issue {
                key: &issue.key,
                link: &issue.link,
                rest,
            });
        }
        if group.hidden() > 0 {
            lines.push(Line::Plain(format!("and {} more", group.hidden())));
        }
    }

    lines
}

fn text_body(lines: &[Line<'_>]) -> String {
    lines
        .iter()
        .map(|line| match line {
            Line::Plain(text) => text.clone(),
            Line::Issue { key, rest, .. } => format!("{}{}", key, rest),
            Line::Blank => String::new(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn post_rows(lines: &[Line<'_>], enable_links: bool) -> Vec<Vec<PostElement>> {
    lines
        .iter()
        .filter_map(|line| match line {
            Line::Plain(text) => Some(vec![PostElement::text(text.as_str())]),
            Line::Issue { key, link, rest } if enable_links => Some(vec![
                PostElement::link(*key, *link),
                PostElement::text(rest.as_str()),
            ]),
            Line::Issue { key, rest, .. } => Some(vec![PostElement::text(format!("{}{}", key, rest))]),
            Line::Blank => None,
        })
        .collect()
}

fn plural<'a>(n: usize, one: &'a str, many: &'a str) -> &'a str {
    if n == 1 {
        one
    } else {
        many
    }
}
