//! Cron expression evaluation in a configured timezone
//!
//! Accepts classic 5-field crontab expressions (`MIN HOUR DOM MON DOW`, with
//! Sunday as 0 or 7) as well as the 6/7-field form with seconds understood by
//! the `cron` crate, and `@daily`-style shorthands.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use cron::Schedule;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("Invalid cron expression '{expr}': {reason}")]
    InvalidCron { expr: String, reason: String },

    #[error("Invalid timezone '{0}'")]
    InvalidTimezone(String),

    #[error("Cron expression '{0}' has no upcoming trigger")]
    NoUpcomingTrigger(String),
}

const WEEKDAYS: [&str; 7] = ["SUN", "MON", "TUE", "WED", "THU", "FRI", "SAT"];

/// Longest stretch of wall-clock time a DST transition can remove
const MAX_GAP_MINUTES: i64 = 24 * 60;

/// Parsed cron schedule
#[derive(Debug, Clone)]
pub struct CronSchedule {
    expr: String,
    schedule: Schedule,
}

impl CronSchedule {
    /// Expression as configured
    pub fn expression(&self) -> &str {
        &self.expr
    }
}

impl fmt::Display for CronSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expr)
    }
}

impl FromStr for CronSchedule {
    type Err = ScheduleError;

    fn from_str(expr: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: String| ScheduleError::InvalidCron {
            expr: expr.to_string(),
            reason,
        };

        let normalized = normalize(expr.trim()).map_err(invalid)?;
        let schedule = Schedule::from_str(&normalized).map_err(|e| invalid(e.to_string()))?;

        Ok(Self {
            expr: expr.trim().to_string(),
            schedule,
        })
    }
}

/// Parse an IANA timezone name
pub fn parse_timezone(name: &str) -> Result<Tz, ScheduleError> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| ScheduleError::InvalidTimezone(name.to_string()))
}

/// First trigger strictly after `after`, evaluated in `tz`.
///
/// Pure: the caller supplies "now" (or the last fired instant), so DST and
/// clock-drift cases can be tested without real time passing.
///
/// Fields are matched against local wall-clock time. A local time that a
/// spring-forward transition skips fires at the first instant after the gap;
/// a local time repeated by a fall-back transition fires once, at its first
/// occurrence.
pub fn next_trigger(schedule: &CronSchedule, tz: Tz, after: DateTime<Utc>) -> Option<DateTime<Tz>> {
    let local = after.with_timezone(&tz).naive_local();
    schedule
        .schedule
        .after(&Utc.from_utc_datetime(&local))
        .find_map(|candidate| {
            let naive = candidate.naive_utc();
            let instant = match tz.from_local_datetime(&naive).earliest() {
                Some(instant) => instant,
                None => after_gap(tz, naive)?,
            };
            (instant.with_timezone(&Utc) > after).then_some(instant)
        })
}

/// Triggers in the half-open interval `(after, until]`, at most `limit` of them.
pub fn triggers_between(
    schedule: &CronSchedule,
    tz: Tz,
    after: DateTime<Utc>,
    until: DateTime<Utc>,
    limit: usize,
) -> Vec<DateTime<Tz>> {
    let mut triggers = Vec::new();
    let mut from = after;
    while triggers.len() < limit {
        match next_trigger(schedule, tz, from) {
            Some(trigger) if trigger.with_timezone(&Utc) <= until => {
                from = trigger.with_timezone(&Utc);
                triggers.push(trigger);
            }
            _ => break,
        }
    }
    triggers
}

/// First existing local instant after `naive`, which falls in a DST gap.
fn after_gap(tz: Tz, naive: NaiveDateTime) -> Option<DateTime<Tz>> {
    let minute = naive.with_second(0)?.with_nanosecond(0)?;
    (1..=MAX_GAP_MINUTES)
        .map(|m| minute + Duration::minutes(m))
        .find_map(|t| tz.from_local_datetime(&t).earliest())
}

/// Rewrite a 5-field crontab expression into the seconds-first form.
fn normalize(expr: &str) -> Result<String, String> {
    if expr.is_empty() {
        return Err("expression is empty".to_string());
    }
    if expr.starts_with('@') {
        return Ok(expr.to_string());
    }

    let fields: Vec<&str> = expr.split_whitespace().collect();
    match fields.len() {
        5 => {
            let dow = crontab_weekdays(fields[4])?;
            Ok(format!(
                "0 {} {} {} {} {}",
                fields[0], fields[1], fields[2], fields[3], dow
            ))
        }
        6 | 7 => Ok(fields.join(" ")),
        n => Err(format!("expected 5, 6 or 7 fields, found {}", n)),
    }
}

/// Translate numeric crontab weekdays (0-7, Sunday = 0 or 7) into names, which
/// the `cron` crate reads unambiguously.
fn crontab_weekdays(field: &str) -> Result<String, String> {
    let mut parts = Vec::new();
    for item in field.split(',') {
        let (range, step) = match item.split_once('/') {
            Some((range, step)) => (range, Some(step)),
            None => (item, None),
        };

        let mut translated = match range.split_once('-') {
            Some((start, end)) => {
                let start = weekday_name(start)?;
                // 7 closes a range on Sunday, which sorts first for the cron crate
                if end.trim() == "7" {
                    if start == "SUN" {
                        "*".to_string()
                    } else {
                        format!("{}-SAT,SUN", start)
                    }
                } else {
                    format!("{}-{}", start, weekday_name(end)?)
                }
            }
            None => weekday_name(range)?,
        };

        if let Some(step) = step {
            if translated.contains(',') {
                return Err(format!("unsupported weekday step '{}'", item));
            }
            translated = format!("{}/{}", translated, step);
        }
        parts.push(translated);
    }
    Ok(parts.join(","))
}

fn weekday_name(token: &str) -> Result<String, String> {
    let token = token.trim();
    if token == "*" || token == "?" || token.chars().all(|c| c.is_ascii_alphabetic()) {
        return Ok(token.to_string());
    }
    match token.parse::<usize>() {
        Ok(n) if n <= 7 => Ok(WEEKDAYS[n % 7].to_string()),
        _ => Err(format!("invalid day of week '{}'", token)),
    }
}
