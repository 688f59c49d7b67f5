//! Due-date helpers for the calendar and the daily summary.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use tracing::debug;

use crate::api::model::Task;

/// Parse a task due date.
///
/// Accepts RFC 3339 offset date-times and bare `YYYY-MM-DD` dates, which are
/// taken as midnight UTC. Anything else yields `None`.
pub fn parse_due_date(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt);
    }
    match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        Ok(date) => date
            .and_hms_opt(0, 0, 0)
            .map(|naive| naive.and_utc().fixed_offset()),
        Err(e) => {
            debug!(due_date = raw, error = %e, "Unparseable due date");
            None
        }
    }
}

/// Calendar day of a task's due date, in the date's own offset.
pub fn due_day(task: &Task) -> Option<NaiveDate> {
    task.due_date
        .as_deref()
        .and_then(parse_due_date)
        .map(|dt| dt.date_naive())
}

/// Tasks whose due date falls on `date`.
pub fn tasks_on(tasks: &[Task], date: NaiveDate) -> Vec<&Task> {
    tasks
        .iter()
        .filter(|t| due_day(t) == Some(date))
        .collect()
}

/// Tasks whose raw due string starts with `date` as `YYYY-MM-DD`.
///
/// Used for the daily summary, where the server's date is taken as written.
pub fn tasks_due_on_prefix(tasks: &[Task], date: NaiveDate) -> Vec<&Task> {
    let prefix = date.format("%Y-%m-%d").to_string();
    tasks
        .iter()
        .filter(|t| t.due_date.as_deref().is_some_and(|d| d.starts_with(&prefix)))
        .collect()
}

/// Today in UTC.
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Day markers for the calendar view.
///
/// A day with at least one completed task is marked completed; `pending`
/// only holds days where nothing is completed yet. The two sets are disjoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalendarMarks {
    pub completed: BTreeSet<NaiveDate>,
    pub pending: BTreeSet<NaiveDate>,
}

impl CalendarMarks {
    pub fn from_tasks(tasks: &[Task]) -> Self {
        let mut completed = BTreeSet::new();
        let mut with_tasks = BTreeSet::new();
        for task in tasks {
            let Some(day) = due_day(task) else { continue };
            with_tasks.insert(day);
            if task.is_completed {
                completed.insert(day);
            }
        }
        let pending = with_tasks.difference(&completed).copied().collect();
        Self { completed, pending }
    }

    /// Marker for `day`: `Some(true)` completed, `Some(false)` pending only.
    pub fn mark(&self, day: NaiveDate) -> Option<bool> {
        if self.completed.contains(&day) {
            Some(true)
        } else if self.pending.contains(&day) {
            Some(false)
        } else {
            None
        }
    }
}

/// Number of tasks per due day. Tasks without a parseable date are skipped.
pub fn count_by_date(tasks: &[Task]) -> BTreeMap<NaiveDate, usize> {
    let mut counts = BTreeMap::new();
    for day in tasks.iter().filter_map(due_day) {
        *counts.entry(day).or_insert(0) += 1;
    }
    counts
}

/// Reformat a due date with a `strftime` pattern, e.g. `%H:%M` or `%d.%m.%Y %H:%M`.
pub fn format_due(raw: &str, pattern: &str) -> Option<String> {
    parse_due_date(raw).map(|dt| dt.format(pattern).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: i64, due: Option<&str>, completed: bool) -> Task {
        Task {
            id,
            title: format!("t{id}"),
            description: None,
            due_date: due.map(str::to_string),
            is_completed: completed,
            category_id: None,
            stat_id: None,
            priority: None,
        }
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_offset_and_bare_dates() {
        let dt = parse_due_date("2025-06-23T10:30:00+03:00").unwrap();
        assert_eq!(dt.date_naive(), day(2025, 6, 23));
        assert_eq!(dt.offset().local_minus_utc(), 3 * 3600);

        let dt = parse_due_date("2025-06-23").unwrap();
        assert_eq!(dt.date_naive(), day(2025, 6, 23));
        assert_eq!(dt.offset().local_minus_utc(), 0);

        assert!(parse_due_date("tomorrow").is_none());
        assert!(parse_due_date("").is_none());
    }

    #[test]
    fn day_uses_the_dates_own_offset() {
        // 01:00 at +03:00 is still the 23rd locally, the 22nd in UTC.
        let tasks = vec![task(1, Some("2025-06-23T01:00:00+03:00"), false)];
        assert_eq!(tasks_on(&tasks, day(2025, 6, 23)).len(), 1);
        assert!(tasks_on(&tasks, day(2025, 6, 22)).is_empty());
    }

    #[test]
    fn filters_by_day() {
        let tasks = vec![
            task(1, Some("2025-06-23T09:00:00Z"), false),
            task(2, Some("2025-06-24"), false),
            task(3, None, false),
            task(4, Some("garbage"), true),
        ];
        let ids: Vec<i64> = tasks_on(&tasks, day(2025, 6, 23)).iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![1]);
    }

    #[test]
    fn prefix_selection_takes_raw_string() {
        let tasks = vec![
            task(1, Some("2025-06-23T23:30:00-05:00"), false),
            task(2, Some("2025-06-23"), true),
            task(3, Some("2025-06-24T00:00:00Z"), false),
            task(4, None, false),
        ];
        let ids: Vec<i64> = tasks_due_on_prefix(&tasks, day(2025, 6, 23))
            .iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn marks_and_counts() {
        let tasks = vec![
            task(1, Some("2025-06-23"), true),
            task(2, Some("2025-06-23T12:00:00Z"), false),
            task(3, Some("2025-06-25"), false),
            task(4, None, true),
        ];
        let marks = CalendarMarks::from_tasks(&tasks);
        // The 23rd has a completed and a pending task: marked completed only.
        assert!(marks.completed.contains(&day(2025, 6, 23)));
        assert!(!marks.pending.contains(&day(2025, 6, 23)));
        assert!(marks.pending.contains(&day(2025, 6, 25)));
        assert_eq!(marks.completed.len(), 1);
        assert_eq!(marks.pending.len(), 1);
        assert_eq!(marks.mark(day(2025, 6, 23)), Some(true));
        assert_eq!(marks.mark(day(2025, 6, 25)), Some(false));
        assert_eq!(marks.mark(day(2025, 6, 24)), None);

        let counts = count_by_date(&tasks);
        assert_eq!(counts.get(&day(2025, 6, 23)), Some(&2));
        assert_eq!(counts.get(&day(2025, 6, 25)), Some(&1));
        assert_eq!(counts.len(), 2);
    }

    #[test]
    fn formats_due_dates() {
        assert_eq!(
            format_due("2025-06-23T10:05:00+03:00", "%H:%M").as_deref(),
            Some("10:05")
        );
        assert_eq!(
            format_due("2025-06-23T10:05:00+03:00", "%d.%m.%Y %H:%M").as_deref(),
            Some("23.06.2025 10:05")
        );
        assert!(format_due("nope", "%H:%M").is_none());
    }
}
