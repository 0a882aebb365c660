//! Read-only summary over the task list.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use todosync_proto::task::{Task, checklist_progress};

/// Accepted local date-time layouts for due dates without an offset.
const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"];

/// Counts shown on the statistics screen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskStats {
    /// All tasks.
    pub total: usize,
    /// Completed tasks.
    pub completed: usize,
    /// Tasks not yet completed.
    pub remaining: usize,
    /// Tasks with a due date set.
    pub with_due_date: usize,
    /// Incomplete tasks whose due date has passed.
    pub overdue: usize,
    /// Mean checklist completion in percent over tasks that have a checklist.
    pub checklist_progress: u8,
}

impl TaskStats {
    /// Computes the summary as of `now`.
    ///
    /// Blank due dates count as none. Due dates that cannot be parsed count
    /// towards `with_due_date` but never towards `overdue`.
    #[must_use]
    pub fn from_tasks(tasks: &[Task], now: DateTime<Utc>) -> Self {
        let completed = tasks.iter().filter(|t| t.completed).count();
        let with_due_date = tasks
            .iter()
            .filter(|t| t.due_date.as_deref().is_some_and(|d| !d.trim().is_empty()))
            .count();
        let overdue = tasks
            .iter()
            .filter(|t| !t.completed)
            .filter_map(|t| t.due_date.as_deref().and_then(parse_due_date))
            .filter(|due| *due < now)
            .count();

        let progress: Vec<f64> = tasks
            .iter()
            .filter_map(|t| checklist_progress(&t.checklist))
            .collect();
        let checklist_progress = if progress.is_empty() {
            0
        } else {
            #[allow(clippy::cast_precision_loss)]
            let mean = progress.iter().sum::<f64>() / progress.len() as f64;
            rounded_percent(mean)
        };

        Self {
            total: tasks.len(),
            completed,
            remaining: tasks.len() - completed,
            with_due_date,
            overdue,
            checklist_progress,
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn rounded_percent(value: f64) -> u8 {
    value.round().clamp(0.0, 100.0) as u8
}

/// Parses a due date. Values without an offset are taken as UTC; a bare
/// date means midnight at its start.
#[must_use]
pub fn parse_due_date(input: &str) -> Option<DateTime<Utc>> {
    let input = input.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(input) {
        return Some(parsed.with_timezone(&Utc));
    }
    for format in NAIVE_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(input, format) {
            return Some(parsed.and_utc());
        }
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}
