//! Task model shared by the client core and the mock backend.
//!
//! Field names follow the REST collection's camelCase JSON. Client-only sync
//! bookkeeping (`offline`, `syncStatus`, `retries`) is omitted from the JSON
//! form while it carries its default value, so synced tasks serialize exactly
//! as the server sent them.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Deserializer, Serialize};

/// Prefix that marks a locally generated, not yet acknowledged task id.
pub const TEMPORARY_ID_PREFIX: &str = "temp-";

/// Last millisecond value handed out by [`TaskId::temporary`].
static LAST_TEMPORARY_MS: AtomicU64 = AtomicU64::new(0);

/// Identifier of a task.
///
/// Permanent ids are assigned by the remote store and may be numbers or
/// strings; the JSON form is preserved on the way back out. Temporary ids are
/// strings of the form `temp-<millis>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TaskId {
    /// Numeric id (e.g. an auto-increment key).
    Number(u64),
    /// String id (UUIDs, slugs, temporary ids).
    Text(String),
}

impl TaskId {
    /// Mints a new temporary id from the current wall clock.
    ///
    /// Ids minted within one process are strictly increasing: two calls in
    /// the same millisecond get consecutive values.
    #[must_use]
    pub fn temporary() -> Self {
        let now = u64::try_from(
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis(),
        )
        .unwrap_or(u64::MAX);
        let previous = LAST_TEMPORARY_MS
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last.saturating_add(1)))
            })
            .unwrap_or_else(|last| last);
        Self::temporary_at(now.max(previous.saturating_add(1)))
    }

    /// Builds the temporary id for a given millisecond timestamp.
    #[must_use]
    pub fn temporary_at(millis: u64) -> Self {
        Self::Text(format!("{TEMPORARY_ID_PREFIX}{millis}"))
    }

    /// Returns `true` for locally generated ids the server has never seen.
    #[must_use]
    pub fn is_temporary(&self) -> bool {
        matches!(self, Self::Text(s) if s.starts_with(TEMPORARY_ID_PREFIX))
    }

    /// Parses user input: all-digit strings become numeric ids.
    #[must_use]
    pub fn parse(input: &str) -> Self {
        input
            .parse::<u64>()
            .map_or_else(|_| Self::Text(input.to_string()), Self::Number)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<u64> for TaskId {
    fn from(value: u64) -> Self {
        Self::Number(value)
    }
}

/// Replay state of a task whose creation went through the offline queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    /// Queued, not attempted yet.
    Pending,
    /// A replay attempt is in flight.
    Syncing,
    /// The last replay attempt failed.
    Error,
    /// Acknowledged by the remote store.
    Synced,
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Syncing => write!(f, "syncing"),
            Self::Error => write!(f, "error"),
            Self::Synced => write!(f, "synced"),
        }
    }
}

/// One sub-item of a task's checklist. Identified only by its position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    /// Display text.
    pub text: String,
    /// Whether the sub-item is ticked.
    #[serde(default)]
    pub done: bool,
}

impl ChecklistItem {
    /// Creates an unticked checklist item.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            done: false,
        }
    }
}

/// Percentage of ticked items, or `None` for an empty checklist.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn checklist_progress(items: &[ChecklistItem]) -> Option<f64> {
    if items.is_empty() {
        return None;
    }
    let done = items.iter().filter(|item| item.done).count();
    Some(done as f64 / items.len() as f64 * 100.0)
}

/// Creation payload, exactly as submitted to `POST /todos`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDraft {
    /// Display text.
    pub text: String,
    /// Completion flag, `false` for fresh drafts.
    #[serde(default)]
    pub completed: bool,
    /// Optional due date as entered.
    #[serde(default)]
    pub due_date: Option<String>,
    /// Free-form description.
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    /// Checklist at submission time.
    #[serde(default, deserialize_with = "null_as_default")]
    pub checklist: Vec<ChecklistItem>,
}

impl TaskDraft {
    /// Creates a draft with the given text and all other fields defaulted.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            completed: false,
            due_date: None,
            description: String::new(),
            checklist: Vec::new(),
        }
    }

    /// Sets the due date.
    #[must_use]
    pub fn with_due_date(mut self, due_date: impl Into<String>) -> Self {
        self.due_date = Some(due_date.into());
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the checklist.
    #[must_use]
    pub fn with_checklist(mut self, checklist: Vec<ChecklistItem>) -> Self {
        self.checklist = checklist;
        self
    }
}

/// A to-do item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Permanent or temporary id.
    pub id: TaskId,
    /// Display text.
    pub text: String,
    /// Completion flag.
    #[serde(default)]
    pub completed: bool,
    /// Optional due date string.
    #[serde(default)]
    pub due_date: Option<String>,
    /// Free-form description.
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    /// Ordered checklist owned by this task.
    #[serde(default, deserialize_with = "null_as_default")]
    pub checklist: Vec<ChecklistItem>,
    /// `true` while the creation has not been acknowledged.
    #[serde(default, skip_serializing_if = "is_false")]
    pub offline: bool,
    /// Replay state, present once the task went through the offline queue.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_status: Option<SyncStatus>,
    /// Failed replay attempts for this task's creation.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub retries: u32,
}

impl Task {
    /// Builds a synced task from a draft and an id.
    #[must_use]
    pub fn from_draft(id: TaskId, draft: TaskDraft) -> Self {
        Self {
            id,
            text: draft.text,
            completed: draft.completed,
            due_date: draft.due_date,
            description: draft.description,
            checklist: draft.checklist,
            offline: false,
            sync_status: None,
            retries: 0,
        }
    }

    /// Builds the optimistic offline copy of a draft under a temporary id.
    #[must_use]
    pub fn offline(id: TaskId, draft: TaskDraft) -> Self {
        Self {
            offline: true,
            sync_status: Some(SyncStatus::Pending),
            ..Self::from_draft(id, draft)
        }
    }

    /// Returns `true` if this task still carries a temporary id.
    #[must_use]
    pub fn is_temporary(&self) -> bool {
        self.id.is_temporary()
    }

    /// Returns a copy with `completed` flipped and everything else untouched.
    #[must_use]
    pub fn toggled(&self) -> Self {
        Self {
            completed: !self.completed,
            ..self.clone()
        }
    }

    /// Extracts the user-editable content as a creation payload.
    #[must_use]
    pub fn to_draft(&self) -> TaskDraft {
        TaskDraft {
            text: self.text.clone(),
            completed: self.completed,
            due_date: self.due_date.clone(),
            description: self.description.clone(),
            checklist: self.checklist.clone(),
        }
    }

    /// Marks a server-returned task as the acknowledged form of a queued one.
    #[must_use]
    pub fn into_synced(mut self) -> Self {
        self.offline = false;
        self.sync_status = Some(SyncStatus::Synced);
        self
    }
}

/// Display filter over a task list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Filter {
    /// Every task.
    #[default]
    All,
    /// Tasks not yet completed.
    Active,
    /// Completed tasks.
    Done,
}

impl Filter {
    /// Returns the tasks matching this filter, in list order.
    #[must_use]
    pub fn apply<'a>(self, tasks: &'a [Task]) -> Vec<&'a Task> {
        tasks
            .iter()
            .filter(|task| match self {
                Self::All => true,
                Self::Active => !task.completed,
                Self::Done => task.completed,
            })
            .collect()
    }
}

impl FromStr for Filter {
    type Err = std::convert::Infallible;

    /// Unknown names select [`Filter::All`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "active" => Self::Active,
            "done" => Self::Done,
            _ => Self::All,
        })
    }
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_false(value: &bool) -> bool {
    !*value
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_zero(value: &u32) -> bool {
    *value == 0
}

/// Treats an explicit JSON `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
