//! In-memory ordered task list.
//!
//! Insertion order is display order. The list is only changed through the
//! operations below; presentation code gets read access via [`TaskRegistry::list`].

use todosync_proto::task::{SyncStatus, Task, TaskId};

/// Returned when no task carries the requested id.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("task not found: {0}")]
pub struct NotFound(pub TaskId);

/// Ordered list of the tasks currently shown.
#[derive(Debug, Clone, Default)]
pub struct TaskRegistry {
    tasks: Vec<Task>,
}

impl TaskRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub const fn new() -> Self {
        Self { tasks: Vec::new() }
    }

    /// All tasks in display order.
    #[must_use]
    pub fn list(&self) -> &[Task] {
        &self.tasks
    }

    /// Number of tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Returns `true` if there are no tasks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Index of the task with `id`, if present.
    #[must_use]
    pub fn position(&self, id: &TaskId) -> Option<usize> {
        self.tasks.iter().position(|task| task.id == *id)
    }

    /// Looks up a task by id.
    ///
    /// # Errors
    ///
    /// Returns [`NotFound`] if no task has this id.
    pub fn find(&self, id: &TaskId) -> Result<&Task, NotFound> {
        self.tasks
            .iter()
            .find(|task| task.id == *id)
            .ok_or_else(|| NotFound(id.clone()))
    }

    /// Mutable lookup by id.
    ///
    /// # Errors
    ///
    /// Returns [`NotFound`] if no task has this id.
    pub fn find_mut(&mut self, id: &TaskId) -> Result<&mut Task, NotFound> {
        self.tasks
            .iter_mut()
            .find(|task| task.id == *id)
            .ok_or_else(|| NotFound(id.clone()))
    }

    /// Appends a task at the end of the list.
    pub fn push(&mut self, task: Task) {
        self.tasks.push(task);
    }

    /// Replaces the whole list.
    pub fn replace_all(&mut self, tasks: Vec<Task>) {
        self.tasks = tasks;
    }

    /// Replaces the task with `id` by `task`, keeping its position.
    ///
    /// The replacement may carry a different id; this is how a temporary
    /// task is promoted to its server copy.
    ///
    /// # Errors
    ///
    /// Returns [`NotFound`] if no task has this id.
    pub fn replace(&mut self, id: &TaskId, task: Task) -> Result<(), NotFound> {
        let slot = self.find_mut(id)?;
        *slot = task;
        Ok(())
    }

    /// Removes and returns the task with `id`.
    ///
    /// # Errors
    ///
    /// Returns [`NotFound`] if no task has this id.
    pub fn remove(&mut self, id: &TaskId) -> Result<Task, NotFound> {
        let index = self.position(id).ok_or_else(|| NotFound(id.clone()))?;
        Ok(self.tasks.remove(index))
    }

    /// Drops every task for which `keep` returns `false`.
    pub fn retain(&mut self, keep: impl FnMut(&Task) -> bool) {
        self.tasks.retain(keep);
    }

    /// Sets the replay bookkeeping fields of one task.
    ///
    /// # Errors
    ///
    /// Returns [`NotFound`] if no task has this id.
    pub fn set_sync_state(
        &mut self,
        id: &TaskId,
        status: SyncStatus,
        retries: u32,
    ) -> Result<(), NotFound> {
        let task = self.find_mut(id)?;
        task.sync_status = Some(status);
        task.retries = retries;
        Ok(())
    }
}
