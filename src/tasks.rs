//! Task completion lifecycle: `Pending → Completed`, never back.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::api::model::{Task, TaskRequest};
use crate::error::TaskError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Completed,
}

impl TaskStatus {
    pub fn of(task: &Task) -> Self {
        Self::from_completed(task.is_completed)
    }

    pub fn from_completed(is_completed: bool) -> Self {
        if is_completed {
            Self::Completed
        } else {
            Self::Pending
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Staying put is always allowed; the only move is `Pending → Completed`.
    pub fn can_transition_to(self, next: TaskStatus) -> bool {
        match (self, next) {
            (a, b) if a == b => true,
            (Self::Pending, Self::Completed) => true,
            _ => false,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

/// Build the update that sets `task`'s completion flag to `completed`.
///
/// `Ok(None)` when the flag already has that value. Reopening a completed
/// task is rejected.
pub fn completion_request(task: &Task, completed: bool) -> Result<Option<TaskRequest>, TaskError> {
    let current = TaskStatus::of(task);
    let next = TaskStatus::from_completed(completed);

    if !current.can_transition_to(next) {
        return Err(TaskError::CannotReopen { id: task.id });
    }
    if current == next {
        return Ok(None);
    }
    Ok(Some(TaskRequest::from_task(task, completed)))
}
