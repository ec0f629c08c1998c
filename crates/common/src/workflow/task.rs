//! Task status moves
//!
//! Every status may move to every other: live statuses (TODO, IN_PROGRESS,
//! DONE) among themselves and into DELETED, DELETED back to any live status.
//! Only restore can fail. It returns a soft-deleted task to its prior status.

use crate::db::models::{AnimalTask, TaskStatus};
use crate::errors::{AppError, Result};

/// Resulting `(status, previous_status)` pair for a task move
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskTransition {
    pub status: TaskStatus,
    pub previous_status: Option<TaskStatus>,
}

impl TaskTransition {
    /// Move `task` to `to`, remembering the live status on soft delete
    pub fn to(task: &AnimalTask, to: TaskStatus) -> Self {
        let previous_status = match (task.status, to) {
            (TaskStatus::Deleted, TaskStatus::Deleted) => task.previous_status,
            (live, TaskStatus::Deleted) => Some(live),
            _ => None,
        };

        Self { status: to, previous_status }
    }

    /// Undo a soft delete
    pub fn restore(task: &AnimalTask) -> Result<Self> {
        if !task.is_deleted() {
            return Err(AppError::InvalidTransition {
                entity: "task",
                from: task.status.to_string(),
                to: "its previous status".to_string(),
            });
        }
        let target = task.previous_status.unwrap_or(TaskStatus::Todo);
        Ok(Self::to(task, target))
    }

    pub fn apply(self, task: &mut AnimalTask) {
        task.status = self.status;
        task.previous_status = self.previous_status;
    }
}
