//! What a user action ended up doing

use serde::Serialize;
use std::fmt;

use crate::domain::{ListId, TaskId};
use crate::store::StoreError;

/// A user-initiated action on the board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "action")]
pub enum Action {
    Load,
    CreateList,
    CreateTask { list: ListId },
    ToggleExpansion { task: TaskId },
    EditTask { task: TaskId },
    DeleteTask { task: TaskId },
    CompleteTask { task: TaskId },
    AddSubtask { parent: TaskId },
    CompleteSubtask { parent: TaskId, subtask: TaskId },
    EditSubtask { parent: TaskId, subtask: TaskId },
    DeleteSubtask { parent: TaskId, subtask: TaskId },
    MoveTask { task: TaskId, list: ListId },
    MoveColumn { task: TaskId },
    Reorder { list: ListId },
}

impl Action {
    /// Short name used in logs and notices
    pub fn name(&self) -> &'static str {
        match self {
            Action::Load => "load",
            Action::CreateList => "create_list",
            Action::CreateTask { .. } => "create_task",
            Action::ToggleExpansion { .. } => "toggle_expansion",
            Action::EditTask { .. } => "edit_task",
            Action::DeleteTask { .. } => "delete_task",
            Action::CompleteTask { .. } => "complete_task",
            Action::AddSubtask { .. } => "add_subtask",
            Action::CompleteSubtask { .. } => "complete_subtask",
            Action::EditSubtask { .. } => "edit_subtask",
            Action::DeleteSubtask { .. } => "delete_subtask",
            Action::MoveTask { .. } => "move_task",
            Action::MoveColumn { .. } => "move_column",
            Action::Reorder { .. } => "reorder",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Why an action was refused or failed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notice {
    pub action: Action,
    pub reason: String,
}

impl Notice {
    pub fn new(action: Action, reason: impl Into<String>) -> Self {
        Self {
            action,
            reason: reason.into(),
        }
    }

    pub fn from_store(action: Action, err: &StoreError) -> Self {
        Self::new(action, err.reason())
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.action, self.reason)
    }
}

/// Result of one action
#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    /// The authoritative response was reconciled into the forest
    Applied,
    /// Nothing to do, e.g. a move past the last column
    Unchanged,
    /// Rejected locally before any network call
    Refused(Notice),
    /// The store call failed; the forest was left alone or refreshed
    Failed(Notice),
}

impl ActionOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, ActionOutcome::Applied)
    }

    /// True unless the action was refused or failed
    pub fn is_ok(&self) -> bool {
        self.notice().is_none()
    }

    pub fn notice(&self) -> Option<&Notice> {
        match self {
            ActionOutcome::Applied | ActionOutcome::Unchanged => None,
            ActionOutcome::Refused(notice) | ActionOutcome::Failed(notice) => Some(notice),
        }
    }
}
