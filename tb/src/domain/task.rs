//! Task and subtask records
//!
//! A `Task` is the wire shape the remote store sends back, with subtasks held
//! behind `Arc` so unaffected subtrees can be shared between forest versions.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use super::{ListId, TaskId};

/// Tasks may live at depth 0, 1 and 2; nothing is ever created at this depth
pub const MAX_TASK_DEPTH: usize = 3;

fn default_expanded() -> bool {
    true
}

/// A task at any level of the tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Store-assigned identity (absent until first persisted)
    #[serde(default)]
    pub id: Option<TaskId>,

    pub title: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub completed: bool,

    /// List this task belongs to (the store sends it for subtasks too)
    #[serde(default)]
    pub list_id: Option<ListId>,

    /// Parent task for depth >= 1; normalised locally on every graft
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<TaskId>,

    /// UI-only expansion state
    #[serde(default = "default_expanded")]
    pub is_expanded: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<NaiveDateTime>,

    /// Ordered children; the store omits the field when there are none
    #[serde(default)]
    pub subtasks: Vec<Arc<Task>>,
}

impl Task {
    /// Create a detached task that has not been persisted yet
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: None,
            title: title.into(),
            description: None,
            completed: false,
            list_id: None,
            parent_id: None,
            is_expanded: true,
            created_at: None,
            subtasks: Vec::new(),
        }
    }

    /// Builder-style id assignment (mostly for tests and fixtures)
    pub fn with_id(mut self, id: u64) -> Self {
        self.id = Some(TaskId(id));
        self
    }

    /// Builder-style child append; the child's parent link is set to this task
    pub fn with_subtask(mut self, child: Task) -> Self {
        let child = Task { parent_id: self.id, ..child };
        self.subtasks.push(Arc::new(child));
        self
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    pub fn has_subtasks(&self) -> bool {
        !self.subtasks.is_empty()
    }

    /// Completed/total over direct children, `None` for a childless task
    pub fn completion_fraction(&self) -> Option<CompletionFraction> {
        if self.subtasks.is_empty() {
            return None;
        }
        Some(CompletionFraction {
            completed: self.subtasks.iter().filter(|t| t.completed).count(),
            total: self.subtasks.len(),
        })
    }

    /// Find a direct child by id
    pub fn child(&self, id: TaskId) -> Option<&Arc<Task>> {
        self.subtasks.iter().find(|t| t.id == Some(id))
    }

    /// True when `id` is this task or any of its descendants
    pub fn contains(&self, id: TaskId) -> bool {
        self.id == Some(id) || self.subtasks.iter().any(|c| c.contains(id))
    }

    /// Number of nodes in this subtree, including the task itself
    pub fn subtree_len(&self) -> usize {
        1 + self.subtasks.iter().map(|t| t.subtree_len()).sum::<usize>()
    }

    /// Return `task` with `parent_id` set and every descendant's parent link
    /// pointing at its containing task
    ///
    /// Nodes whose links are already correct are shared, not copied.
    pub fn linked(task: &Arc<Task>, parent_id: Option<TaskId>) -> Arc<Task> {
        let subtasks: Vec<Arc<Task>> = task.subtasks.iter().map(|c| Task::linked(c, task.id)).collect();
        let children_shared = subtasks.iter().zip(&task.subtasks).all(|(new, old)| Arc::ptr_eq(new, old));
        if task.parent_id == parent_id && children_shared {
            return Arc::clone(task);
        }
        Arc::new(Task {
            parent_id,
            subtasks,
            ..(**task).clone()
        })
    }
}

/// Completed-children over total-children, displayed as `1/3`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionFraction {
    pub completed: usize,
    pub total: usize,
}

impl fmt::Display for CompletionFraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.completed, self.total)
    }
}

/// Field-level update merged into an existing task
///
/// `None` leaves the field as it is. Identity and parent link are never
/// patched; they belong to the tree structure.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub completed: Option<bool>,
    pub is_expanded: Option<bool>,
    pub list_id: Option<ListId>,
    pub created_at: Option<NaiveDateTime>,
    pub subtasks: Option<Vec<Arc<Task>>>,
}

impl TaskPatch {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    pub fn completed(completed: bool) -> Self {
        Self {
            completed: Some(completed),
            ..Default::default()
        }
    }

    pub fn expanded(expanded: bool) -> Self {
        Self {
            is_expanded: Some(expanded),
            ..Default::default()
        }
    }

    /// Patch carrying every field of a store payload, subtasks included
    pub fn canonical(task: &Task) -> Self {
        Self {
            title: Some(task.title.clone()),
            description: Some(task.description.clone()),
            completed: Some(task.completed),
            is_expanded: Some(task.is_expanded),
            list_id: task.list_id,
            created_at: task.created_at,
            subtasks: Some(task.subtasks.clone()),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Produce a new task with this patch merged in
    pub fn apply_to(&self, task: &Task) -> Task {
        let mut next = task.clone();
        if let Some(title) = &self.title {
            next.title = title.clone();
        }
        if let Some(description) = &self.description {
            next.description = description.clone();
        }
        if let Some(completed) = self.completed {
            next.completed = completed;
        }
        if let Some(expanded) = self.is_expanded {
            next.is_expanded = expanded;
        }
        if let Some(list_id) = self.list_id {
            next.list_id = Some(list_id);
        }
        if let Some(created_at) = self.created_at {
            next.created_at = Some(created_at);
        }
        if let Some(subtasks) = &self.subtasks {
            next.subtasks = subtasks.iter().map(|c| Task::linked(c, next.id)).collect();
        }
        next
    }
}
