//! Tree locate and tree mutate operations over the board forest
//!
//! The forest is treated as an immutable value. [`locate`] reads it without
//! building anything new; [`mutate`] returns a new forest and shares every
//! subtree it did not touch with the old one.

pub mod locate;
pub mod mutate;

use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use crate::domain::{ListId, ListKind, Task, TaskId, TaskList};

pub use locate::{can_add_child, depth_of, find_task, owning_list};
pub use mutate::{apply_fields, insert_child, insert_root, remove_subtree, reorder_root, replace_children};

/// Every list on the board and the task trees under them
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Forest {
    lists: Vec<TaskList>,
}

impl Forest {
    /// Build a forest from lists, normalising parent links
    pub fn new(lists: Vec<TaskList>) -> Self {
        Self {
            lists: lists.into_iter().map(TaskList::linked).collect(),
        }
    }

    /// Arrange store lists into one column per role, in role order
    ///
    /// The first list whose title matches a role wins; lists matching no role
    /// are dropped. Roles without a list get a placeholder and are reported
    /// back so the caller can create them.
    pub fn from_store_lists(lists: Vec<TaskList>) -> (Self, Vec<ListKind>) {
        debug!(list_count = lists.len(), "from_store_lists: called");
        let mut slots: Vec<Option<TaskList>> = vec![None, None, None];
        for list in lists {
            match list.kind() {
                Some(kind) if slots[kind.index()].is_none() => slots[kind.index()] = Some(list),
                Some(kind) => debug!(%kind, id = ?list.id, "from_store_lists: duplicate list for role, ignoring"),
                None => debug!(title = %list.title, "from_store_lists: list matches no role, ignoring"),
            }
        }

        let mut missing = Vec::new();
        let arranged = ListKind::ALL
            .into_iter()
            .zip(slots)
            .map(|(kind, slot)| {
                slot.unwrap_or_else(|| {
                    missing.push(kind);
                    TaskList::placeholder(kind)
                })
            })
            .collect();

        (Self::new(arranged), missing)
    }

    pub fn lists(&self) -> &[TaskList] {
        &self.lists
    }

    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }

    /// Look up a list by identity
    pub fn list(&self, id: ListId) -> Option<&TaskList> {
        self.lists.iter().find(|l| l.id == Some(id))
    }

    /// Look up a list by role
    pub fn list_by_kind(&self, kind: ListKind) -> Option<&TaskList> {
        self.lists.iter().find(|l| l.kind() == Some(kind))
    }

    /// Column position of a list
    pub fn list_index(&self, id: ListId) -> Option<usize> {
        self.lists.iter().position(|l| l.id == Some(id))
    }

    /// Replace the list at the same role (or append it if the role is new)
    pub fn with_list(&self, list: TaskList) -> Self {
        let mut lists = self.lists.clone();
        let list = list.linked();
        match lists.iter().position(|l| l.kind().is_some() && l.kind() == list.kind()) {
            Some(index) => lists[index] = list,
            None => lists.push(list),
        }
        Self { lists }
    }

    /// Every task in depth-first order
    pub fn tasks(&self) -> Vec<&Arc<Task>> {
        fn walk<'a>(tasks: &'a [Arc<Task>], out: &mut Vec<&'a Arc<Task>>) {
            for task in tasks {
                out.push(task);
                walk(&task.subtasks, out);
            }
        }

        let mut out = Vec::new();
        for list in &self.lists {
            walk(&list.tasks, &mut out);
        }
        out
    }

    /// Identities of every persisted task, depth-first
    pub fn task_ids(&self) -> Vec<TaskId> {
        self.tasks().into_iter().filter_map(|t| t.id).collect()
    }

    pub fn task_count(&self) -> usize {
        self.lists
            .iter()
            .flat_map(|l| l.tasks.iter())
            .map(|t| t.subtree_len())
            .sum()
    }
}
