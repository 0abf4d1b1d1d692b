//! Forest deltas derived from one authoritative response

use tracing::debug;

use crate::domain::{ListId, Task, TaskId, TaskPatch};
use crate::tree::{self, Forest, mutate};

/// A structural change to the forest
#[derive(Debug, Clone, PartialEq)]
pub enum StructuralEdit {
    /// Append a root task to a list
    InsertRoot { list: ListId, task: Task },
    /// Append a child under a parent task (expands the parent)
    InsertChild { parent: TaskId, child: Task },
    /// Remove a task and its descendants wherever it appears
    Remove(TaskId),
    /// Swap one direct child of `parent` for its canonical form
    ReplaceChild { parent: TaskId, child: Task },
    /// Filter one direct child out of `parent`
    RemoveChild { parent: TaskId, child: TaskId },
    /// Reorder the root sequence of one list
    Reorder { list: ListId, from: usize, to: usize },
}

/// Field patches plus structural edits, applied as one step
///
/// Patches always land before structural edits so a node created by the
/// same response is in place before anything else refers to it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForestDelta {
    patches: Vec<(TaskId, TaskPatch)>,
    edits: Vec<StructuralEdit>,
}

impl ForestDelta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn patch(mut self, id: TaskId, patch: TaskPatch) -> Self {
        if !patch.is_empty() {
            self.patches.push((id, patch));
        }
        self
    }

    pub fn edit(mut self, edit: StructuralEdit) -> Self {
        self.edits.push(edit);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.patches.is_empty() && self.edits.is_empty()
    }

    /// Produce the next forest from `forest`
    pub fn apply(&self, forest: &Forest) -> Forest {
        debug!(
            patches = self.patches.len(),
            edits = self.edits.len(),
            "ForestDelta::apply: called"
        );
        let patched = self
            .patches
            .iter()
            .fold(forest.clone(), |acc, (id, patch)| tree::apply_fields(&acc, *id, patch));

        self.edits.iter().fold(patched, |acc, edit| match edit {
            StructuralEdit::InsertRoot { list, task } => tree::insert_root(&acc, *list, task.clone()),
            StructuralEdit::InsertChild { parent, child } => tree::insert_child(&acc, *parent, child.clone()),
            StructuralEdit::Remove(id) => tree::remove_subtree(&acc, *id),
            StructuralEdit::ReplaceChild { parent, child } => match child.id {
                Some(child_id) => {
                    tree::replace_children(&acc, *parent, child_id, mutate::swap_child(child.clone()))
                }
                None => {
                    debug!(%parent, "ForestDelta::apply: replacement child has no id, skipping");
                    acc
                }
            },
            StructuralEdit::RemoveChild { parent, child } => {
                tree::replace_children(&acc, *parent, *child, mutate::without_child)
            }
            StructuralEdit::Reorder { list, from, to } => tree::reorder_root(&acc, *list, *from, *to),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{find_task, fixtures};

    #[test]
    fn test_empty_delta_is_identity() {
        let forest = fixtures::board();
        let delta = ForestDelta::new().patch(TaskId(1), TaskPatch::default());
        assert!(delta.is_empty());
        assert_eq!(delta.apply(&forest), forest);
    }

    #[test]
    fn test_patch_lands_before_structural_edit() {
        let forest = fixtures::board();
        let delta = ForestDelta::new()
            .edit(StructuralEdit::InsertChild {
                parent: TaskId(4),
                child: Task::new("Proofread").with_id(20),
            })
            .patch(TaskId(4), TaskPatch::expanded(false));

        let next = delta.apply(&forest);
        let review = find_task(&next, TaskId(4)).unwrap();
        // insert_child expands the parent after the patch collapsed it
        assert!(review.is_expanded);
        assert_eq!(review.subtasks.len(), 1);
        assert_eq!(review.subtasks[0].parent_id, Some(TaskId(4)));
    }

    #[test]
    fn test_replace_and_remove_child() {
        let forest = fixtures::board();
        let mut canonical = Task::new("Review v2").with_id(4);
        canonical.completed = true;

        let next = ForestDelta::new()
            .edit(StructuralEdit::ReplaceChild {
                parent: TaskId(1),
                child: canonical,
            })
            .edit(StructuralEdit::RemoveChild {
                parent: TaskId(1),
                child: TaskId(2),
            })
            .apply(&forest);

        let root = find_task(&next, TaskId(1)).unwrap();
        assert_eq!(root.subtasks.len(), 1);
        assert_eq!(root.subtasks[0].title, "Review v2");
        assert!(root.subtasks[0].completed);
        assert!(find_task(&next, TaskId(3)).is_none());
    }

    #[test]
    fn test_remove_then_insert_root_keeps_ids_unique() {
        let forest = fixtures::board();
        let done = forest.lists()[2].id.unwrap();
        let next = ForestDelta::new()
            .edit(StructuralEdit::Remove(TaskId(1)))
            .edit(StructuralEdit::InsertRoot {
                list: done,
                task: Task::new("Plan launch").with_id(1),
            })
            .apply(&forest);

        let ids = next.task_ids();
        assert_eq!(ids.iter().filter(|id| **id == TaskId(1)).count(), 1);
        assert!(next.lists()[0].tasks.is_empty());
        assert_eq!(next.lists()[2].tasks.len(), 2);
    }
}
