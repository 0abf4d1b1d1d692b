//! Pure edits that return a new forest
//!
//! Only the path from an edited node up to its list is rebuilt; every other
//! `Arc<Task>` is carried over as-is. An edit whose target cannot be found
//! returns an unchanged copy of the input.

use std::sync::Arc;
use tracing::{debug, warn};

use super::{Forest, locate};
use crate::domain::{ListId, MAX_TASK_DEPTH, Task, TaskId, TaskPatch};

/// Rebuild `tasks` with the first node matching `id` replaced by `edit(node)`
///
/// Returns `None` when nothing matched so the caller can keep its sequence.
fn edit_first(tasks: &[Arc<Task>], id: TaskId, edit: &dyn Fn(&Arc<Task>) -> Arc<Task>) -> Option<Vec<Arc<Task>>> {
    for (index, task) in tasks.iter().enumerate() {
        if task.id == Some(id) {
            let mut next = tasks.to_vec();
            next[index] = edit(task);
            return Some(next);
        }
        if let Some(children) = edit_first(&task.subtasks, id, edit) {
            let mut next = tasks.to_vec();
            next[index] = Arc::new(Task {
                subtasks: children,
                ..(**task).clone()
            });
            return Some(next);
        }
    }
    None
}

fn edit_forest(forest: &Forest, id: TaskId, edit: &dyn Fn(&Arc<Task>) -> Arc<Task>) -> Option<Forest> {
    for (index, list) in forest.lists.iter().enumerate() {
        if let Some(tasks) = edit_first(&list.tasks, id, edit) {
            let mut lists = forest.lists.clone();
            lists[index].tasks = tasks;
            return Some(Forest { lists });
        }
    }
    None
}

/// Drop every node matching `id` along with its descendants
fn remove_all(tasks: &[Arc<Task>], id: TaskId) -> Option<Vec<Arc<Task>>> {
    let mut changed = false;
    let mut next = Vec::with_capacity(tasks.len());
    for task in tasks {
        if task.id == Some(id) {
            changed = true;
            continue;
        }
        match remove_all(&task.subtasks, id) {
            Some(children) => {
                changed = true;
                next.push(Arc::new(Task {
                    subtasks: children,
                    ..(**task).clone()
                }));
            }
            None => next.push(Arc::clone(task)),
        }
    }
    changed.then_some(next)
}

/// Cut `task`'s descendants that would land at or below the depth limit
/// when `task` sits at `depth`
fn within_depth(task: &Arc<Task>, depth: usize) -> Arc<Task> {
    if task.subtasks.is_empty() {
        return Arc::clone(task);
    }
    if depth + 1 >= MAX_TASK_DEPTH {
        warn!(task_id = ?task.id, depth, dropped = task.subtasks.len(), "within_depth: trimming children past depth limit");
        return Arc::new(Task {
            subtasks: Vec::new(),
            ..(**task).clone()
        });
    }
    let subtasks: Vec<Arc<Task>> = task.subtasks.iter().map(|c| within_depth(c, depth + 1)).collect();
    if subtasks.iter().zip(&task.subtasks).all(|(new, old)| Arc::ptr_eq(new, old)) {
        return Arc::clone(task);
    }
    Arc::new(Task {
        subtasks,
        ..(**task).clone()
    })
}

/// Merge `patch` into the task matching `id`
pub fn apply_fields(forest: &Forest, id: TaskId, patch: &TaskPatch) -> Forest {
    debug!(%id, "apply_fields: called");
    edit_forest(forest, id, &|task| Arc::new(patch.apply_to(task))).unwrap_or_else(|| {
        debug!(%id, "apply_fields: task not found, forest unchanged");
        forest.clone()
    })
}

/// Append `child` to the children of `parent_id` and expand the parent
///
/// A parent already at the deepest level takes no children, and any
/// descendants the child brings along past the limit are trimmed. A node
/// already carrying the child's identity is taken out first so identities
/// stay unique.
pub fn insert_child(forest: &Forest, parent_id: TaskId, child: Task) -> Forest {
    debug!(%parent_id, child_id = ?child.id, "insert_child: called");
    let Some(parent) = locate::find_task(forest, parent_id) else {
        debug!(%parent_id, "insert_child: parent not found, forest unchanged");
        return forest.clone();
    };
    let child_depth = locate::depth_of(forest, parent) + 1;
    if child_depth >= MAX_TASK_DEPTH {
        warn!(%parent_id, child_depth, "insert_child: parent at depth limit, forest unchanged");
        return forest.clone();
    }

    let base = match child.id {
        Some(child_id) => match locate::find_task(forest, child_id) {
            Some(existing) if existing.contains(parent_id) => {
                warn!(%parent_id, %child_id, "insert_child: parent lies inside the child's subtree, forest unchanged");
                return forest.clone();
            }
            Some(_) => remove_subtree(forest, child_id),
            None => forest.clone(),
        },
        None => forest.clone(),
    };

    let child = within_depth(&Arc::new(child), child_depth);
    edit_forest(&base, parent_id, &|parent| {
        let mut subtasks = parent.subtasks.clone();
        subtasks.push(Task::linked(&child, parent.id));
        Arc::new(Task {
            is_expanded: true,
            subtasks,
            ..(**parent).clone()
        })
    })
    .unwrap_or(base)
}

/// Remove the node matching `id` and all of its descendants
///
/// Removing an id that is not present is a no-op.
pub fn remove_subtree(forest: &Forest, id: TaskId) -> Forest {
    debug!(%id, "remove_subtree: called");
    let mut changed = false;
    let lists = forest
        .lists
        .iter()
        .map(|list| match remove_all(&list.tasks, id) {
            Some(tasks) => {
                changed = true;
                let mut list = list.clone();
                list.tasks = tasks;
                list
            }
            None => list.clone(),
        })
        .collect();

    if !changed {
        debug!(%id, "remove_subtree: task not found, forest unchanged");
    }
    Forest { lists }
}

/// Apply `transform` to the direct children of `parent_id` only
///
/// `child_id` is handed to the transform so it can filter or swap a single
/// child. Replacement children get their parent links normalised.
pub fn replace_children<F>(forest: &Forest, parent_id: TaskId, child_id: TaskId, transform: F) -> Forest
where
    F: Fn(&[Arc<Task>], TaskId) -> Vec<Arc<Task>>,
{
    debug!(%parent_id, %child_id, "replace_children: called");
    edit_forest(forest, parent_id, &|parent| {
        let subtasks = transform(&parent.subtasks, child_id)
            .iter()
            .map(|c| Task::linked(c, parent.id))
            .collect();
        Arc::new(Task {
            subtasks,
            ..(**parent).clone()
        })
    })
    .unwrap_or_else(|| {
        debug!(%parent_id, "replace_children: parent not found, forest unchanged");
        forest.clone()
    })
}

/// Child transform that filters out `child_id`
pub fn without_child(children: &[Arc<Task>], child_id: TaskId) -> Vec<Arc<Task>> {
    children.iter().filter(|c| c.id != Some(child_id)).cloned().collect()
}

/// Child transform that swaps `child_id` for `replacement`, keeping position
pub fn swap_child(replacement: Task) -> impl Fn(&[Arc<Task>], TaskId) -> Vec<Arc<Task>> {
    let replacement = Arc::new(replacement);
    move |children, child_id| {
        children
            .iter()
            .map(|c| if c.id == Some(child_id) { Arc::clone(&replacement) } else { Arc::clone(c) })
            .collect()
    }
}

/// Append a root task to the list `list_id`
///
/// A node already carrying the task's identity anywhere on the board is
/// removed first.
pub fn insert_root(forest: &Forest, list_id: ListId, task: Task) -> Forest {
    debug!(%list_id, task_id = ?task.id, "insert_root: called");
    let Some(index) = forest.list_index(list_id) else {
        debug!(%list_id, "insert_root: list not found, forest unchanged");
        return forest.clone();
    };

    let mut next = match task.id {
        Some(id) => remove_subtree(forest, id),
        None => forest.clone(),
    };
    let task = Task {
        list_id: Some(list_id),
        ..task
    };
    next.lists[index].tasks.push(Task::linked(&Arc::new(task), None));
    next
}

/// Move the root task at `from` to position `to` within one list
///
/// `to` is clamped to the end of the list; an out-of-range `from` is a no-op.
pub fn reorder_root(forest: &Forest, list_id: ListId, from: usize, to: usize) -> Forest {
    debug!(%list_id, from, to, "reorder_root: called");
    let Some(index) = forest.list_index(list_id) else {
        debug!(%list_id, "reorder_root: list not found, forest unchanged");
        return forest.clone();
    };

    let len = forest.lists[index].tasks.len();
    if from >= len {
        debug!(from, len, "reorder_root: source index out of range");
        return forest.clone();
    }

    let mut next = forest.clone();
    let tasks = &mut next.lists[index].tasks;
    let task = tasks.remove(from);
    let to = to.min(tasks.len());
    tasks.insert(to, task);
    next
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::domain::MAX_TASK_DEPTH;
    use crate::tree::{fixtures, locate};
    use proptest::prelude::*;
    use std::collections::HashSet;

    #[derive(Debug, Clone)]
    enum Op {
        AddChild { parent: u64, id: u64 },
        AddRoot { list: u64, id: u64 },
        Remove { id: u64 },
        Patch { id: u64, completed: bool },
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (1u64..30, 1u64..30).prop_map(|(parent, id)| Op::AddChild { parent, id }),
            (10u64..13, 1u64..30).prop_map(|(list, id)| Op::AddRoot { list, id }),
            (1u64..30).prop_map(|id| Op::Remove { id }),
            (1u64..30, any::<bool>()).prop_map(|(id, completed)| Op::Patch { id, completed }),
        ]
    }

    /// Child inserts go through the same depth check the controller runs
    fn run(ops: &[Op]) -> Forest {
        ops.iter().fold(fixtures::board(), |forest, op| match op {
            Op::AddChild { parent, id } if locate::can_add_child(&forest, TaskId(*parent)) => {
                insert_child(&forest, TaskId(*parent), Task::new("child").with_id(*id))
            }
            Op::AddChild { .. } => forest,
            Op::AddRoot { list, id } => insert_root(&forest, ListId(*list), Task::new("root").with_id(*id)),
            Op::Remove { id } => remove_subtree(&forest, TaskId(*id)),
            Op::Patch { id, completed } => apply_fields(&forest, TaskId(*id), &TaskPatch::completed(*completed)),
        })
    }

    proptest! {
        #[test]
        fn prop_depth_never_reaches_limit(ops in prop::collection::vec(op(), 0..40)) {
            let forest = run(&ops);
            for task in forest.tasks() {
                prop_assert!(locate::depth_of(&forest, task) < MAX_TASK_DEPTH);
            }
        }

        #[test]
        fn prop_identities_unique(ops in prop::collection::vec(op(), 0..40)) {
            let forest = run(&ops);
            let ids = forest.task_ids();
            let unique: HashSet<_> = ids.iter().collect();
            prop_assert_eq!(unique.len(), ids.len());
        }

        #[test]
        fn prop_remove_idempotent(ops in prop::collection::vec(op(), 0..20), target in 1u64..30) {
            let forest = run(&ops);
            let once = remove_subtree(&forest, TaskId(target));
            let twice = remove_subtree(&once, TaskId(target));
            prop_assert_eq!(once, twice);
        }
    }
}
