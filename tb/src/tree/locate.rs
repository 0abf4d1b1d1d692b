//! Read-only lookups over the forest

use std::sync::Arc;
use tracing::warn;

use super::Forest;
use crate::domain::{MAX_TASK_DEPTH, Task, TaskId, TaskList};

/// Depth-first search across every list for the first task with `id`
pub fn find_task(forest: &Forest, id: TaskId) -> Option<&Arc<Task>> {
    forest.lists.iter().find_map(|list| find_in(&list.tasks, id))
}

fn find_in(tasks: &[Arc<Task>], id: TaskId) -> Option<&Arc<Task>> {
    for task in tasks {
        if task.id == Some(id) {
            return Some(task);
        }
        if let Some(found) = find_in(&task.subtasks, id) {
            return Some(found);
        }
    }
    None
}

/// The list whose tree contains `id` at any depth
pub fn owning_list(forest: &Forest, id: TaskId) -> Option<&TaskList> {
    forest.lists.iter().find(|list| find_in(&list.tasks, id).is_some())
}

/// Number of parent hops from `task` to a root task
///
/// When a parent link points at a task missing from the forest the count so
/// far is returned and the fault is logged.
pub fn depth_of(forest: &Forest, task: &Task) -> usize {
    // A chain longer than the forest itself can only be a cycle
    let limit = forest.task_count();
    let mut depth = 0;
    let mut current = task.parent_id;

    while let Some(parent_id) = current {
        let Some(parent) = find_task(forest, parent_id) else {
            warn!(task_id = ?task.id, %parent_id, depth, "depth_of: parent missing from forest, returning partial depth");
            break;
        };
        depth += 1;
        if depth > limit {
            warn!(task_id = ?task.id, depth, "depth_of: parent chain longer than forest, stopping");
            break;
        }
        current = parent.parent_id;
    }

    depth
}

/// True when `id` exists and a child of it would stay within the depth limit
pub fn can_add_child(forest: &Forest, id: TaskId) -> bool {
    find_task(forest, id).is_some_and(|task| depth_of(forest, task) + 1 < MAX_TASK_DEPTH)
}
