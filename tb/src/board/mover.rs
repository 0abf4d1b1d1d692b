//! Move/reorder coordinator
//!
//! Directional buttons and drag gestures both resolve to one move of a root
//! task between lists. A move is optimistic: the task leaves its source list
//! before the store call. If the call fails the board is reloaded, since what
//! the store actually did is unknown.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::controller::{Phase, Reconciler, not_found};
use super::delta::{ForestDelta, StructuralEdit};
use super::messages::BoardResponse;
use super::outcome::{Action, ActionOutcome};
use crate::domain::{ListId, TaskId};
use crate::tree;

/// A position in a list's root sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropTarget {
    pub list: ListId,
    pub index: usize,
}

/// The end of a drag gesture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DragDrop {
    pub task: TaskId,
    pub source: DropTarget,
    /// `None` when the task was dropped outside every list
    pub destination: Option<DropTarget>,
}

/// Column direction for button moves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
}

impl Reconciler {
    /// Move a root task and its subtree to `destination`
    pub async fn move_task(&self, task: TaskId, destination: ListId) -> BoardResponse<ActionOutcome> {
        debug!(%task, %destination, "move_task: called");
        let action = Action::MoveTask {
            task,
            list: destination,
        };
        let forest = self.state.snapshot().await?;
        let Some(node) = tree::find_task(&forest, task) else {
            return Ok(self.refuse(action, not_found(task)));
        };
        if node.parent_id.is_some() {
            return Ok(self.refuse(action, "Only top-level tasks can move between lists"));
        }
        if forest.list(destination).is_none() {
            return Ok(self.refuse(action, format!("List {} not found", destination)));
        }
        let source = tree::owning_list(&forest, task).and_then(|l| l.id);
        if source == Some(destination) {
            debug!(%task, %destination, "move_task: already in destination list");
            return Ok(ActionOutcome::Unchanged);
        }

        // Optimistic removal from the source list
        self.state
            .apply(ForestDelta::new().edit(StructuralEdit::Remove(task)))
            .await?;
        info!(%task, ?source, %destination, "move_task: removed from source list");

        self.requesting(action);
        match self.store.move_task(task, destination).await {
            Ok(canonical) => {
                let target = canonical.list_id.unwrap_or(destination);
                // Removing again keeps ids unique if a refresh re-added the task meanwhile
                let delta = ForestDelta::new()
                    .edit(StructuralEdit::Remove(task))
                    .edit(StructuralEdit::InsertRoot {
                        list: target,
                        task: canonical,
                    });
                self.reconcile(action, delta).await
            }
            Err(e) => {
                let outcome = self.roll_back(action, &e);
                warn!(%task, "move_task: resynchronising board after failed move");
                let refreshed = self.refresh().await?;
                if let Some(notice) = refreshed.notice() {
                    warn!(%task, reason = %notice.reason, "move_task: resync failed");
                }
                Ok(outcome)
            }
        }
    }

    /// Move a root task one column in `direction`; a no-op at either end
    pub async fn move_direction(&self, task: TaskId, direction: Direction) -> BoardResponse<ActionOutcome> {
        debug!(%task, ?direction, "move_direction: called");
        let forest = self.state.snapshot().await?;
        let Some(index) = tree::owning_list(&forest, task)
            .and_then(|l| l.id)
            .and_then(|id| forest.list_index(id))
        else {
            return Ok(self.refuse(Action::MoveColumn { task }, not_found(task)));
        };

        let target = match direction {
            Direction::Left => index.checked_sub(1),
            Direction::Right => Some(index + 1).filter(|i| *i < forest.lists().len()),
        };
        match target.and_then(|i| forest.lists()[i].id) {
            Some(destination) => self.move_task(task, destination).await,
            None => {
                debug!(%task, ?direction, index, "move_direction: no column in that direction");
                Ok(ActionOutcome::Unchanged)
            }
        }
    }

    pub async fn move_left(&self, task: TaskId) -> BoardResponse<ActionOutcome> {
        self.move_direction(task, Direction::Left).await
    }

    pub async fn move_right(&self, task: TaskId) -> BoardResponse<ActionOutcome> {
        self.move_direction(task, Direction::Right).await
    }

    /// Resolve a drag gesture
    ///
    /// Dropping within the same list only reorders locally; the store keeps
    /// no order. Dropping on another list is a move.
    pub async fn drop_task(&self, drop: DragDrop) -> BoardResponse<ActionOutcome> {
        debug!(?drop, "drop_task: called");
        let Some(destination) = drop.destination else {
            debug!(task = %drop.task, "drop_task: dropped outside any list");
            return Ok(ActionOutcome::Unchanged);
        };
        if destination == drop.source {
            return Ok(ActionOutcome::Unchanged);
        }
        if destination.list != drop.source.list {
            return self.move_task(drop.task, destination.list).await;
        }

        let action = Action::Reorder { list: destination.list };
        let forest = self.state.snapshot().await?;
        let at_source = forest
            .list(drop.source.list)
            .and_then(|l| l.tasks.get(drop.source.index))
            .and_then(|t| t.id);
        if at_source != Some(drop.task) {
            return Ok(self.refuse(
                action,
                format!("Task {} is not at position {}", drop.task, drop.source.index),
            ));
        }

        self.transition(action, Phase::Idle, Phase::Applying);
        self.state
            .apply(ForestDelta::new().edit(StructuralEdit::Reorder {
                list: destination.list,
                from: drop.source.index,
                to: destination.index,
            }))
            .await?;
        self.transition(action, Phase::Applying, Phase::Idle);
        Ok(ActionOutcome::Applied)
    }
}
