//! Reconciliation controller
//!
//! Each user action runs `Idle -> Requesting -> Applying | RollingBack -> Idle`.
//! Exactly one store call is made per action and nothing is changed locally
//! before it returns. The forest a response is reconciled into is the one in
//! effect when the response arrives, so unrelated edits made meanwhile survive.

use futures::future::join_all;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::delta::{ForestDelta, StructuralEdit};
use super::messages::{BoardEvent, BoardResponse};
use super::outcome::{Action, ActionOutcome, Notice};
use super::state::BoardState;
use crate::domain::{ListId, Task, TaskId, TaskPatch};
use crate::store::{StoreError, TaskStore};
use crate::tree::{self, Forest};

/// Where an action is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Requesting,
    Applying,
    RollingBack,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Idle => write!(f, "idle"),
            Phase::Requesting => write!(f, "requesting"),
            Phase::Applying => write!(f, "applying"),
            Phase::RollingBack => write!(f, "rolling-back"),
        }
    }
}

/// Trim a user-supplied title, rejecting blank ones
pub(super) fn clean_title(title: &str) -> Option<&str> {
    let title = title.trim();
    (!title.is_empty()).then_some(title)
}

pub(super) fn not_found(id: TaskId) -> String {
    format!("Task {} not found", id)
}

/// Turns user intent into store calls and store responses into forest deltas
#[derive(Clone)]
pub struct Reconciler {
    pub(super) store: Arc<dyn TaskStore>,
    pub(super) state: BoardState,
}

impl Reconciler {
    pub fn new(store: Arc<dyn TaskStore>, state: BoardState) -> Self {
        Self { store, state }
    }

    pub fn state(&self) -> &BoardState {
        &self.state
    }

    /// The forest in effect right now
    pub async fn snapshot(&self) -> BoardResponse<Forest> {
        self.state.snapshot().await
    }

    // === Phase bookkeeping ===

    pub(super) fn transition(&self, action: Action, from: Phase, to: Phase) {
        info!(%action, %from, %to, "reconcile: phase transition");
    }

    pub(super) fn requesting(&self, action: Action) {
        self.transition(action, Phase::Idle, Phase::Requesting);
    }

    /// Refuse an action before any call is made
    pub(super) fn refuse(&self, action: Action, reason: impl Into<String>) -> ActionOutcome {
        let notice = Notice::new(action, reason);
        warn!(%action, reason = %notice.reason, "reconcile: action refused");
        self.state.publish(BoardEvent::ActionFailed(notice.clone()));
        ActionOutcome::Refused(notice)
    }

    /// Leave the forest as it is and surface the failure
    pub(super) fn roll_back(&self, action: Action, err: &StoreError) -> ActionOutcome {
        self.transition(action, Phase::Requesting, Phase::RollingBack);
        warn!(%action, error = %err, transport = err.is_transport(), "reconcile: store call failed");
        let notice = Notice::from_store(action, err);
        self.state.publish(BoardEvent::ActionFailed(notice.clone()));
        self.transition(action, Phase::RollingBack, Phase::Idle);
        ActionOutcome::Failed(notice)
    }

    /// Apply the delta derived from an authoritative response
    pub(super) async fn reconcile(&self, action: Action, delta: ForestDelta) -> BoardResponse<ActionOutcome> {
        self.transition(action, Phase::Requesting, Phase::Applying);
        let version = self.state.apply(delta).await?;
        debug!(%action, version, "reconcile: delta applied");
        self.transition(action, Phase::Applying, Phase::Idle);
        Ok(ActionOutcome::Applied)
    }

    // === Board loading ===

    /// Fetch every list and replace the forest, creating missing columns
    pub async fn load(&self) -> BoardResponse<ActionOutcome> {
        debug!("load: called");
        let action = Action::Load;
        self.requesting(action);

        let lists = match self.store.list_lists().await {
            Ok(lists) => lists,
            Err(e) => return Ok(self.roll_back(action, &e)),
        };

        let (mut forest, missing) = Forest::from_store_lists(lists);
        let mut failure = None;
        if !missing.is_empty() {
            info!(?missing, "load: creating missing lists");
            let created = join_all(missing.iter().map(|kind| self.store.create_list(kind.title()))).await;
            for (kind, result) in missing.iter().zip(created) {
                match result {
                    Ok(list) => forest = forest.with_list(list),
                    Err(e) => {
                        warn!(%kind, error = %e, "load: failed to create list");
                        if failure.is_none() {
                            failure = Some(Notice::from_store(Action::CreateList, &e));
                        }
                    }
                }
            }
            // Columns the store never acknowledged are not shown
            forest = Forest::new(forest.lists().iter().filter(|l| l.is_persisted()).cloned().collect());
        }

        self.transition(action, Phase::Requesting, Phase::Applying);
        let version = self.state.replace(forest).await?;
        debug!(version, "load: forest replaced");
        self.transition(action, Phase::Applying, Phase::Idle);

        Ok(match failure {
            Some(notice) => {
                self.state.publish(BoardEvent::ActionFailed(notice.clone()));
                ActionOutcome::Failed(notice)
            }
            None => ActionOutcome::Applied,
        })
    }

    /// Full reload of the board
    pub async fn refresh(&self) -> BoardResponse<ActionOutcome> {
        debug!("refresh: called");
        self.load().await
    }

    // === Root task operations ===

    pub async fn create_task(&self, list: ListId, title: &str) -> BoardResponse<ActionOutcome> {
        debug!(%list, %title, "create_task: called");
        let action = Action::CreateTask { list };
        let Some(title) = clean_title(title) else {
            return Ok(self.refuse(action, "Title cannot be empty"));
        };
        let forest = self.state.snapshot().await?;
        if forest.list(list).is_none() {
            return Ok(self.refuse(action, format!("List {} not found", list)));
        }

        self.requesting(action);
        match self.store.create_task(list, title).await {
            Ok(canonical) => {
                let target = canonical.list_id.unwrap_or(list);
                let delta = ForestDelta::new().edit(StructuralEdit::InsertRoot {
                    list: target,
                    task: canonical,
                });
                self.reconcile(action, delta).await
            }
            Err(e) => Ok(self.roll_back(action, &e)),
        }
    }

    pub async fn toggle_expansion(&self, task: TaskId) -> BoardResponse<ActionOutcome> {
        debug!(%task, "toggle_expansion: called");
        let action = Action::ToggleExpansion { task };
        let forest = self.state.snapshot().await?;
        if tree::find_task(&forest, task).is_none() {
            return Ok(self.refuse(action, not_found(task)));
        }

        self.requesting(action);
        match self.store.toggle_task(task).await {
            Ok(canonical) => {
                let delta = ForestDelta::new().patch(task, TaskPatch::canonical(&canonical));
                self.reconcile(action, delta).await
            }
            Err(e) => Ok(self.roll_back(action, &e)),
        }
    }

    pub async fn edit_task(&self, task: TaskId, title: &str) -> BoardResponse<ActionOutcome> {
        debug!(%task, %title, "edit_task: called");
        let action = Action::EditTask { task };
        let Some(title) = clean_title(title) else {
            return Ok(self.refuse(action, "Title cannot be empty"));
        };
        let forest = self.state.snapshot().await?;
        if tree::find_task(&forest, task).is_none() {
            return Ok(self.refuse(action, not_found(task)));
        }

        self.requesting(action);
        match self.store.update_task(task, title).await {
            Ok(canonical) => {
                let delta = ForestDelta::new().patch(task, TaskPatch::canonical(&canonical));
                self.reconcile(action, delta).await
            }
            Err(e) => Ok(self.roll_back(action, &e)),
        }
    }

    pub async fn delete_task(&self, task: TaskId) -> BoardResponse<ActionOutcome> {
        debug!(%task, "delete_task: called");
        let action = Action::DeleteTask { task };
        let forest = self.state.snapshot().await?;
        if tree::find_task(&forest, task).is_none() {
            return Ok(self.refuse(action, not_found(task)));
        }

        self.requesting(action);
        match self.store.delete_task(task).await {
            Ok(()) => {
                self.reconcile(action, ForestDelta::new().edit(StructuralEdit::Remove(task)))
                    .await
            }
            Err(e) => Ok(self.roll_back(action, &e)),
        }
    }

    /// Complete a task
    ///
    /// A root task is finished by deleting it with its whole subtree. A
    /// subtask has its completion flag flipped instead.
    pub async fn complete_task(&self, task: TaskId) -> BoardResponse<ActionOutcome> {
        debug!(%task, "complete_task: called");
        let action = Action::CompleteTask { task };
        let forest = self.state.snapshot().await?;
        let Some(node) = tree::find_task(&forest, task) else {
            return Ok(self.refuse(action, not_found(task)));
        };

        if let Some(parent) = node.parent_id {
            debug!(%task, %parent, "complete_task: subtask, flipping its completion flag");
            return self.flip_subtask(action, parent, task).await;
        }

        self.requesting(action);
        match self.store.delete_task(task).await {
            Ok(()) => {
                self.reconcile(action, ForestDelta::new().edit(StructuralEdit::Remove(task)))
                    .await
            }
            Err(e) => Ok(self.roll_back(action, &e)),
        }
    }

    // === Subtask operations ===

    pub async fn add_subtask(&self, parent: TaskId, title: &str) -> BoardResponse<ActionOutcome> {
        debug!(%parent, %title, "add_subtask: called");
        let action = Action::AddSubtask { parent };
        let Some(title) = clean_title(title) else {
            return Ok(self.refuse(action, "Title cannot be empty"));
        };
        let forest = self.state.snapshot().await?;
        if tree::find_task(&forest, parent).is_none() {
            return Ok(self.refuse(action, not_found(parent)));
        }
        if !tree::can_add_child(&forest, parent) {
            return Ok(self.refuse(
                action,
                format!("Subtasks cannot be nested more than {} levels deep", crate::domain::MAX_TASK_DEPTH),
            ));
        }

        self.requesting(action);
        match self.store.create_subtask(parent, title, "").await {
            Ok(canonical) => {
                let delta = ForestDelta::new().edit(StructuralEdit::InsertChild {
                    parent,
                    child: canonical,
                });
                self.reconcile(action, delta).await
            }
            Err(e) => Ok(self.roll_back(action, &e)),
        }
    }

    /// Flip the completion flag of a direct child of `parent`
    ///
    /// The store answers with either the parent or the subtask; both are
    /// reconciled as canonical.
    pub async fn complete_subtask(&self, parent: TaskId, subtask: TaskId) -> BoardResponse<ActionOutcome> {
        debug!(%parent, %subtask, "complete_subtask: called");
        self.flip_subtask(Action::CompleteSubtask { parent, subtask }, parent, subtask)
            .await
    }

    /// Completion flip shared by `complete_subtask` and `complete_task`;
    /// `action` is what notices and logs report
    async fn flip_subtask(&self, action: Action, parent: TaskId, subtask: TaskId) -> BoardResponse<ActionOutcome> {
        let forest = self.state.snapshot().await?;
        let Some(child) = tree::find_task(&forest, parent).and_then(|p| p.child(subtask)) else {
            return Ok(self.refuse(action, format!("Subtask {} not found under task {}", subtask, parent)));
        };
        let completed = !child.completed;

        self.requesting(action);
        match self.store.complete_subtask(subtask, completed).await {
            Ok(canonical) if canonical.id == Some(parent) => {
                debug!(%parent, "flip_subtask: store returned the parent");
                let delta = ForestDelta::new().patch(parent, TaskPatch::canonical(&canonical));
                self.reconcile(action, delta).await
            }
            Ok(canonical) if canonical.id == Some(subtask) => {
                debug!(%subtask, "flip_subtask: store returned the subtask");
                let delta = ForestDelta::new().edit(StructuralEdit::ReplaceChild {
                    parent,
                    child: canonical,
                });
                self.reconcile(action, delta).await
            }
            Ok(canonical) => {
                let err = StoreError::InvalidResponse(format!(
                    "Expected task {} or {}, got {:?}",
                    parent, subtask, canonical.id
                ));
                Ok(self.roll_back(action, &err))
            }
            Err(e) => Ok(self.roll_back(action, &e)),
        }
    }

    pub async fn edit_subtask(&self, parent: TaskId, subtask: TaskId, title: &str) -> BoardResponse<ActionOutcome> {
        debug!(%parent, %subtask, %title, "edit_subtask: called");
        let action = Action::EditSubtask { parent, subtask };
        let Some(title) = clean_title(title) else {
            return Ok(self.refuse(action, "Title cannot be empty"));
        };
        let forest = self.state.snapshot().await?;
        if tree::find_task(&forest, parent).and_then(|p| p.child(subtask)).is_none() {
            return Ok(self.refuse(action, format!("Subtask {} not found under task {}", subtask, parent)));
        }

        self.requesting(action);
        match self.store.update_subtask(parent, subtask, title).await {
            Ok(canonical) => {
                // The child is swapped in place; its identity is the one we asked for
                let canonical = Task {
                    id: Some(subtask),
                    ..canonical
                };
                let delta = ForestDelta::new().edit(StructuralEdit::ReplaceChild {
                    parent,
                    child: canonical,
                });
                self.reconcile(action, delta).await
            }
            Err(e) => Ok(self.roll_back(action, &e)),
        }
    }

    pub async fn delete_subtask(&self, parent: TaskId, subtask: TaskId) -> BoardResponse<ActionOutcome> {
        debug!(%parent, %subtask, "delete_subtask: called");
        let action = Action::DeleteSubtask { parent, subtask };
        let forest = self.state.snapshot().await?;
        if tree::find_task(&forest, parent).and_then(|p| p.child(subtask)).is_none() {
            return Ok(self.refuse(action, format!("Subtask {} not found under task {}", subtask, parent)));
        }

        self.requesting(action);
        match self.store.delete_subtask(parent, subtask).await {
            Ok(()) => {
                let delta = ForestDelta::new().edit(StructuralEdit::RemoveChild { parent, child: subtask });
                self.reconcile(action, delta).await
            }
            Err(e) => Ok(self.roll_back(action, &e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::messages::BoardEvent;
    use crate::domain::{ListKind, TaskList};
    use crate::store::client::mock::{MockReply, MockTaskStore, StoreCall};
    use crate::tree::{find_task, fixtures};

    fn reconciler(forest: Forest, store: Arc<MockTaskStore>) -> Reconciler {
        Reconciler::new(store, BoardState::spawn(forest))
    }

    fn store(replies: Vec<MockReply>) -> Arc<MockTaskStore> {
        Arc::new(MockTaskStore::new(replies))
    }

    fn list(id: u64, kind: ListKind, tasks: Vec<Task>) -> TaskList {
        TaskList {
            id: Some(ListId(id)),
            title: kind.title().to_string(),
            tasks: tasks.into_iter().map(Arc::new).collect(),
        }
    }

    #[tokio::test]
    async fn test_load_arranges_lists_by_role() {
        let mock = store(vec![MockReply::Lists(vec![
            list(3, ListKind::Done, vec![]),
            list(1, ListKind::Todo, vec![Task::new("Write docs").with_id(1)]),
            list(2, ListKind::InProgress, vec![]),
        ])]);
        let reconciler = reconciler(Forest::default(), mock.clone());

        let outcome = reconciler.load().await.unwrap();
        assert_eq!(outcome, ActionOutcome::Applied);

        let forest = reconciler.snapshot().await.unwrap();
        let titles: Vec<_> = forest.lists().iter().map(|l| l.title.as_str()).collect();
        assert_eq!(titles, vec!["To Do", "In Progress", "Done"]);
        assert_eq!(mock.calls(), vec![StoreCall::ListLists]);
    }

    #[tokio::test]
    async fn test_load_creates_missing_lists() {
        let mock = store(vec![
            MockReply::Lists(vec![list(1, ListKind::Todo, vec![])]),
            MockReply::List(list(2, ListKind::InProgress, vec![])),
            MockReply::List(list(3, ListKind::Done, vec![])),
        ]);
        let reconciler = reconciler(Forest::default(), mock.clone());

        assert!(reconciler.load().await.unwrap().is_applied());

        let forest = reconciler.snapshot().await.unwrap();
        assert_eq!(forest.lists().len(), 3);
        assert!(forest.lists().iter().all(|l| l.is_persisted()));
        let calls = mock.calls();
        assert!(calls.contains(&StoreCall::CreateList("In Progress".to_string())));
        assert!(calls.contains(&StoreCall::CreateList("Done".to_string())));
    }

    #[tokio::test]
    async fn test_load_keeps_remaining_lists_when_creation_fails() {
        let mock = store(vec![
            MockReply::Lists(vec![list(1, ListKind::Todo, vec![]), list(2, ListKind::InProgress, vec![])]),
            MockReply::Rejected(500, "Database unavailable".to_string()),
        ]);
        let reconciler = reconciler(Forest::default(), mock);

        let outcome = reconciler.load().await.unwrap();
        let notice = outcome.notice().unwrap();
        assert_eq!(notice.action, Action::CreateList);
        assert_eq!(notice.reason, "Database unavailable");

        let forest = reconciler.snapshot().await.unwrap();
        assert_eq!(forest.lists().len(), 2);
    }

    #[tokio::test]
    async fn test_load_failure_leaves_forest() {
        let mock = store(vec![MockReply::Timeout]);
        let reconciler = reconciler(fixtures::board(), mock);

        let outcome = reconciler.load().await.unwrap();
        assert!(matches!(outcome, ActionOutcome::Failed(_)));
        assert_eq!(reconciler.snapshot().await.unwrap(), fixtures::board());
    }

    #[tokio::test]
    async fn test_create_task_appends_canonical() {
        let mut canonical = Task::new("Book venue").with_id(40);
        canonical.list_id = Some(ListId(11));
        let mock = store(vec![MockReply::Task(canonical)]);
        let reconciler = reconciler(fixtures::board(), mock.clone());

        let outcome = reconciler.create_task(ListId(11), "  Book venue ").await.unwrap();
        assert!(outcome.is_applied());
        assert_eq!(mock.calls(), vec![StoreCall::CreateTask(ListId(11), "Book venue".to_string())]);

        let forest = reconciler.snapshot().await.unwrap();
        let in_progress = forest.list(ListId(11)).unwrap();
        assert_eq!(in_progress.tasks.len(), 1);
        assert_eq!(in_progress.tasks[0].id, Some(TaskId(40)));
    }

    #[tokio::test]
    async fn test_blank_title_refused_without_call() {
        let mock = store(vec![]);
        let reconciler = reconciler(fixtures::board(), mock.clone());

        let outcome = reconciler.create_task(ListId(10), "   ").await.unwrap();
        assert!(matches!(outcome, ActionOutcome::Refused(_)));
        let outcome = reconciler.edit_task(TaskId(1), "").await.unwrap();
        assert!(matches!(outcome, ActionOutcome::Refused(_)));
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_edit_uses_canonical_not_local_guess() {
        // The store normalises the title; the forest must carry its version
        let mut canonical = Task::new("Plan Launch").with_id(1);
        canonical.list_id = Some(ListId(10));
        canonical.subtasks = find_task(&fixtures::board(), TaskId(1)).unwrap().subtasks.clone();
        let mock = store(vec![MockReply::Task(canonical)]);
        let reconciler = reconciler(fixtures::board(), mock);

        reconciler.edit_task(TaskId(1), "plan launch").await.unwrap();

        let forest = reconciler.snapshot().await.unwrap();
        let task = find_task(&forest, TaskId(1)).unwrap();
        assert_eq!(task.title, "Plan Launch");
        assert_eq!(task.subtasks.len(), 2);
    }

    #[tokio::test]
    async fn test_rejection_leaves_forest_and_broadcasts() {
        let mock = store(vec![MockReply::Rejected(404, "Task not found".to_string())]);
        let reconciler = reconciler(fixtures::board(), mock);
        let mut events = reconciler.state().subscribe_events();

        let outcome = reconciler.edit_task(TaskId(2), "Draft v2").await.unwrap();
        let ActionOutcome::Failed(notice) = outcome else {
            panic!("expected failure, got {:?}", outcome);
        };
        assert_eq!(notice.reason, "Task not found");
        assert_eq!(events.recv().await.unwrap(), BoardEvent::ActionFailed(notice));
        assert_eq!(reconciler.snapshot().await.unwrap(), fixtures::board());
    }

    #[tokio::test]
    async fn test_missing_task_is_refused_noop() {
        let mock = store(vec![]);
        let reconciler = reconciler(fixtures::board(), mock.clone());

        for outcome in [
            reconciler.toggle_expansion(TaskId(99)).await.unwrap(),
            reconciler.delete_task(TaskId(99)).await.unwrap(),
            reconciler.complete_task(TaskId(99)).await.unwrap(),
            reconciler.delete_subtask(TaskId(1), TaskId(3)).await.unwrap(),
        ] {
            assert!(matches!(outcome, ActionOutcome::Refused(_)), "{:?}", outcome);
        }
        assert_eq!(mock.call_count(), 0);
        assert_eq!(reconciler.snapshot().await.unwrap(), fixtures::board());
    }

    #[tokio::test]
    async fn test_complete_root_task_deletes_subtree() {
        let release = Task::new("Ship release")
            .with_id(7)
            .with_subtask(Task::new("Tag").with_id(8).with_subtask(Task::new("Sign").with_id(9)))
            .with_subtask(Task::new("Announce").with_id(10));
        let forest = Forest::new(vec![
            list(1, ListKind::Todo, vec![release, Task::new("Triage").with_id(11)]),
            list(2, ListKind::InProgress, vec![]),
            list(3, ListKind::Done, vec![]),
        ]);
        let mock = store(vec![MockReply::Empty]);
        let reconciler = reconciler(forest, mock.clone());

        assert!(reconciler.complete_task(TaskId(7)).await.unwrap().is_applied());
        assert_eq!(mock.calls(), vec![StoreCall::DeleteTask(TaskId(7))]);

        let forest = reconciler.snapshot().await.unwrap();
        assert_eq!(forest.task_ids(), vec![TaskId(11)]);
    }

    #[tokio::test]
    async fn test_complete_nested_task_flips_flag() {
        let mut canonical = Task::new("Outline").with_id(3);
        canonical.completed = true;
        let mock = store(vec![MockReply::Task(canonical)]);
        let reconciler = reconciler(fixtures::board(), mock.clone());

        assert!(reconciler.complete_task(TaskId(3)).await.unwrap().is_applied());
        assert_eq!(mock.calls(), vec![StoreCall::CompleteSubtask(TaskId(3), true)]);

        let forest = reconciler.snapshot().await.unwrap();
        let draft = find_task(&forest, TaskId(2)).unwrap();
        assert_eq!(draft.completion_fraction().unwrap().to_string(), "1/1");
    }

    #[tokio::test]
    async fn test_complete_nested_task_failure_names_complete_task() {
        let mock = store(vec![MockReply::Rejected(500, "Database locked".to_string())]);
        let reconciler = reconciler(fixtures::board(), mock.clone());

        let outcome = reconciler.complete_task(TaskId(3)).await.unwrap();
        let notice = outcome.notice().unwrap();
        assert_eq!(notice.action, Action::CompleteTask { task: TaskId(3) });
        assert_eq!(notice.reason, "Database locked");
        assert_eq!(mock.calls(), vec![StoreCall::CompleteSubtask(TaskId(3), true)]);
    }

    #[tokio::test]
    async fn test_complete_subtask_with_parent_response() {
        let parent = Task::new("Plan launch")
            .with_id(1)
            .with_subtask(Task::new("Draft").with_id(2).with_subtask(Task::new("Outline").with_id(3)))
            .with_subtask({
                let mut review = Task::new("Review").with_id(4);
                review.completed = true;
                review
            });
        let mock = store(vec![MockReply::Task(parent)]);
        let reconciler = reconciler(fixtures::board(), mock);

        assert!(reconciler.complete_subtask(TaskId(1), TaskId(4)).await.unwrap().is_applied());

        let forest = reconciler.snapshot().await.unwrap();
        let root = find_task(&forest, TaskId(1)).unwrap();
        assert_eq!(root.completion_fraction().unwrap().to_string(), "1/2");
        assert_eq!(find_task(&forest, TaskId(3)).unwrap().parent_id, Some(TaskId(2)));
    }

    #[tokio::test]
    async fn test_complete_subtask_with_unrelated_response_fails() {
        let mock = store(vec![MockReply::Task(Task::new("Other").with_id(77))]);
        let reconciler = reconciler(fixtures::board(), mock);

        let outcome = reconciler.complete_subtask(TaskId(1), TaskId(4)).await.unwrap();
        assert!(matches!(outcome, ActionOutcome::Failed(_)));
        assert_eq!(reconciler.snapshot().await.unwrap(), fixtures::board());
    }

    #[tokio::test]
    async fn test_add_subtask_inserts_and_expands() {
        let mock = store(vec![MockReply::Task(Task::new("Proofread").with_id(30))]);
        let reconciler = reconciler(fixtures::board(), mock.clone());
        reconciler
            .state()
            .apply(ForestDelta::new().patch(TaskId(4), TaskPatch::expanded(false)))
            .await
            .unwrap();

        assert!(reconciler.add_subtask(TaskId(4), "Proofread").await.unwrap().is_applied());
        assert_eq!(mock.calls(), vec![StoreCall::CreateSubtask(TaskId(4), "Proofread".to_string())]);

        let forest = reconciler.snapshot().await.unwrap();
        let review = find_task(&forest, TaskId(4)).unwrap();
        assert!(review.is_expanded);
        let added = find_task(&forest, TaskId(30)).unwrap();
        assert_eq!(added.parent_id, Some(TaskId(4)));
        assert_eq!(tree::depth_of(&forest, added), 2);
    }

    #[tokio::test]
    async fn test_add_subtask_trims_nested_reply_to_depth_limit() {
        let reply = Task::new("Proofread")
            .with_id(30)
            .with_subtask(Task::new("Spelling").with_id(31));
        let mock = store(vec![MockReply::Task(reply)]);
        let reconciler = reconciler(fixtures::board(), mock);

        assert!(reconciler.add_subtask(TaskId(4), "Proofread").await.unwrap().is_applied());

        let forest = reconciler.snapshot().await.unwrap();
        let added = find_task(&forest, TaskId(30)).unwrap();
        assert!(added.subtasks.is_empty());
        assert!(find_task(&forest, TaskId(31)).is_none());
    }

    #[tokio::test]
    async fn test_add_subtask_at_depth_limit_refused_before_call() {
        let mock = store(vec![]);
        let reconciler = reconciler(fixtures::board(), mock.clone());
        let mut events = reconciler.state().subscribe_events();

        // Task 3 sits at depth 2
        let outcome = reconciler.add_subtask(TaskId(3), "Too deep").await.unwrap();
        assert!(matches!(outcome, ActionOutcome::Refused(_)));
        assert_eq!(mock.call_count(), 0);
        assert!(matches!(events.recv().await.unwrap(), BoardEvent::ActionFailed(_)));
    }

    #[tokio::test]
    async fn test_edit_and_delete_subtask() {
        let mock = store(vec![MockReply::Task(Task::new("Final review").with_id(4)), MockReply::Empty]);
        let reconciler = reconciler(fixtures::board(), mock.clone());

        assert!(reconciler.edit_subtask(TaskId(1), TaskId(4), "Final review").await.unwrap().is_applied());
        assert!(reconciler.delete_subtask(TaskId(2), TaskId(3)).await.unwrap().is_applied());

        let forest = reconciler.snapshot().await.unwrap();
        let root = find_task(&forest, TaskId(1)).unwrap();
        assert_eq!(root.subtasks[1].title, "Final review");
        assert_eq!(root.subtasks[1].parent_id, Some(TaskId(1)));
        assert!(find_task(&forest, TaskId(3)).is_none());
        assert_eq!(
            mock.calls(),
            vec![
                StoreCall::UpdateSubtask(TaskId(1), TaskId(4), "Final review".to_string()),
                StoreCall::DeleteSubtask(TaskId(2), TaskId(3)),
            ]
        );
    }

    #[tokio::test]
    async fn test_subtask_must_be_direct_child() {
        let mock = store(vec![]);
        let reconciler = reconciler(fixtures::board(), mock.clone());

        // 3 is a grandchild of 1, not a child
        let outcome = reconciler.edit_subtask(TaskId(1), TaskId(3), "Outline v2").await.unwrap();
        assert!(matches!(outcome, ActionOutcome::Refused(_)));
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_interleaved_edit_survives_pending_response() {
        let mock = store(vec![]);
        let mut canonical = Task::new("Draft v2").with_id(2);
        canonical.subtasks = vec![Arc::new(Task::new("Outline").with_id(3))];
        let gate = mock.push_gated(MockReply::Task(canonical));
        let reconciler = reconciler(fixtures::board(), mock);
        let state = reconciler.state().clone();

        let (outcome, _) = tokio::join!(reconciler.edit_task(TaskId(2), "Draft v2"), async {
            // Lands while the edit of task 2 is still waiting on the store
            state
                .apply(ForestDelta::new().patch(TaskId(4), TaskPatch::title("Review v2")))
                .await
                .unwrap();
            gate.notify_one();
        });
        assert!(outcome.unwrap().is_applied());

        let forest = reconciler.snapshot().await.unwrap();
        assert_eq!(find_task(&forest, TaskId(2)).unwrap().title, "Draft v2");
        assert_eq!(find_task(&forest, TaskId(4)).unwrap().title, "Review v2");
    }

    #[tokio::test]
    async fn test_toggle_expansion_patches_flag() {
        let mut canonical = Task::new("Draft").with_id(2);
        canonical.is_expanded = false;
        canonical.subtasks = vec![Arc::new(Task::new("Outline").with_id(3))];
        let mock = store(vec![MockReply::Task(canonical)]);
        let reconciler = reconciler(fixtures::board(), mock);

        assert!(reconciler.toggle_expansion(TaskId(2)).await.unwrap().is_applied());
        let forest = reconciler.snapshot().await.unwrap();
        assert!(!find_task(&forest, TaskId(2)).unwrap().is_expanded);
    }

    #[test]
    fn test_clean_title() {
        assert_eq!(clean_title("  Ship it "), Some("Ship it"));
        assert_eq!(clean_title(" \t"), None);
    }
}
