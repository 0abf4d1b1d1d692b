//! TaskStore trait definition

use async_trait::async_trait;

use super::StoreError;
use crate::domain::{ListId, Task, TaskId, TaskList};

/// Remote authoritative task store
///
/// Each method is exactly one network call. Methods that return a task return
/// the store's canonical representation of it, which callers must prefer over
/// anything they guessed locally.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Fetch every list with its full task trees
    async fn list_lists(&self) -> Result<Vec<TaskList>, StoreError>;

    async fn create_list(&self, title: &str) -> Result<TaskList, StoreError>;

    /// Create a root task at the end of a list
    async fn create_task(&self, list_id: ListId, title: &str) -> Result<Task, StoreError>;

    /// Flip the stored expansion flag
    async fn toggle_task(&self, task_id: TaskId) -> Result<Task, StoreError>;

    async fn update_task(&self, task_id: TaskId, title: &str) -> Result<Task, StoreError>;

    /// Delete a task and, on the store side, all of its descendants
    async fn delete_task(&self, task_id: TaskId) -> Result<(), StoreError>;

    async fn create_subtask(&self, parent_id: TaskId, title: &str, description: &str) -> Result<Task, StoreError>;

    /// Set a subtask's completion flag
    ///
    /// The store answers with either the parent task or the subtask itself.
    async fn complete_subtask(&self, subtask_id: TaskId, completed: bool) -> Result<Task, StoreError>;

    async fn update_subtask(&self, task_id: TaskId, subtask_id: TaskId, title: &str) -> Result<Task, StoreError>;

    async fn delete_subtask(&self, task_id: TaskId, subtask_id: TaskId) -> Result<(), StoreError>;

    /// Re-parent a root task (and its whole subtree) under another list
    async fn move_task(&self, task_id: TaskId, list_id: ListId) -> Result<Task, StoreError>;
}
