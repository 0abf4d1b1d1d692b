//! Domain types for the board
//!
//! Lists (columns) own ordered root tasks; tasks own ordered subtasks up to
//! [`MAX_TASK_DEPTH`] levels deep.

mod id;
mod list;
mod task;

pub use id::{ListId, TaskId};
pub use list::{ListKind, TaskList};
pub use task::{CompletionFraction, MAX_TASK_DEPTH, Task, TaskPatch};
