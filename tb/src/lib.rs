//! Taskboard - hierarchical Kanban board client
//!
//! A board has three columns (To Do, In Progress, Done), each holding a
//! forest of tasks nested at most three levels deep. A remote task store is
//! the source of truth; the local forest is a cache that converges to it.
//!
//! # Core Concepts
//!
//! - **Immutable forest**: every edit produces a new forest that shares untouched subtrees
//! - **Canonical reconciliation**: local state changes only from store responses
//! - **Single owner**: one actor holds the forest; handlers send it deltas
//! - **Optimistic moves**: a moved task leaves its list before the store answers
//!
//! # Modules
//!
//! - [`domain`] - Ids, lists, tasks and field patches
//! - [`tree`] - Tree locator and tree mutator over the forest
//! - [`store`] - Remote task store trait and HTTP client
//! - [`board`] - Board state actor, reconciliation controller and moves
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod board;
pub mod cli;
pub mod config;
pub mod domain;
pub mod store;
pub mod tree;

pub use board::{ActionOutcome, BoardState, Reconciler, Renderer};
pub use config::Config;
pub use domain::{ListId, ListKind, Task, TaskId, TaskList};
pub use store::{HttpTaskStore, StoreError, TaskStore};
pub use tree::Forest;
