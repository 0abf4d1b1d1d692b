//! Board columns

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use super::{ListId, Task};

/// The closed set of column roles, in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListKind {
    Todo,
    InProgress,
    Done,
}

impl ListKind {
    /// Every role, left to right
    pub const ALL: [ListKind; 3] = [ListKind::Todo, ListKind::InProgress, ListKind::Done];

    /// Title the store knows this column by
    pub fn title(self) -> &'static str {
        match self {
            Self::Todo => "To Do",
            Self::InProgress => "In Progress",
            Self::Done => "Done",
        }
    }

    /// Resolve a role from a list title (case and whitespace insensitive)
    pub fn from_title(title: &str) -> Option<Self> {
        let wanted = title.trim();
        Self::ALL.into_iter().find(|k| k.title().eq_ignore_ascii_case(wanted))
    }

    /// Column position on the board
    pub fn index(self) -> usize {
        match self {
            Self::Todo => 0,
            Self::InProgress => 1,
            Self::Done => 2,
        }
    }
}

impl fmt::Display for ListKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title())
    }
}

impl std::str::FromStr for ListKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "todo" | "to_do" => Ok(Self::Todo),
            "in_progress" | "doing" => Ok(Self::InProgress),
            "done" => Ok(Self::Done),
            _ => Err(format!("Unknown list: {}. Use: todo, in-progress, or done", s)),
        }
    }
}

/// A column and its root tasks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskList {
    /// Store-assigned identity (absent for a placeholder not yet created)
    #[serde(default)]
    pub id: Option<ListId>,

    pub title: String,

    #[serde(default)]
    pub tasks: Vec<Arc<Task>>,
}

impl TaskList {
    /// A placeholder column for a role the store does not have yet
    pub fn placeholder(kind: ListKind) -> Self {
        Self {
            id: None,
            title: kind.title().to_string(),
            tasks: Vec::new(),
        }
    }

    pub fn kind(&self) -> Option<ListKind> {
        ListKind::from_title(&self.title)
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    /// Root tasks with every descendant's parent link normalised
    pub fn linked(mut self) -> Self {
        self.tasks = self.tasks.iter().map(|t| Task::linked(t, None)).collect();
        self
    }
}
