//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::domain::{ListKind, TaskId};

/// Taskboard - hierarchical Kanban board client
#[derive(Parser)]
#[command(
    name = "tb",
    about = "Kanban board of nested tasks backed by a remote task store",
    version = env!("CARGO_PKG_VERSION"),
    after_help = "Logs are written to: ~/.local/share/taskboard/logs/taskboard.log"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    /// Override the task store base URL
    #[arg(long, global = true, value_name = "URL")]
    pub base_url: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show the board
    Show {
        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Add a task to a list
    Add {
        /// List to add to (todo, in-progress, done)
        #[arg(value_name = "LIST")]
        list: ListKind,

        title: String,
    },

    /// Rename a task
    Edit { task: TaskId, title: String },

    /// Expand or collapse a task
    Toggle { task: TaskId },

    /// Complete a task (top-level tasks are removed)
    Complete { task: TaskId },

    /// Delete a task and its subtasks
    Delete { task: TaskId },

    /// Subtask operations
    #[command(subcommand)]
    Subtask(SubtaskCommand),

    /// Move a top-level task to another list
    Move {
        task: TaskId,

        /// left, right, or a list (todo, in-progress, done)
        #[arg(value_name = "TARGET")]
        target: MoveTarget,
    },
}

/// Subtask subcommands
#[derive(Subcommand, Debug)]
pub enum SubtaskCommand {
    /// Add a subtask under a task
    Add { parent: TaskId, title: String },

    /// Rename a subtask
    Edit {
        parent: TaskId,
        subtask: TaskId,
        title: String,
    },

    /// Flip a subtask's completion flag
    Complete { parent: TaskId, subtask: TaskId },

    /// Delete a subtask
    Delete { parent: TaskId, subtask: TaskId },
}

/// Where a `move` sends a task
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveTarget {
    Left,
    Right,
    List(ListKind),
}

impl std::str::FromStr for MoveTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            _ => s
                .parse::<ListKind>()
                .map(Self::List)
                .map_err(|_| format!("Unknown target: {}. Use: left, right, todo, in-progress, or done", s)),
        }
    }
}

/// Output format for the board
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {}. Use: text or json", s)),
        }
    }
}
