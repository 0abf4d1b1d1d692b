//! Plain-text board rendering

use colored::{ColoredString, Colorize};
use std::fmt::Write;
use std::sync::Arc;

use super::outcome::Notice;
use crate::domain::{Task, TaskList};
use crate::tree::Forest;

/// Renders the board as indented text, one column after another
#[derive(Debug, Clone, Copy)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    fn paint(&self, text: impl Into<String>, style: impl Fn(ColoredString) -> ColoredString) -> String {
        let text = text.into();
        if self.color {
            style(text.as_str().normal()).to_string()
        } else {
            text
        }
    }

    pub fn render(&self, forest: &Forest) -> String {
        let mut out = String::new();
        for (index, list) in forest.lists().iter().enumerate() {
            if index > 0 {
                out.push('\n');
            }
            self.render_list(list, &mut out);
        }
        out
    }

    fn render_list(&self, list: &TaskList, out: &mut String) {
        let header = format!("{} ({})", list.title, list.tasks.len());
        let _ = writeln!(out, "{}", self.paint(header, |s| s.bold()));
        if list.tasks.is_empty() {
            let _ = writeln!(out, "  {}", self.paint("(empty)", |s| s.dimmed()));
        }
        for task in &list.tasks {
            self.render_task(task, 1, out);
        }
    }

    fn render_task(&self, task: &Arc<Task>, depth: usize, out: &mut String) {
        let marker = match (task.has_subtasks(), task.is_expanded) {
            (true, true) => "▾ ",
            (true, false) => "▸ ",
            (false, _) => "  ",
        };
        let checkbox = if task.completed {
            self.paint("[x]", |s| s.green())
        } else {
            "[ ]".to_string()
        };
        let id = task.id.map(|id| format!("#{} ", id)).unwrap_or_default();
        let title = if task.completed {
            self.paint(task.title.as_str(), |s| s.dimmed())
        } else {
            task.title.clone()
        };
        let fraction = task
            .completion_fraction()
            .map(|f| format!(" {}", self.paint(format!("[{}]", f), |s| s.cyan())))
            .unwrap_or_default();

        let _ = writeln!(
            out,
            "{}{}{} {}{}{}",
            "  ".repeat(depth),
            marker,
            checkbox,
            self.paint(id, |s| s.dimmed()),
            title,
            fraction
        );

        if task.is_expanded {
            for child in &task.subtasks {
                self.render_task(child, depth + 1, out);
            }
        }
    }

    pub fn error_prefix(&self) -> String {
        self.paint("error:", |s| s.red().bold())
    }

    pub fn render_notice(&self, notice: &Notice) -> String {
        format!("{} {}", self.error_prefix(), notice)
    }
}
