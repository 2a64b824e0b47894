// src/dag/result.rs

//! Outcome records produced by the scheduler.

use std::fmt;
use std::time::{Duration, Instant};

use crate::dag::task::TaskKind;
use crate::types::TaskName;

/// Per-run state of a task.
///
/// `Pending -> Running -> {Succeeded, Failed}`; the two terminal states are
/// what a [`RunResult`] records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskState::Pending => "pending",
            TaskState::Running => "running",
            TaskState::Succeeded => "succeeded",
            TaskState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// A leaf failure: which task, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFailure {
    pub task: TaskName,
    pub cause: String,
}

impl fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.task, self.cause)
    }
}

/// Outcome of one task execution.
///
/// Composite results carry the results of the children that actually ran:
/// a failed `Sequence` stops at the failing child, a `Parallel` always lists
/// every child.
#[derive(Debug, Clone)]
pub struct RunResult {
    pub name: TaskName,
    pub kind: TaskKind,
    pub state: TaskState,
    /// Failures of the leaves below (or at) this task, in declaration order.
    pub failures: Vec<TaskFailure>,
    pub children: Vec<RunResult>,
    pub started_at: Instant,
    pub finished_at: Instant,
}

/// Constructors are public so custom `ExecutorBackend`s can report outcomes.
impl RunResult {
    pub fn leaf_success(name: &str, started_at: Instant) -> Self {
        Self {
            name: name.to_string(),
            kind: TaskKind::Leaf,
            state: TaskState::Succeeded,
            failures: Vec::new(),
            children: Vec::new(),
            started_at,
            finished_at: Instant::now(),
        }
    }

    pub fn leaf_failure(name: &str, cause: String, started_at: Instant) -> Self {
        Self {
            name: name.to_string(),
            kind: TaskKind::Leaf,
            state: TaskState::Failed,
            failures: vec![TaskFailure {
                task: name.to_string(),
                cause,
            }],
            children: Vec::new(),
            started_at,
            finished_at: Instant::now(),
        }
    }

    pub fn composite(
        name: &str,
        kind: TaskKind,
        children: Vec<RunResult>,
        started_at: Instant,
    ) -> Self {
        let failures: Vec<TaskFailure> = children
            .iter()
            .flat_map(|c| c.failures.iter().cloned())
            .collect();
        let state = if failures.is_empty() {
            TaskState::Succeeded
        } else {
            TaskState::Failed
        };
        Self {
            name: name.to_string(),
            kind,
            state,
            failures,
            children,
            started_at,
            finished_at: Instant::now(),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.state == TaskState::Succeeded
    }

    pub fn elapsed(&self) -> Duration {
        self.finished_at.saturating_duration_since(self.started_at)
    }

    /// Depth-first search for the result of a named task.
    pub fn find(&self, name: &str) -> Option<&RunResult> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(name))
    }

    /// Names of all leaves that ran, in completion-independent declaration
    /// order.
    pub fn executed_leaves(&self) -> Vec<&str> {
        if self.kind == TaskKind::Leaf {
            return vec![self.name.as_str()];
        }
        self.children
            .iter()
            .flat_map(|c| c.executed_leaves())
            .collect()
    }

    /// One-line summary suitable for logs and error messages.
    pub fn summary(&self) -> String {
        match self.failures.as_slice() {
            [] => format!("{} succeeded in {} ms", self.name, self.elapsed().as_millis()),
            [only] => format!("{} failed: {only}", self.name),
            many => {
                let list: Vec<String> = many.iter().map(|f| f.to_string()).collect();
                format!(
                    "{} failed ({} tasks): {}",
                    self.name,
                    many.len(),
                    list.join("; ")
                )
            }
        }
    }
}
