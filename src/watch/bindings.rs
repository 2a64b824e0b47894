// src/watch/bindings.rs

use std::collections::HashMap;
use std::fmt;

use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::dag::TaskGraph;
use crate::errors::{PipelineError, Result};
use crate::types::TaskName;

/// One glob pattern bound to one task.
///
/// Patterns are relative to the project root and use forward slashes, e.g.
/// `"src/scss/**/*.scss"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchBinding {
    pub pattern: String,
    pub task: TaskName,
}

impl WatchBinding {
    pub fn new(pattern: impl Into<String>, task: impl Into<TaskName>) -> Self {
        Self {
            pattern: pattern.into(),
            task: task.into(),
        }
    }
}

/// Compiled binding table: relative path -> tasks to trigger.
#[derive(Clone)]
pub struct BindingTable {
    bindings: Vec<WatchBinding>,
    set: GlobSet,
}

impl fmt::Debug for BindingTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingTable")
            .field("bindings", &self.bindings)
            .finish_non_exhaustive()
    }
}

impl BindingTable {
    /// Compile `bindings` and check them against `graph`.
    ///
    /// Fails if a pattern does not compile, a task is unknown, or the same
    /// pattern is bound to two different tasks.
    pub fn compile(bindings: Vec<WatchBinding>, graph: &TaskGraph) -> Result<Self> {
        let mut owners: HashMap<&str, &str> = HashMap::new();
        let mut builder = GlobSetBuilder::new();

        for binding in &bindings {
            if !graph.contains(&binding.task) {
                return Err(PipelineError::ConfigError(format!(
                    "watch pattern '{}' is bound to unknown task '{}'",
                    binding.pattern, binding.task
                )));
            }
            if let Some(other) = owners.insert(&binding.pattern, &binding.task) {
                if other != binding.task {
                    return Err(PipelineError::ConfigError(format!(
                        "watch pattern '{}' is bound to both '{other}' and '{}'",
                        binding.pattern, binding.task
                    )));
                }
            }
            let glob = Glob::new(&binding.pattern).map_err(|e| {
                PipelineError::ConfigError(format!(
                    "invalid watch pattern '{}': {e}",
                    binding.pattern
                ))
            })?;
            builder.add(glob);
        }

        let set = builder
            .build()
            .map_err(|e| PipelineError::ConfigError(format!("building watch patterns: {e}")))?;

        Ok(Self { bindings, set })
    }

    pub fn bindings(&self) -> &[WatchBinding] {
        &self.bindings
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Distinct tasks bound to `rel_path`, in binding order.
    pub fn tasks_for(&self, rel_path: &str) -> Vec<&str> {
        let mut tasks: Vec<&str> = Vec::new();
        for idx in self.set.matches(rel_path) {
            let task = self.bindings[idx].task.as_str();
            if !tasks.contains(&task) {
                tasks.push(task);
            }
        }
        tasks
    }
}
