// src/dag/task.rs

//! Task model: transformation units, leaf tasks and composites.

use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use crate::types::{ReloadKind, TaskName};

/// Future returned by a [`TransformUnit`].
pub type UnitFuture<'a> = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>>;

/// One opaque build step: read some inputs, transform, write an output.
///
/// Style compilation, bundling, font conversion, copying and uploading are
/// all units. The scheduler only sees completion or failure.
pub trait TransformUnit: Send + Sync {
    fn run(&self) -> UnitFuture<'_>;
}

/// Adapter turning an async closure into a [`TransformUnit`].
pub struct FnUnit<F>(F);

impl<F, Fut> TransformUnit for FnUnit<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    fn run(&self) -> UnitFuture<'_> {
        Box::pin((self.0)())
    }
}

/// Wrap an async closure as a shareable unit.
pub fn unit_fn<F, Fut>(f: F) -> Arc<dyn TransformUnit>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(FnUnit(f))
}

/// A named unit of build work plus the metadata the watcher, the reload
/// notifier and diagnostics care about.
#[derive(Clone)]
pub struct LeafTask {
    name: TaskName,
    unit: Arc<dyn TransformUnit>,
    inputs: Vec<String>,
    output: Option<PathBuf>,
    reload: Option<ReloadKind>,
}

impl fmt::Debug for LeafTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LeafTask")
            .field("name", &self.name)
            .field("inputs", &self.inputs)
            .field("output", &self.output)
            .field("reload", &self.reload)
            .finish_non_exhaustive()
    }
}

impl LeafTask {
    pub fn new(name: impl Into<TaskName>, unit: Arc<dyn TransformUnit>) -> Self {
        Self {
            name: name.into(),
            unit,
            inputs: Vec::new(),
            output: None,
            reload: None,
        }
    }

    /// Input path patterns (informational; watching is driven by bindings).
    pub fn with_inputs<I, S>(mut self, inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inputs = inputs.into_iter().map(Into::into).collect();
        self
    }

    /// Directory this task owns and writes into.
    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = Some(output.into());
        self
    }

    /// Viewers are notified with `kind` after every successful run.
    pub fn with_reload(mut self, kind: ReloadKind) -> Self {
        self.reload = Some(kind);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unit(&self) -> &Arc<dyn TransformUnit> {
        &self.unit
    }

    pub fn inputs(&self) -> &[String] {
        &self.inputs
    }

    pub fn output(&self) -> Option<&Path> {
        self.output.as_deref()
    }

    pub fn reload(&self) -> Option<ReloadKind> {
        self.reload
    }
}

/// Ordered (`Sequence`) or concurrent (`Parallel`) group of tasks.
#[derive(Debug, Clone)]
pub struct CompositeTask {
    name: TaskName,
    children: Vec<Task>,
}

impl CompositeTask {
    pub(crate) fn new(name: TaskName, children: Vec<Task>) -> Self {
        Self { name, children }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn children(&self) -> &[Task] {
        &self.children
    }
}

/// Coarse shape of a task, for logs and dry-run output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    Leaf,
    Sequence,
    Parallel,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskKind::Leaf => f.write_str("task"),
            TaskKind::Sequence => f.write_str("sequence"),
            TaskKind::Parallel => f.write_str("parallel"),
        }
    }
}

/// A resolved, immutable task tree. Cloning is cheap.
#[derive(Debug, Clone)]
pub enum Task {
    Leaf(Arc<LeafTask>),
    Sequence(Arc<CompositeTask>),
    Parallel(Arc<CompositeTask>),
}

impl Task {
    pub fn name(&self) -> &str {
        match self {
            Task::Leaf(leaf) => leaf.name(),
            Task::Sequence(c) | Task::Parallel(c) => c.name(),
        }
    }

    pub fn kind(&self) -> TaskKind {
        match self {
            Task::Leaf(_) => TaskKind::Leaf,
            Task::Sequence(_) => TaskKind::Sequence,
            Task::Parallel(_) => TaskKind::Parallel,
        }
    }

    /// Direct children; empty for leaves.
    pub fn children(&self) -> &[Task] {
        match self {
            Task::Leaf(_) => &[],
            Task::Sequence(c) | Task::Parallel(c) => c.children(),
        }
    }

    /// All leaves reachable from this task, depth-first in declaration order.
    pub fn leaves(&self) -> Vec<&LeafTask> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(task) = stack.pop() {
            match task {
                Task::Leaf(leaf) => out.push(leaf.as_ref()),
                Task::Sequence(c) | Task::Parallel(c) => {
                    stack.extend(c.children().iter().rev());
                }
            }
        }
        out
    }
}
