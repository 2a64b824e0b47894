// src/dag/scheduler.rs

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::time::Instant;

use futures::FutureExt;
use futures::future::join_all;
use tracing::{debug, error, info, warn};

use crate::dag::result::{RunResult, TaskState};
use crate::dag::task::{CompositeTask, LeafTask, Task, TaskKind};
use crate::reload::ReloadNotifier;

type RunFuture<'a> = Pin<Box<dyn Future<Output = RunResult> + Send + 'a>>;

/// Executes task trees.
///
/// - `Sequence`: children run strictly in order; the first failure aborts
///   the remaining siblings.
/// - `Parallel`: all children are polled concurrently on the current task
///   and every one of them runs to completion. The aggregate fails if any
///   child failed and lists all leaf failures (collect-all policy).
/// - Leaf errors and panics become failed [`RunResult`]s; nothing a unit
///   does can take the process down.
///
/// Cloning is cheap; the scheduler itself holds no per-run state.
#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    notifier: Option<ReloadNotifier>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scheduler that notifies viewers after reload-relevant leaves succeed.
    pub fn with_notifier(notifier: ReloadNotifier) -> Self {
        Self {
            notifier: Some(notifier),
        }
    }

    /// Run `task` to completion and report its outcome.
    pub async fn run(&self, task: &Task) -> RunResult {
        let result = self.run_node(task).await;
        if result.succeeded() {
            info!(
                task = %result.name,
                elapsed_ms = result.elapsed().as_millis() as u64,
                "run finished"
            );
        } else {
            error!(task = %result.name, "{}", result.summary());
        }
        result
    }

    fn run_node<'a>(&'a self, task: &'a Task) -> RunFuture<'a> {
        Box::pin(async move {
            match task {
                Task::Leaf(leaf) => self.run_leaf(leaf).await,
                Task::Sequence(c) => self.run_sequence(c).await,
                Task::Parallel(c) => self.run_parallel(c).await,
            }
        })
    }

    async fn run_leaf(&self, leaf: &LeafTask) -> RunResult {
        let name = leaf.name();
        debug!(task = %name, state = %TaskState::Pending, "task queued");

        let started = Instant::now();
        info!(task = %name, state = %TaskState::Running, "task started");

        // The unit is invoked inside the guarded future so that a panic while
        // building its future is caught as well.
        let outcome = AssertUnwindSafe(async { leaf.unit().run().await })
            .catch_unwind()
            .await;

        let result = match outcome {
            Ok(Ok(())) => RunResult::leaf_success(name, started),
            Ok(Err(err)) => RunResult::leaf_failure(name, format!("{err:#}"), started),
            Err(panic) => RunResult::leaf_failure(name, panic_message(panic), started),
        };

        let elapsed_ms = result.elapsed().as_millis() as u64;
        match result.state {
            TaskState::Succeeded => {
                info!(task = %name, state = %result.state, elapsed_ms, "task finished");
                if let (Some(notifier), Some(kind)) = (&self.notifier, leaf.reload()) {
                    notifier.notify(name, kind);
                }
            }
            _ => {
                let cause = result
                    .failures
                    .first()
                    .map(|f| f.cause.as_str())
                    .unwrap_or_default();
                error!(task = %name, state = %result.state, elapsed_ms, cause, "task failed");
            }
        }

        result
    }

    async fn run_sequence(&self, composite: &CompositeTask) -> RunResult {
        let started = Instant::now();
        let children = composite.children();
        let mut results = Vec::with_capacity(children.len());

        for (idx, child) in children.iter().enumerate() {
            let result = self.run_node(child).await;
            let failed = !result.succeeded();
            results.push(result);

            if failed {
                let skipped: Vec<&str> = children[idx + 1..].iter().map(|c| c.name()).collect();
                if !skipped.is_empty() {
                    warn!(
                        sequence = %composite.name(),
                        failed = %child.name(),
                        ?skipped,
                        "aborting remaining sequence steps"
                    );
                }
                break;
            }
        }

        RunResult::composite(composite.name(), TaskKind::Sequence, results, started)
    }

    async fn run_parallel(&self, composite: &CompositeTask) -> RunResult {
        let started = Instant::now();
        debug!(
            parallel = %composite.name(),
            branches = composite.children().len(),
            "starting parallel branches"
        );

        let results = join_all(composite.children().iter().map(|c| self.run_node(c))).await;
        RunResult::composite(composite.name(), TaskKind::Parallel, results, started)
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_string()
    }
}
