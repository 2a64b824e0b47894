// src/exec/backend.rs

//! Pluggable executor backend abstraction.
//!
//! The runtime talks to an `ExecutorBackend` instead of calling the
//! scheduler directly. This makes it easy to swap in a fake executor in
//! tests while production uses [`SchedulerBackend`].

use std::future::Future;
use std::pin::Pin;

use tokio::sync::mpsc;
use tracing::warn;

use crate::dag::{Scheduler, Task};
use crate::engine::RuntimeEvent;
use crate::errors::Result;

/// Trait abstracting how dispatched tasks are executed.
pub trait ExecutorBackend: Send {
    /// Start running `task`.
    ///
    /// Implementations must not wait for the run to finish; completion is
    /// reported asynchronously through `RuntimeEvent::TaskCompleted`.
    fn spawn_task(&mut self, task: Task) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Production backend: one Tokio task per run, executed by the scheduler.
#[derive(Debug, Clone)]
pub struct SchedulerBackend {
    scheduler: Scheduler,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
}

impl SchedulerBackend {
    pub fn new(scheduler: Scheduler, runtime_tx: mpsc::Sender<RuntimeEvent>) -> Self {
        Self {
            scheduler,
            runtime_tx,
        }
    }
}

impl ExecutorBackend for SchedulerBackend {
    fn spawn_task(&mut self, task: Task) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let scheduler = self.scheduler.clone();
        let tx = self.runtime_tx.clone();

        Box::pin(async move {
            tokio::spawn(async move {
                let result = scheduler.run(&task).await;
                let event = RuntimeEvent::TaskCompleted {
                    task: task.name().to_string(),
                    result: Box::new(result),
                };
                if let Err(err) = tx.send(event).await {
                    warn!(task = %task.name(), "runtime gone before completion was reported: {err}");
                }
            });
            Ok(())
        })
    }
}
