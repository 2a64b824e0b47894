// src/engine/runtime.rs

use std::fmt;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::errors::Result;
use crate::exec::ExecutorBackend;

use super::core::CoreRuntime;
use super::{CoreCommand, RuntimeEvent};

/// Drives the core in response to `RuntimeEvent`s and delegates the actual
/// task runs to an `ExecutorBackend`.
///
/// All semantics live in `CoreRuntime`; this struct only does the async IO:
/// reading events from the channel and dispatching tasks.
pub struct Runtime<E: ExecutorBackend> {
    core: CoreRuntime,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    executor: E,
}

impl<E: ExecutorBackend> fmt::Debug for Runtime<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl<E: ExecutorBackend> Runtime<E> {
    pub fn new(core: CoreRuntime, event_rx: mpsc::Receiver<RuntimeEvent>, executor: E) -> Self {
        Self {
            core,
            event_rx,
            executor,
        }
    }

    /// Feed events to the core until it asks to stop or every sender is
    /// gone. Hands back the core so callers can read its counters.
    pub async fn run(mut self) -> Result<CoreRuntime> {
        debug!("runtime loop entered");

        while let Some(event) = self.event_rx.recv().await {
            debug!(?event, "event");
            let step = self.core.step(event);

            for command in step.commands {
                match command {
                    CoreCommand::Dispatch(task) => {
                        debug!(task = %task.name(), kind = %task.kind(), "dispatch");
                        self.executor.spawn_task(task).await?;
                    }
                    CoreCommand::RequestExit => debug!("core requested exit"),
                }
            }

            if !step.keep_running {
                break;
            }
        }

        info!(
            runs = self.core.completed_runs(),
            failed = self.core.failed_runs(),
            in_flight = self.core.running.len(),
            "runtime stopped"
        );
        Ok(self.core)
    }
}
