// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! This module contains a synchronous, deterministic "core runtime" that
//! consumes [`RuntimeEvent`]s and produces:
//! - an updated core state
//! - a list of "commands" describing what the IO shell should do next
//!
//! The async shell (`engine::runtime::Runtime`) is responsible for reading
//! events from channels, handing tasks to the executor and handling
//! shutdown. The core can be unit tested without Tokio, channels, the
//! filesystem or real transformation units.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::dag::TaskGraph;
use crate::engine::event_handlers::{handle_task_completion, handle_task_trigger, CoreStep};
use crate::engine::queue::RerunQueue;
use crate::engine::{RuntimeEvent, RuntimeOptions, TaskName};

/// Pure core runtime state.
///
/// Owns:
/// - the task graph (to resolve triggered names)
/// - the set of in-flight runs and the leaves each one occupies
/// - the rerun queue
#[derive(Debug)]
pub struct CoreRuntime {
    pub(crate) graph: Arc<TaskGraph>,
    /// In-flight task name -> leaves it occupies.
    pub(crate) running: HashMap<TaskName, Vec<TaskName>>,
    pub(crate) busy_leaves: HashSet<TaskName>,
    pub(crate) queue: RerunQueue,
    pub(crate) options: RuntimeOptions,
    pub(crate) completed_runs: u64,
    pub(crate) failed_runs: u64,
}

impl CoreRuntime {
    pub fn new(graph: Arc<TaskGraph>, options: RuntimeOptions) -> Self {
        Self {
            graph,
            running: HashMap::new(),
            busy_leaves: HashSet::new(),
            queue: RerunQueue::new(),
            options,
            completed_runs: 0,
            failed_runs: 0,
        }
    }

    /// Nothing is running.
    pub fn is_idle(&self) -> bool {
        self.running.is_empty()
    }

    pub fn queue_is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn is_queued(&self, task: &str) -> bool {
        self.queue.contains(task)
    }

    /// Number of runs that finished (successfully or not).
    pub fn completed_runs(&self) -> u64 {
        self.completed_runs
    }

    pub fn failed_runs(&self) -> u64 {
        self.failed_runs
    }

    /// Handle a single runtime event, updating core state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        match event {
            RuntimeEvent::TaskTriggered { task, reason } => {
                handle_task_trigger(self, task, reason)
            }
            RuntimeEvent::TaskCompleted { task, result } => {
                handle_task_completion(self, task, &result)
            }
            RuntimeEvent::ShutdownRequested => CoreStep {
                commands: Vec::new(),
                keep_running: false,
            },
        }
    }
}
