// src/engine/mod.rs

//! Watch-mode engine: decides which triggered task may start now and which
//! must wait.
//!
//! A trigger whose leaves overlap an in-flight run is parked in the
//! [`queue::RerunQueue`]; any number of such triggers collapse into one
//! follow-up run. [`core::CoreRuntime`] holds that logic with no IO, and
//! [`runtime::Runtime`] pumps channel events into it.

use crate::dag::RunResult;

pub use crate::types::TaskName;

/// Why a task was triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerReason {
    Manual,
    /// A debounced batch of source changes.
    FileWatch,
}

/// Runtime options used by both the core and the async shell.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeOptions {
    /// If true, exit the runtime once nothing is running and nothing is
    /// queued.
    pub exit_when_idle: bool,
}

/// Input to the engine.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// A task should be run.
    TaskTriggered {
        task: TaskName,
        reason: TriggerReason,
    },
    /// A task run finished.
    TaskCompleted {
        task: TaskName,
        result: Box<RunResult>,
    },
    /// Ctrl-C.
    ShutdownRequested,
}

pub mod core;
pub mod event_handlers;
pub mod queue;
pub mod runtime;

pub use core::CoreRuntime;
pub use event_handlers::{CoreCommand, CoreStep};
pub use queue::RerunQueue;
pub use runtime::Runtime;
