// src/exec/mod.rs

//! Execution layer.
//!
//! - [`backend`] provides the `ExecutorBackend` trait the watch runtime
//!   talks to, and `SchedulerBackend`, which runs each dispatched task
//!   through the [`Scheduler`](crate::dag::Scheduler) on its own Tokio task
//!   and reports back with `RuntimeEvent::TaskCompleted`. Tests can swap in
//!   a fake backend.
//! - [`command`] runs external tools through the platform shell; it backs
//!   every transformation that is delegated to a third-party program.

pub mod backend;
pub mod command;

pub use backend::{ExecutorBackend, SchedulerBackend};
pub use command::{run_shell, shell_quote, CommandUnit};
