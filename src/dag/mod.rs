// src/dag/mod.rs

//! Task graph representation and scheduling.
//!
//! - [`task`] defines transformation units, leaf tasks and composites.
//! - [`graph`] holds the builder that validates declarations (unknown
//!   children, duplicates, cycles) and the immutable [`TaskGraph`] it yields.
//! - [`scheduler`] executes a task tree once.
//! - [`result`] contains the per-run outcome records.

pub mod graph;
pub mod result;
pub mod scheduler;
pub mod task;

pub use graph::{TaskGraph, TaskGraphBuilder};
pub use result::{RunResult, TaskFailure, TaskState};
pub use scheduler::Scheduler;
pub use task::{unit_fn, CompositeTask, LeafTask, Task, TaskKind, TransformUnit, UnitFuture};
