// src/reload/mod.rs

//! Live-reload channel.
//!
//! - [`registry`] keeps the set of connected viewer sessions. It is created
//!   at watch start, handed explicitly to the notifier and the server, and
//!   dropped when the process stops.
//! - [`notifier`] is what the scheduler calls after a reload-relevant task
//!   succeeded.
//! - [`server`] serves the output directory and streams reload events to
//!   browsers over Server-Sent Events.

pub mod notifier;
pub mod registry;
pub mod server;

use crate::types::{ReloadKind, TaskName};

/// Event pushed to every connected viewer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReloadEvent {
    pub kind: ReloadKind,
    /// Task whose output changed.
    pub task: TaskName,
}

pub use notifier::ReloadNotifier;
pub use registry::{ViewerRegistry, ViewerSession};
pub use server::{spawn_server, ServerHandle};
