// src/reload/notifier.rs

use tracing::debug;

use super::{ReloadEvent, ViewerRegistry};
use crate::types::ReloadKind;

/// Signals connected viewers that a task rewrote its output.
///
/// Fire-and-forget: with no viewers connected nothing happens, and the
/// ordering of notifications from different tasks is unspecified.
#[derive(Debug, Clone)]
pub struct ReloadNotifier {
    registry: ViewerRegistry,
}

impl ReloadNotifier {
    pub fn new(registry: ViewerRegistry) -> Self {
        Self { registry }
    }

    /// Push a `kind` event for `task` to all viewers; returns how many
    /// received it.
    pub fn notify(&self, task: &str, kind: ReloadKind) -> usize {
        let event = ReloadEvent {
            kind,
            task: task.to_string(),
        };
        let delivered = self.registry.broadcast(&event);
        debug!(task, %kind, viewers = delivered, "reload notification sent");
        delivered
    }
}
