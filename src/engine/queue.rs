// src/engine/queue.rs

use std::collections::BTreeSet;

use tracing::debug;

use super::TaskName;

/// Reruns requested while a task could not start.
///
/// Semantics:
/// - A task is queued at most once: any number of triggers that arrive while
///   it is blocked collapse into a single follow-up run.
/// - Queued entries have not started yet, so a newer trigger simply replaces
///   (coalesces with) the older one.
/// - Entries are drained in name order, which keeps the engine
///   deterministic.
#[derive(Debug, Default)]
pub struct RerunQueue {
    pending: BTreeSet<TaskName>,
}

impl RerunQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn contains(&self, task: &str) -> bool {
        self.pending.contains(task)
    }

    /// Record a trigger for `task`. Returns `false` if it coalesced with an
    /// already queued rerun.
    pub fn record_trigger(&mut self, task: &str) -> bool {
        let inserted = self.pending.insert(task.to_string());
        if inserted {
            debug!(task, "queued rerun");
        } else {
            debug!(task, "coalesced trigger into queued rerun");
        }
        inserted
    }

    /// Remove and return every queued task for which `can_start` holds.
    ///
    /// `can_start` sees tasks in queue order and may update its own state
    /// (e.g. mark leaves as busy) so later entries observe earlier choices.
    pub fn drain_ready(&mut self, mut can_start: impl FnMut(&str) -> bool) -> Vec<TaskName> {
        let ready: Vec<TaskName> = self
            .pending
            .iter()
            .filter(|t| can_start(t.as_str()))
            .cloned()
            .collect();
        for task in &ready {
            self.pending.remove(task);
        }
        if !ready.is_empty() {
            debug!(?ready, "releasing queued reruns");
        }
        ready
    }
}
