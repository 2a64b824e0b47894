// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use tracing::{debug, error, info, warn};

use crate::dag::{RunResult, Task};
use crate::engine::core::CoreRuntime;
use crate::engine::{TaskName, TriggerReason};

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone)]
pub enum CoreCommand {
    /// Hand this task to the executor.
    Dispatch(Task),
    /// Request that the runtime exits (used with `exit_when_idle`).
    RequestExit,
}

/// Decision returned by the core after handling a single `RuntimeEvent`.
#[derive(Debug, Clone)]
pub struct CoreStep {
    /// Commands the IO shell should execute.
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

/// Handle a task trigger event.
///
/// - Unknown tasks are ignored (bindings are validated at startup).
/// - If the task, or any task sharing one of its leaves, is in flight, the
///   trigger is queued; queued triggers for the same task coalesce.
/// - Otherwise the task is dispatched immediately.
pub fn handle_task_trigger(
    core: &mut CoreRuntime,
    task: TaskName,
    reason: TriggerReason,
) -> CoreStep {
    let mut commands = Vec::new();

    match core.graph.get(&task).cloned() {
        None => {
            warn!(task = %task, ?reason, "trigger for unknown task ignored");
        }
        Some(resolved) => {
            if can_start(core, &resolved) {
                debug!(task = %task, ?reason, "dispatching triggered task");
                commands.push(start(core, resolved));
            } else {
                info!(task = %task, ?reason, "task busy; rerun queued");
                core.queue.record_trigger(&task);
            }
        }
    }

    CoreStep {
        commands,
        keep_running: true,
    }
}

/// Handle a task completion event.
///
/// Releases the task's leaves, reports the outcome, then starts every
/// queued rerun that is no longer blocked.
pub fn handle_task_completion(
    core: &mut CoreRuntime,
    task: TaskName,
    result: &RunResult,
) -> CoreStep {
    let mut commands = Vec::new();

    match core.running.remove(&task) {
        Some(leaves) => {
            for leaf in leaves {
                core.busy_leaves.remove(&leaf);
            }
        }
        None => {
            warn!(task = %task, "completion for a task that was not running");
        }
    }

    core.completed_runs += 1;
    if result.succeeded() {
        info!(task = %task, elapsed_ms = result.elapsed().as_millis() as u64, "run succeeded");
    } else {
        core.failed_runs += 1;
        // Failures never stop the watch loop; the next change retriggers.
        error!(task = %task, "{}; waiting for the next change", result.summary());
    }

    let graph = core.graph.clone();
    let mut reserved: Vec<Task> = Vec::new();
    let ready = core.queue.drain_ready(|name| {
        let Some(candidate) = graph.get(name) else {
            return false;
        };
        let free = !core.running.contains_key(name)
            && candidate
                .leaves()
                .iter()
                .all(|l| !core.busy_leaves.contains(l.name()))
            && reserved.iter().all(|r| !shares_leaves(r, candidate));
        if free {
            reserved.push(candidate.clone());
        }
        free
    });
    debug_assert_eq!(ready.len(), reserved.len());

    for resolved in reserved {
        commands.push(start(core, resolved));
    }

    let mut keep_running = true;
    if core.options.exit_when_idle && core.is_idle() && core.queue.is_empty() {
        keep_running = false;
        commands.push(CoreCommand::RequestExit);
    }

    CoreStep {
        commands,
        keep_running,
    }
}

fn can_start(core: &CoreRuntime, task: &Task) -> bool {
    !core.running.contains_key(task.name())
        && task
            .leaves()
            .iter()
            .all(|l| !core.busy_leaves.contains(l.name()))
}

fn shares_leaves(a: &Task, b: &Task) -> bool {
    let a_leaves = a.leaves();
    b.leaves()
        .iter()
        .any(|bl| a_leaves.iter().any(|al| al.name() == bl.name()))
}

fn start(core: &mut CoreRuntime, task: Task) -> CoreCommand {
    let leaves: Vec<TaskName> = task.leaves().iter().map(|l| l.name().to_string()).collect();
    core.busy_leaves.extend(leaves.iter().cloned());
    core.running.insert(task.name().to_string(), leaves);
    CoreCommand::Dispatch(task)
}
