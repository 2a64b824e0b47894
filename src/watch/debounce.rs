// src/watch/debounce.rs

//! Turns a stream of raw changed paths into debounced task triggers.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, warn};

use crate::engine::{RuntimeEvent, TriggerReason};
use crate::types::TaskName;
use crate::watch::bindings::BindingTable;
use crate::watch::path_utils::relative_str;

/// Batches bound paths until no new one arrives for `window`, then triggers
/// every distinct task of the batch once.
///
/// Paths that match no binding neither open nor extend a batch.
#[derive(Debug)]
pub struct Debouncer {
    root: PathBuf,
    table: Arc<BindingTable>,
    window: Duration,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
}

impl Debouncer {
    pub fn new(
        root: impl Into<PathBuf>,
        table: Arc<BindingTable>,
        window: Duration,
        runtime_tx: mpsc::Sender<RuntimeEvent>,
    ) -> Self {
        Self {
            root: root.into(),
            table,
            window,
            runtime_tx,
        }
    }

    /// Consume `paths` until the sender side closes or the runtime is gone.
    pub async fn run(self, mut paths: mpsc::UnboundedReceiver<PathBuf>) {
        let mut batch: Vec<TaskName> = Vec::new();

        'outer: loop {
            // Idle: wait for the first bound path.
            loop {
                let Some(path) = paths.recv().await else {
                    break 'outer;
                };
                if self.collect(&path, &mut batch) {
                    break;
                }
            }

            let mut deadline = Instant::now() + self.window;
            loop {
                match timeout_at(deadline, paths.recv()).await {
                    Ok(Some(path)) => {
                        if self.collect(&path, &mut batch) {
                            deadline = Instant::now() + self.window;
                        }
                    }
                    Ok(None) => break 'outer,
                    Err(_) => break,
                }
            }

            if !self.flush(&mut batch).await {
                return;
            }
        }

        // Source closed mid-batch: still deliver what was collected.
        self.flush(&mut batch).await;
        debug!("debounce loop finished");
    }

    /// Add the tasks bound to `path`; true if any binding matched.
    fn collect(&self, path: &std::path::Path, batch: &mut Vec<TaskName>) -> bool {
        let Some(rel) = relative_str(&self.root, path) else {
            debug!(?path, "event outside the watched root");
            return false;
        };
        let tasks = self.table.tasks_for(&rel);
        if tasks.is_empty() {
            return false;
        }
        debug!(path = %rel, ?tasks, "change matched watch bindings");
        for task in tasks {
            if !batch.iter().any(|t| t == task) {
                batch.push(task.to_string());
            }
        }
        true
    }

    /// Trigger every task of the batch. False once the runtime is gone.
    async fn flush(&self, batch: &mut Vec<TaskName>) -> bool {
        for task in batch.drain(..) {
            debug!(task = %task, "debounce window closed; triggering");
            let event = RuntimeEvent::TaskTriggered {
                task,
                reason: TriggerReason::FileWatch,
            };
            if let Err(err) = self.runtime_tx.send(event).await {
                warn!("failed to send RuntimeEvent::TaskTriggered: {err}");
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::{unit_fn, LeafTask, TaskGraphBuilder};
    use crate::watch::WatchBinding;

    fn table() -> Arc<BindingTable> {
        let mut b = TaskGraphBuilder::new();
        b.define_task(LeafTask::new("styles", unit_fn(|| async { Ok(()) })))
            .define_task(LeafTask::new("html", unit_fn(|| async { Ok(()) })));
        let graph = b.build().unwrap();
        Arc::new(
            BindingTable::compile(
                vec![
                    WatchBinding::new("src/scss/**/*.scss", "styles"),
                    WatchBinding::new("src/**/*.html", "html"),
                ],
                &graph,
            )
            .unwrap(),
        )
    }

    fn triggered(ev: RuntimeEvent) -> String {
        match ev {
            RuntimeEvent::TaskTriggered { task, reason } => {
                assert_eq!(reason, TriggerReason::FileWatch);
                task
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn burst_of_events_triggers_each_task_once() {
        let (raw_tx, raw_rx) = mpsc::unbounded_channel();
        let (rt_tx, mut rt_rx) = mpsc::channel(16);
        let debouncer = Debouncer::new("/proj", table(), Duration::from_millis(200), rt_tx);
        let handle = tokio::spawn(debouncer.run(raw_rx));

        for i in 0..5 {
            raw_tx
                .send(PathBuf::from(format!("/proj/src/scss/part{i}.scss")))
                .unwrap();
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        raw_tx.send(PathBuf::from("/proj/src/index.html")).unwrap();
        raw_tx.send(PathBuf::from("/proj/notes.txt")).unwrap();

        assert_eq!(triggered(rt_rx.recv().await.unwrap()), "styles");
        assert_eq!(triggered(rt_rx.recv().await.unwrap()), "html");

        drop(raw_tx);
        handle.await.unwrap();
        assert!(rt_rx.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn separate_bursts_trigger_separately() {
        let (raw_tx, raw_rx) = mpsc::unbounded_channel();
        let (rt_tx, mut rt_rx) = mpsc::channel(16);
        let debouncer = Debouncer::new("/proj", table(), Duration::from_millis(100), rt_tx);
        tokio::spawn(debouncer.run(raw_rx));

        raw_tx.send(PathBuf::from("/proj/src/a.html")).unwrap();
        assert_eq!(triggered(rt_rx.recv().await.unwrap()), "html");

        tokio::time::sleep(Duration::from_millis(500)).await;
        raw_tx.send(PathBuf::from("/proj/src/b.html")).unwrap();
        assert_eq!(triggered(rt_rx.recv().await.unwrap()), "html");
    }

    #[tokio::test(start_paused = true)]
    async fn unbound_paths_do_not_trigger() {
        let (raw_tx, raw_rx) = mpsc::unbounded_channel();
        let (rt_tx, mut rt_rx) = mpsc::channel(16);
        let debouncer = Debouncer::new("/proj", table(), Duration::from_millis(50), rt_tx);
        let handle = tokio::spawn(debouncer.run(raw_rx));

        raw_tx.send(PathBuf::from("/proj/app/index.html")).unwrap();
        raw_tx.send(PathBuf::from("/elsewhere/src/x.html")).unwrap();
        drop(raw_tx);

        handle.await.unwrap();
        assert!(rt_rx.recv().await.is_none());
    }
}
