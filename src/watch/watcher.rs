// src/watch/watcher.rs

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::engine::RuntimeEvent;
use crate::errors::{PipelineError, Result};
use crate::watch::bindings::BindingTable;
use crate::watch::debounce::Debouncer;

/// Handle for the filesystem watcher.
///
/// Keeps the underlying `RecommendedWatcher` alive. Dropping this handle
/// stops file watching and the debounce loop.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
    debounce: JoinHandle<()>,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish_non_exhaustive()
    }
}

impl Drop for WatcherHandle {
    fn drop(&mut self) {
        self.debounce.abort();
    }
}

/// Watch `root` recursively and send debounced `RuntimeEvent::TaskTriggered`
/// events for the tasks bound to changed paths.
///
/// Fails with [`PipelineError::WatchSetup`] if `root` is not a readable
/// directory or the platform watcher cannot be installed.
pub fn spawn_watcher(
    root: impl Into<PathBuf>,
    table: BindingTable,
    debounce: Duration,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) -> Result<WatcherHandle> {
    let root = root.into();
    if !root.is_dir() {
        return Err(PipelineError::WatchSetup(format!(
            "watch root {:?} is not a directory",
            root
        )));
    }
    // Canonicalize once so we have a stable base path.
    let root = root
        .canonicalize()
        .map_err(|e| PipelineError::WatchSetup(format!("cannot resolve {:?}: {e}", root)))?;

    // Channel from the blocking notify callback into the async world.
    let (path_tx, path_rx) = mpsc::unbounded_channel::<PathBuf>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if matches!(event.kind, EventKind::Access(_)) {
                    return;
                }
                for path in event.paths {
                    if path_tx.send(path).is_err() {
                        return;
                    }
                }
            }
            Err(err) => warn!("file watch error: {err}"),
        },
        Config::default(),
    )
    .map_err(|e| PipelineError::WatchSetup(format!("creating watcher: {e}")))?;

    watcher
        .watch(&root, RecursiveMode::Recursive)
        .map_err(|e| PipelineError::WatchSetup(format!("watching {:?}: {e}", root)))?;

    info!(root = ?root, bindings = table.bindings().len(), "file watcher started");

    let debouncer = Debouncer::new(root, Arc::new(table), debounce, runtime_tx);
    let debounce = tokio::spawn(async move {
        debouncer.run(path_rx).await;
        debug!("watcher event loop finished");
    });

    Ok(WatcherHandle {
        _inner: watcher,
        debounce,
    })
}
