// src/reload/registry.rs

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::debug;

use super::ReloadEvent;

/// Events buffered per viewer before new ones are dropped.
const VIEWER_BUFFER: usize = 16;

/// Set of connected viewer sessions.
///
/// Cloning shares the same set.
#[derive(Debug, Clone, Default)]
pub struct ViewerRegistry {
    inner: Arc<Mutex<RegistryInner>>,
}

#[derive(Debug, Default)]
struct RegistryInner {
    next_id: u64,
    viewers: HashMap<u64, mpsc::Sender<ReloadEvent>>,
}

impl ViewerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RegistryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a new viewer. The session leaves the registry when dropped.
    pub fn connect(&self) -> ViewerSession {
        let (tx, rx) = mpsc::channel(VIEWER_BUFFER);
        let id = {
            let mut inner = self.lock();
            inner.next_id += 1;
            let id = inner.next_id;
            inner.viewers.insert(id, tx);
            id
        };
        debug!(viewer = id, "viewer connected");
        ViewerSession {
            id,
            registry: self.clone(),
            rx,
        }
    }

    fn disconnect(&self, id: u64) {
        if self.lock().viewers.remove(&id).is_some() {
            debug!(viewer = id, "viewer disconnected");
        }
    }

    /// Number of connected viewers.
    pub fn len(&self) -> usize {
        self.lock().viewers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Push `event` to every viewer without waiting.
    ///
    /// Viewers whose buffer is full miss this event; closed viewers are
    /// pruned. Returns how many viewers accepted the event.
    pub fn broadcast(&self, event: &ReloadEvent) -> usize {
        let mut inner = self.lock();
        let mut delivered = 0;
        inner.viewers.retain(|id, tx| match tx.try_send(event.clone()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(TrySendError::Full(_)) => {
                debug!(viewer = *id, "viewer buffer full; dropping reload event");
                true
            }
            Err(TrySendError::Closed(_)) => false,
        });
        delivered
    }
}

/// Receiving end of one viewer connection.
#[derive(Debug)]
pub struct ViewerSession {
    id: u64,
    registry: ViewerRegistry,
    rx: mpsc::Receiver<ReloadEvent>,
}

impl ViewerSession {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub async fn recv(&mut self) -> Option<ReloadEvent> {
        self.rx.recv().await
    }

    /// Next buffered event, if any, without waiting.
    pub fn try_recv(&mut self) -> Option<ReloadEvent> {
        self.rx.try_recv().ok()
    }
}

impl Stream for ViewerSession {
    type Item = ReloadEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().rx.poll_recv(cx)
    }
}

impl Drop for ViewerSession {
    fn drop(&mut self) {
        self.registry.disconnect(self.id);
    }
}
