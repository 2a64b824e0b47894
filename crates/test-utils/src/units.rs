//! Instrumented transformation units.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::anyhow;
use assetpipe::dag::{unit_fn, LeafTask, TransformUnit};

/// One recorded unit execution.
#[derive(Debug, Clone)]
pub struct Span {
    pub name: String,
    pub started: Instant,
    pub finished: Instant,
}

/// Shared record of unit executions, in start order.
#[derive(Debug, Clone, Default)]
pub struct RunLog {
    spans: Arc<Mutex<Vec<Span>>>,
    started: Arc<Mutex<Vec<String>>>,
}

impl RunLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of units that started, in start order.
    pub fn started(&self) -> Vec<String> {
        self.started.lock().unwrap().clone()
    }

    /// Finished executions, in finish order.
    pub fn spans(&self) -> Vec<Span> {
        self.spans.lock().unwrap().clone()
    }

    pub fn span(&self, name: &str) -> Option<Span> {
        self.spans().into_iter().find(|s| s.name == name)
    }

    pub fn count(&self, name: &str) -> usize {
        self.started().iter().filter(|n| *n == name).count()
    }

    fn start(&self, name: &str) -> Instant {
        self.started.lock().unwrap().push(name.to_string());
        Instant::now()
    }

    fn finish(&self, name: &str, started: Instant) {
        self.spans.lock().unwrap().push(Span {
            name: name.to_string(),
            started,
            finished: Instant::now(),
        });
    }
}

/// Unit that records itself, optionally sleeps, then succeeds or fails.
pub fn timed_unit(
    name: &str,
    log: &RunLog,
    delay: Duration,
    fail: bool,
) -> Arc<dyn TransformUnit> {
    let log = log.clone();
    let name = name.to_string();
    unit_fn(move || {
        let log = log.clone();
        let name = name.clone();
        async move {
            let started = log.start(&name);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            log.finish(&name, started);
            if fail {
                Err(anyhow!("{name} failed on purpose"))
            } else {
                Ok(())
            }
        }
    })
}

/// Leaf task whose unit records itself and succeeds immediately.
pub fn recording_leaf(name: &str, log: &RunLog) -> LeafTask {
    LeafTask::new(name, timed_unit(name, log, Duration::ZERO, false))
}

/// Leaf task whose unit records itself and fails immediately.
pub fn failing_leaf(name: &str, log: &RunLog) -> LeafTask {
    LeafTask::new(name, timed_unit(name, log, Duration::ZERO, true))
}

/// Leaf task whose unit records itself and succeeds after `delay`.
pub fn slow_leaf(name: &str, log: &RunLog, delay: Duration) -> LeafTask {
    LeafTask::new(name, timed_unit(name, log, delay, false))
}

/// Unit that counts its invocations and takes `delay` to finish.
pub fn counting_unit(counter: Arc<AtomicUsize>, delay: Duration) -> Arc<dyn TransformUnit> {
    unit_fn(move || {
        let counter = Arc::clone(&counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(delay).await;
            Ok(())
        }
    })
}

/// Unit that fails its first `failures` invocations and succeeds after.
pub fn flaky_unit(counter: Arc<AtomicUsize>, failures: usize) -> Arc<dyn TransformUnit> {
    unit_fn(move || {
        let counter = Arc::clone(&counter);
        async move {
            let call = counter.fetch_add(1, Ordering::SeqCst);
            if call < failures {
                Err(anyhow!("compile error in run {}", call + 1))
            } else {
                Ok(())
            }
        }
    })
}
