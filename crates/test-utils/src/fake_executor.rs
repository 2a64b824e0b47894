use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use tokio::sync::mpsc;
use assetpipe::dag::{RunResult, Task};
use assetpipe::engine::RuntimeEvent;
use assetpipe::exec::ExecutorBackend;
use assetpipe::errors::Result;

/// A fake executor that:
/// - records which tasks were dispatched
/// - immediately reports a successful TaskCompleted for each of them,
///   without running any unit.
pub struct FakeExecutor {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    executed: Arc<Mutex<Vec<String>>>,
}

impl FakeExecutor {
    pub fn new(
        runtime_tx: mpsc::Sender<RuntimeEvent>,
        executed: Arc<Mutex<Vec<String>>>,
    ) -> Self {
        Self { runtime_tx, executed }
    }
}

impl ExecutorBackend for FakeExecutor {
    fn spawn_task(
        &mut self,
        task: Task,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.runtime_tx.clone();
        let executed = Arc::clone(&self.executed);

        Box::pin(async move {
            let name = task.name().to_string();
            executed.lock().unwrap().push(name.clone());

            let result = RunResult::leaf_success(&name, Instant::now());
            tx.send(RuntimeEvent::TaskCompleted {
                task: name,
                result: Box::new(result),
            })
            .await
            .map_err(anyhow::Error::from)?;
            Ok(())
        })
    }
}
