// tests/runtime_fake_executor.rs

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use assetpipe::dag::{LeafTask, TaskGraphBuilder, unit_fn};
use assetpipe::engine::{CoreRuntime, Runtime, RuntimeEvent, RuntimeOptions, TriggerReason};
use assetpipe_test_utils::builders::noop_graph;
use assetpipe_test_utils::fake_executor::FakeExecutor;
use assetpipe_test_utils::{init_tracing, with_timeout};

fn trigger(task: &str) -> RuntimeEvent {
    RuntimeEvent::TaskTriggered {
        task: task.to_string(),
        reason: TriggerReason::Manual,
    }
}

#[tokio::test]
async fn dispatches_triggered_tasks_and_exits_when_idle() {
    init_tracing();
    let graph = Arc::new(noop_graph(&["html", "styles"]));
    let executed = Arc::new(Mutex::new(Vec::new()));

    let (tx, rx) = mpsc::channel(16);
    let executor = FakeExecutor::new(tx.clone(), Arc::clone(&executed));
    let core = CoreRuntime::new(graph, RuntimeOptions { exit_when_idle: true });

    tx.send(trigger("html")).await.unwrap();

    let core = with_timeout(Runtime::new(core, rx, executor).run()).await.unwrap();

    assert_eq!(*executed.lock().unwrap(), vec!["html"]);
    assert_eq!(core.completed_runs(), 1);
    assert!(core.is_idle());
}

#[tokio::test]
async fn unknown_trigger_is_ignored_and_shutdown_stops_the_loop() {
    init_tracing();
    let graph = Arc::new(noop_graph(&["html"]));
    let executed = Arc::new(Mutex::new(Vec::new()));

    let (tx, rx) = mpsc::channel(16);
    let executor = FakeExecutor::new(tx.clone(), Arc::clone(&executed));
    let core = CoreRuntime::new(graph, RuntimeOptions::default());

    tx.send(trigger("nope")).await.unwrap();
    tx.send(RuntimeEvent::ShutdownRequested).await.unwrap();

    let core = with_timeout(Runtime::new(core, rx, executor).run()).await.unwrap();
    assert!(executed.lock().unwrap().is_empty());
    assert_eq!(core.completed_runs(), 0);
}

#[tokio::test]
async fn composite_is_dispatched_as_one_unit_of_work() {
    init_tracing();
    let mut b = TaskGraphBuilder::new();
    b.define_task(LeafTask::new("clean", unit_fn(|| async { Ok(()) })))
        .define_task(LeafTask::new("styles", unit_fn(|| async { Ok(()) })))
        .sequence("default", ["clean", "styles"]);
    let graph = Arc::new(b.build().unwrap());
    let executed = Arc::new(Mutex::new(Vec::new()));

    let (tx, rx) = mpsc::channel(16);
    let executor = FakeExecutor::new(tx.clone(), Arc::clone(&executed));
    let core = CoreRuntime::new(graph, RuntimeOptions { exit_when_idle: true });

    tx.send(trigger("default")).await.unwrap();
    let core = with_timeout(Runtime::new(core, rx, executor).run()).await.unwrap();

    assert_eq!(*executed.lock().unwrap(), vec!["default"]);
    assert_eq!(core.completed_runs(), 1);
}
