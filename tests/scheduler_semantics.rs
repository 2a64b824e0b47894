// tests/scheduler_semantics.rs

use std::time::Duration;

use assetpipe::dag::{LeafTask, Scheduler, TaskGraphBuilder, TaskState, unit_fn};
use assetpipe::errors::PipelineError;
use assetpipe_test_utils::init_tracing;
use assetpipe_test_utils::units::{failing_leaf, recording_leaf, slow_leaf, RunLog};

#[tokio::test]
async fn failing_first_step_means_second_never_runs() {
    init_tracing();
    let log = RunLog::new();
    let mut b = TaskGraphBuilder::new();
    b.define_task(failing_leaf("A", &log))
        .define_task(recording_leaf("B", &log))
        .sequence("S", ["A", "B"]);
    let graph = b.build().unwrap();

    let result = Scheduler::new().run(&graph.task("S").unwrap()).await;

    assert_eq!(result.state, TaskState::Failed);
    assert_eq!(log.started(), vec!["A"]);
    assert_eq!(result.failures.len(), 1);
    assert_eq!(result.failures[0].task, "A");
    assert!(result.find("B").is_none());
}

#[tokio::test]
async fn parallel_children_overlap_and_all_finish() {
    init_tracing();
    let log = RunLog::new();
    let mut b = TaskGraphBuilder::new();
    b.define_task(slow_leaf("A", &log, Duration::from_millis(80)))
        .define_task(slow_leaf("B", &log, Duration::from_millis(80)))
        .define_task(failing_leaf("F", &log))
        .parallel("P", ["A", "B", "F"]);
    let graph = b.build().unwrap();

    let result = Scheduler::new().run(&graph.task("P").unwrap()).await;

    // The failing sibling did not cut the slow ones short.
    assert!(!result.succeeded());
    assert_eq!(log.spans().len(), 3);
    let a = log.span("A").unwrap();
    let b = log.span("B").unwrap();
    assert!(b.started < a.finished, "parallel branches must overlap");
    assert_eq!(result.failures.len(), 1);
    assert!(result.find("A").unwrap().succeeded());
}

#[tokio::test]
async fn step_after_parallel_starts_after_every_branch_ends() {
    init_tracing();
    let log = RunLog::new();
    let mut b = TaskGraphBuilder::new();
    b.define_task(slow_leaf("A", &log, Duration::from_millis(30)))
        .define_task(slow_leaf("B", &log, Duration::from_millis(60)))
        .define_task(recording_leaf("C", &log))
        .parallel("AB", ["A", "B"])
        .sequence("S", ["AB", "C"]);
    let graph = b.build().unwrap();

    let result = Scheduler::new().run(&graph.task("S").unwrap()).await;
    assert!(result.succeeded());

    let a = log.span("A").unwrap();
    let b = log.span("B").unwrap();
    let c = log.span("C").unwrap();
    assert!(c.started >= a.finished.max(b.finished));
    assert_eq!(result.executed_leaves(), vec!["A", "B", "C"]);
}

#[test]
fn self_containing_composite_is_rejected_before_anything_runs() {
    let log = RunLog::new();
    let mut b = TaskGraphBuilder::new();
    b.define_task(recording_leaf("A", &log))
        .sequence("X", ["A", "Y"])
        .parallel("Y", ["X"]);

    let err = b.build().unwrap_err();
    assert!(matches!(err, PipelineError::CyclicGraph(_)));
    assert!(log.started().is_empty());
}

#[tokio::test]
async fn unit_panic_does_not_escape_the_scheduler() {
    init_tracing();
    let log = RunLog::new();
    let mut b = TaskGraphBuilder::new();
    b.define_task(LeafTask::new(
        "boom",
        unit_fn(|| async {
            let explode = true;
            if explode {
                panic!("unit exploded");
            }
            Ok(())
        }),
    ))
    .define_task(recording_leaf("after", &log))
    .parallel("both", ["boom", "after"]);
    let graph = b.build().unwrap();

    let result = Scheduler::new().run(&graph.task("both").unwrap()).await;

    assert!(!result.succeeded());
    assert!(result.failures[0].cause.contains("unit exploded"));
    assert_eq!(log.started(), vec!["after"]);
}
