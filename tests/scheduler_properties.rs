// tests/scheduler_properties.rs

use std::collections::BTreeSet;

use proptest::prelude::*;

use assetpipe::dag::{Scheduler, TaskGraphBuilder};
use assetpipe_test_utils::units::{failing_leaf, recording_leaf, RunLog};

/// Random task tree: leaves carry a "fails" flag.
#[derive(Debug, Clone)]
enum Shape {
    Leaf(bool),
    Sequence(Vec<Shape>),
    Parallel(Vec<Shape>),
}

fn shape_strategy() -> impl Strategy<Value = Shape> {
    let leaf = prop::bool::weighted(0.25).prop_map(Shape::Leaf);
    leaf.prop_recursive(4, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Shape::Sequence),
            prop::collection::vec(inner, 0..4).prop_map(Shape::Parallel),
        ]
    })
}

/// Register `shape` under fresh names; returns the root name.
fn register(shape: &Shape, b: &mut TaskGraphBuilder, log: &RunLog, next: &mut usize) -> String {
    let name = format!("t{next}");
    *next += 1;
    match shape {
        Shape::Leaf(false) => {
            b.define_task(recording_leaf(&name, log));
        }
        Shape::Leaf(true) => {
            b.define_task(failing_leaf(&name, log));
        }
        Shape::Sequence(children) => {
            let names: Vec<String> = children.iter().map(|c| register(c, b, log, next)).collect();
            b.sequence(name.clone(), names);
        }
        Shape::Parallel(children) => {
            let names: Vec<String> = children.iter().map(|c| register(c, b, log, next)).collect();
            b.parallel(name.clone(), names);
        }
    }
    name
}

/// Reference model: which leaves run, and does the tree succeed.
fn model(shape: &Shape, next: &mut usize, reached: &mut BTreeSet<String>, failed: &mut BTreeSet<String>) -> bool {
    let name = format!("t{next}");
    *next += 1;
    match shape {
        Shape::Leaf(fails) => {
            reached.insert(name.clone());
            if *fails {
                failed.insert(name);
            }
            !*fails
        }
        Shape::Sequence(children) => {
            let mut ok = true;
            for child in children {
                if ok {
                    ok = model(child, next, reached, failed);
                } else {
                    // Skipped children still consume their names.
                    skip(child, next);
                }
            }
            ok
        }
        Shape::Parallel(children) => {
            let mut ok = true;
            for child in children {
                ok &= model(child, next, reached, failed);
            }
            ok
        }
    }
}

fn skip(shape: &Shape, next: &mut usize) {
    *next += 1;
    if let Shape::Sequence(children) | Shape::Parallel(children) = shape {
        for child in children {
            skip(child, next);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn success_is_the_and_of_reached_leaves(shape in shape_strategy()) {
        let log = RunLog::new();
        let mut b = TaskGraphBuilder::new();
        let root = register(&shape, &mut b, &log, &mut 0);
        let graph = b.build().unwrap();

        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let result = rt.block_on(Scheduler::new().run(&graph.task(&root).unwrap()));

        let mut reached = BTreeSet::new();
        let mut failed = BTreeSet::new();
        let expected_ok = model(&shape, &mut 0, &mut reached, &mut failed);

        let ran: BTreeSet<String> = log.started().into_iter().collect();
        prop_assert_eq!(&ran, &reached);
        prop_assert_eq!(result.succeeded(), expected_ok);
        prop_assert_eq!(result.succeeded(), reached.iter().all(|l| !failed.contains(l)));

        let reported: BTreeSet<String> = result.failures.iter().map(|f| f.task.clone()).collect();
        prop_assert_eq!(reported, failed);
    }
}
