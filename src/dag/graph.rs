// src/dag/graph.rs

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use tracing::{debug, warn};

use crate::dag::task::{CompositeTask, LeafTask, Task};
use crate::errors::{PipelineError, Result};
use crate::types::TaskName;

/// Declared but not yet resolved node.
#[derive(Debug)]
enum NodeSpec {
    Leaf(LeafTask),
    Sequence(Vec<TaskName>),
    Parallel(Vec<TaskName>),
}

impl NodeSpec {
    fn children(&self) -> &[TaskName] {
        match self {
            NodeSpec::Leaf(_) => &[],
            NodeSpec::Sequence(c) | NodeSpec::Parallel(c) => c,
        }
    }
}

/// Collects task declarations and turns them into an immutable [`TaskGraph`].
///
/// Composites refer to their children by name, so declaration order does not
/// matter. All checks happen in [`TaskGraphBuilder::build`]:
///
/// - every name is declared once,
/// - every child reference resolves,
/// - no composite contains itself, directly or transitively.
#[derive(Debug, Default)]
pub struct TaskGraphBuilder {
    nodes: BTreeMap<TaskName, NodeSpec>,
    declared: Vec<TaskName>,
    duplicates: Vec<TaskName>,
}

impl TaskGraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a leaf task.
    pub fn define_task(&mut self, task: LeafTask) -> &mut Self {
        let name = task.name().to_string();
        self.insert(name, NodeSpec::Leaf(task));
        self
    }

    /// Register a composite whose children run strictly one after another.
    pub fn sequence<I, S>(&mut self, name: impl Into<TaskName>, children: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<TaskName>,
    {
        let children = children.into_iter().map(Into::into).collect();
        self.insert(name.into(), NodeSpec::Sequence(children));
        self
    }

    /// Register a composite whose children all start together.
    pub fn parallel<I, S>(&mut self, name: impl Into<TaskName>, children: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<TaskName>,
    {
        let children = children.into_iter().map(Into::into).collect();
        self.insert(name.into(), NodeSpec::Parallel(children));
        self
    }

    fn insert(&mut self, name: TaskName, spec: NodeSpec) {
        if self.nodes.contains_key(&name) {
            self.duplicates.push(name);
            return;
        }
        self.declared.push(name.clone());
        self.nodes.insert(name, spec);
    }

    /// Validate and resolve every declaration.
    pub fn build(self) -> Result<TaskGraph> {
        if let Some(name) = self.duplicates.first() {
            return Err(PipelineError::ConfigError(format!(
                "task '{name}' is defined more than once"
            )));
        }

        self.validate_children()?;
        let order = self.resolution_order()?;

        // `order` lists containers before their children; resolve in reverse
        // so that every child exists when its parent is assembled.
        let mut nodes = self.nodes;
        let mut resolved: HashMap<TaskName, Task> = HashMap::with_capacity(nodes.len());

        for name in order.iter().rev() {
            let Some(spec) = nodes.remove(name) else {
                continue;
            };
            let task = match spec {
                NodeSpec::Leaf(leaf) => Task::Leaf(Arc::new(leaf)),
                NodeSpec::Sequence(children) => Task::Sequence(Arc::new(CompositeTask::new(
                    name.clone(),
                    collect_children(&resolved, &children),
                ))),
                NodeSpec::Parallel(children) => {
                    let composite =
                        CompositeTask::new(name.clone(), collect_children(&resolved, &children));
                    warn_on_shared_outputs(&composite);
                    Task::Parallel(Arc::new(composite))
                }
            };
            resolved.insert(name.clone(), task);
        }

        debug!(tasks = resolved.len(), "task graph built");

        Ok(TaskGraph {
            tasks: resolved,
            declared: self.declared,
        })
    }

    fn validate_children(&self) -> Result<()> {
        for (name, spec) in self.nodes.iter() {
            for child in spec.children() {
                if child == name {
                    return Err(PipelineError::CyclicGraph(format!(
                        "composite '{name}' lists itself as a child"
                    )));
                }
                if !self.nodes.contains_key(child) {
                    return Err(PipelineError::ConfigError(format!(
                        "composite '{name}' references unknown task '{child}'"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Topological order with edges `composite -> child`.
    ///
    /// Fails with [`PipelineError::CyclicGraph`] if any composite reaches
    /// itself.
    fn resolution_order(&self) -> Result<Vec<TaskName>> {
        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

        for name in self.nodes.keys() {
            graph.add_node(name.as_str());
        }
        for (name, spec) in self.nodes.iter() {
            for child in spec.children() {
                graph.add_edge(name.as_str(), child.as_str(), ());
            }
        }

        match toposort(&graph, None) {
            Ok(order) => Ok(order.into_iter().map(str::to_string).collect()),
            Err(cycle) => Err(PipelineError::CyclicGraph(format!(
                "composite '{}' contains itself transitively",
                cycle.node_id()
            ))),
        }
    }
}

fn collect_children(resolved: &HashMap<TaskName, Task>, children: &[TaskName]) -> Vec<Task> {
    // Children were validated and resolved earlier in topological order.
    children
        .iter()
        .filter_map(|child| resolved.get(child).cloned())
        .collect()
}

/// Two branches of one `Parallel` must not write the same directory.
///
/// This is a configuration precondition rather than something resolved at
/// runtime, so it is only reported.
fn warn_on_shared_outputs(composite: &CompositeTask) {
    let mut owners: HashMap<&Path, usize> = HashMap::new();
    for (idx, child) in composite.children().iter().enumerate() {
        let mut seen_in_branch: HashSet<&Path> = HashSet::new();
        for leaf in child.leaves() {
            let Some(out) = leaf.output() else { continue };
            if !seen_in_branch.insert(out) {
                continue;
            }
            if let Some(&other) = owners.get(out) {
                if other != idx {
                    warn!(
                        parallel = %composite.name(),
                        output = ?out,
                        task = %leaf.name(),
                        "parallel branches share an output directory"
                    );
                }
            } else {
                owners.insert(out, idx);
            }
        }
    }
}

/// Immutable, validated task graph.
#[derive(Debug, Clone)]
pub struct TaskGraph {
    tasks: HashMap<TaskName, Task>,
    /// Declaration order, for stable listings.
    declared: Vec<TaskName>,
}

impl TaskGraph {
    pub fn get(&self, name: &str) -> Option<&Task> {
        self.tasks.get(name)
    }

    /// Like [`TaskGraph::get`], but unknown names are an error.
    pub fn task(&self, name: &str) -> Result<Task> {
        self.tasks
            .get(name)
            .cloned()
            .ok_or_else(|| PipelineError::TaskNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    /// Task names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.declared.iter().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::task::{unit_fn, TaskKind};

    fn leaf(name: &str) -> LeafTask {
        LeafTask::new(name, unit_fn(|| async { Ok(()) }))
    }

    #[test]
    fn composites_may_reference_later_declarations() {
        let mut b = TaskGraphBuilder::new();
        b.sequence("default", ["clean", "assets"])
            .parallel("assets", ["a", "b"])
            .define_task(leaf("clean"))
            .define_task(leaf("a"))
            .define_task(leaf("b"));
        let graph = b.build().unwrap();

        let default = graph.task("default").unwrap();
        assert_eq!(default.kind(), TaskKind::Sequence);
        let names: Vec<_> = default.leaves().iter().map(|l| l.name().to_string()).collect();
        assert_eq!(names, vec!["clean", "a", "b"]);
        assert_eq!(
            graph.names().collect::<Vec<_>>(),
            vec!["default", "assets", "clean", "a", "b"]
        );
    }

    #[test]
    fn transitive_self_containment_is_cyclic() {
        let mut b = TaskGraphBuilder::new();
        b.sequence("outer", ["inner"])
            .parallel("inner", ["leaf", "outer"])
            .define_task(leaf("leaf"));
        let err = b.build().unwrap_err();
        assert!(matches!(err, PipelineError::CyclicGraph(_)));
    }

    #[test]
    fn direct_self_reference_is_cyclic() {
        let mut b = TaskGraphBuilder::new();
        b.parallel("loop", ["loop"]);
        assert!(matches!(b.build(), Err(PipelineError::CyclicGraph(_))));
    }

    #[test]
    fn unknown_child_is_a_config_error() {
        let mut b = TaskGraphBuilder::new();
        b.sequence("default", ["missing"]);
        assert!(matches!(b.build(), Err(PipelineError::ConfigError(_))));
    }

    #[test]
    fn duplicate_name_is_a_config_error() {
        let mut b = TaskGraphBuilder::new();
        b.define_task(leaf("a")).parallel("a", Vec::<String>::new());
        let err = b.build().unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn shared_children_are_not_cycles() {
        // A diamond: both composites reuse the same leaf.
        let mut b = TaskGraphBuilder::new();
        b.define_task(leaf("clean"))
            .sequence("one", ["clean"])
            .sequence("two", ["clean"])
            .parallel("both", ["one", "two"]);
        let graph = b.build().unwrap();
        assert_eq!(graph.task("both").unwrap().leaves().len(), 2);
    }

    #[test]
    fn unknown_task_lookup() {
        let graph = TaskGraphBuilder::new().build().unwrap();
        assert!(graph.is_empty());
        assert!(matches!(graph.task("x"), Err(PipelineError::TaskNotFound(_))));
    }
}
