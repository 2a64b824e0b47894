use assetpipe::config::{BindingConfig, ConfigFile, RawConfigFile};
use assetpipe::dag::{unit_fn, LeafTask, TaskGraph, TaskGraphBuilder};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn with_binding(mut self, pattern: &str, task: &str) -> Self {
        self.config
            .watch
            .binding
            .get_or_insert_with(Vec::new)
            .push(BindingConfig {
                pattern: pattern.to_string(),
                task: task.to_string(),
            });
        self
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Graph of no-op leaves, one per name.
pub fn noop_graph(names: &[&str]) -> TaskGraph {
    let mut b = TaskGraphBuilder::new();
    for name in names {
        b.define_task(LeafTask::new(*name, unit_fn(|| async { Ok(()) })));
    }
    b.build().expect("no-op graph must build")
}
