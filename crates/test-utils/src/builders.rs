#![allow(dead_code)]

use std::collections::BTreeMap;

use gantry::config::{
    ConfigFile, ConfigSection, DefaultSection, ModeOverride, ModesSection, TaskConfig,
};
use gantry::graph::{TaskGraph, TaskSpec};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: ConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: ConfigFile {
                config: ConfigSection::default(),
                modes: ModesSection::default(),
                default: DefaultSection::default(),
                serve: None,
                task: BTreeMap::new(),
            },
        }
    }

    pub fn with_task(mut self, name: &str, task: TaskConfig) -> Self {
        self.config.task.insert(name.to_string(), task);
        self
    }

    pub fn with_default_task(mut self, name: &str) -> Self {
        self.config.config.default_task = name.to_string();
        self
    }

    pub fn with_default_watch(mut self, pattern: &str) -> Self {
        self.config.default.watch.push(pattern.to_string());
        self
    }

    pub fn with_default_exclude(mut self, pattern: &str) -> Self {
        self.config.default.exclude.push(pattern.to_string());
        self
    }

    pub fn build(self) -> ConfigFile {
        self.config
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TaskConfig`.
pub struct TaskConfigBuilder {
    task: TaskConfig,
}

impl TaskConfigBuilder {
    pub fn new(cmd: &str) -> Self {
        Self {
            task: TaskConfig {
                cmd: cmd.to_string(),
                after: vec![],
                watch: None,
                exclude: None,
                mode: BTreeMap::new(),
            },
        }
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.task.after.push(dep.to_string());
        self
    }

    pub fn watch(mut self, pattern: &str) -> Self {
        self.task
            .watch
            .get_or_insert_with(Vec::new)
            .push(pattern.to_string());
        self
    }

    pub fn exclude(mut self, pattern: &str) -> Self {
        self.task
            .exclude
            .get_or_insert_with(Vec::new)
            .push(pattern.to_string());
        self
    }

    pub fn mode_cmd(mut self, mode: &str, cmd: &str) -> Self {
        self.task.mode.insert(
            mode.to_string(),
            ModeOverride {
                cmd: cmd.to_string(),
            },
        );
        self
    }

    pub fn build(self) -> TaskConfig {
        self.task
    }
}

/// Shorthand for a `TaskSpec`.
pub fn task(name: &str, cmd: &str, deps: &[&str]) -> TaskSpec {
    TaskSpec {
        name: name.to_string(),
        cmd: cmd.to_string(),
        after: deps.iter().map(|d| d.to_string()).collect(),
    }
}

/// Build a validated `TaskGraph` from specs.
pub fn graph_of(specs: Vec<TaskSpec>) -> TaskGraph {
    let mut graph = TaskGraph::new();
    for spec in specs {
        graph.register(spec).expect("duplicate task in test graph");
    }
    graph.validate().expect("invalid test graph");
    graph
}
