// src/graph/task_graph.rs

use std::collections::BTreeMap;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::ConfigFile;
use crate::engine::TaskName;
use crate::errors::{GantryError, Result};

/// A registered task: unique name, dependency list, and the command that
/// does the work. The command is already mode-resolved; the graph never
/// sees per-mode alternatives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSpec {
    pub name: TaskName,
    pub cmd: String,
    /// Tasks that must complete successfully before this one may start.
    pub after: Vec<TaskName>,
}

/// Explicitly constructed task graph, keyed by task name.
///
/// The graph is built once at startup and then handed by value into the
/// session scheduler; there is no process-wide registry. Registration only
/// rejects duplicates; dangling `after` references and cycles are caught
/// by [`TaskGraph::validate`], which must pass before the graph is run.
#[derive(Debug, Clone, Default)]
pub struct TaskGraph {
    tasks: BTreeMap<TaskName, TaskSpec>,
    dependents: BTreeMap<TaskName, Vec<TaskName>>,
}

impl TaskGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from a loaded config file, resolving each task's
    /// command for the given build mode. Validates before returning, so a
    /// config with dangling deps or cycles never yields a runnable graph.
    pub fn from_config(cfg: &ConfigFile, mode: &str) -> Result<Self> {
        let mut graph = Self::new();
        for (name, task) in cfg.task.iter() {
            graph.register(TaskSpec {
                name: name.clone(),
                cmd: task.effective_cmd(mode).to_string(),
                after: task.after.clone(),
            })?;
        }
        graph.validate()?;
        Ok(graph)
    }

    /// Register a task. Fails with [`GantryError::DuplicateTask`] if the
    /// name is taken; the graph is left untouched in that case.
    pub fn register(&mut self, spec: TaskSpec) -> Result<()> {
        if self.tasks.contains_key(&spec.name) {
            return Err(GantryError::DuplicateTask(spec.name));
        }

        for dep in &spec.after {
            self.dependents
                .entry(dep.clone())
                .or_default()
                .push(spec.name.clone());
        }
        self.tasks.insert(spec.name.clone(), spec);
        Ok(())
    }

    /// Check referential integrity and acyclicity.
    ///
    /// - every `after` entry must name a registered task, and a task may
    ///   not depend on itself ([`GantryError::MissingDependency`])
    /// - the dependency relation must be acyclic ([`GantryError::Cycle`])
    pub fn validate(&self) -> Result<()> {
        for (name, spec) in self.tasks.iter() {
            for dep in &spec.after {
                if dep == name || !self.tasks.contains_key(dep) {
                    return Err(GantryError::MissingDependency {
                        task: name.clone(),
                        dependency: dep.clone(),
                    });
                }
            }
        }

        // Edge direction: dep -> task, so a topological order runs
        // dependencies first. toposort fails exactly when there is a cycle.
        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
        for name in self.tasks.keys() {
            graph.add_node(name.as_str());
        }
        for (name, spec) in self.tasks.iter() {
            for dep in &spec.after {
                graph.add_edge(dep.as_str(), name.as_str(), ());
            }
        }

        match toposort(&graph, None) {
            Ok(_order) => Ok(()),
            Err(cycle) => Err(GantryError::Cycle(cycle.node_id().to_string())),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&TaskSpec> {
        self.tasks.get(name)
    }

    /// All registered tasks, in name order.
    pub fn tasks(&self) -> impl Iterator<Item = &TaskSpec> {
        self.tasks.values()
    }

    /// Immediate dependencies of a task (its `after` list).
    pub fn dependencies_of(&self, name: &str) -> &[TaskName] {
        self.tasks
            .get(name)
            .map(|spec| spec.after.as_slice())
            .unwrap_or(&[])
    }

    /// Immediate dependents of a task (tasks listing it in their `after`).
    pub fn dependents_of(&self, name: &str) -> &[TaskName] {
        self.dependents
            .get(name)
            .map(|deps| deps.as_slice())
            .unwrap_or(&[])
    }
}
