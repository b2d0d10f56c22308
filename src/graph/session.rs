// src/graph/session.rs

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, info, warn};

use crate::engine::{TaskName, TaskOutcome};
use crate::errors::GantryError;
use crate::graph::TaskGraph;

/// Per-run state of a task.
///
/// `Pending -> Running -> {Succeeded, Failed}`, with `Pending -> Skipped`
/// when an ancestor fails before the task starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    Running,
    Succeeded,
    Failed,
    Skipped,
}

impl TaskState {
    fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskState::Succeeded | TaskState::Failed | TaskState::Skipped
        )
    }
}

/// A task the session wants the executor to start now.
#[derive(Debug, Clone)]
pub struct ScheduledTask {
    pub name: TaskName,
    pub cmd: String,
}

/// Final record of one run: every participating task's terminal state,
/// plus the first failure (if any) and the failed ancestor behind each
/// skipped task.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: u64,
    pub states: BTreeMap<TaskName, TaskState>,
    pub first_failure: Option<(TaskName, i32)>,
    /// skipped task -> the failed task that caused the skip.
    pub skipped_by: BTreeMap<TaskName, TaskName>,
}

impl RunReport {
    /// True iff every task in the session succeeded.
    pub fn success(&self) -> bool {
        self.states
            .values()
            .all(|state| *state == TaskState::Succeeded)
    }

    pub fn state_of(&self, name: &str) -> Option<TaskState> {
        self.states.get(name).copied()
    }

    /// Session-local errors, failures first, then skips.
    pub fn errors(&self) -> Vec<GantryError> {
        let mut errors = Vec::new();
        if let Some((task, code)) = &self.first_failure {
            errors.push(GantryError::TaskExecution {
                task: task.clone(),
                code: *code,
            });
        }
        for (task, failed) in &self.skipped_by {
            errors.push(GantryError::UpstreamFailure {
                task: task.clone(),
                failed: failed.clone(),
            });
        }
        errors
    }
}

/// Session scheduler: owns the (validated) task graph plus mutable per-run
/// state.
///
/// Responsibilities:
/// - expand a trigger into its unsatisfied dependency closure
/// - decide when a task is ready (all dependencies succeeded)
/// - propagate a failure to pending dependents as `Skipped`
/// - remember historical successes so a watch re-trigger of a mid-graph
///   task does not re-run dependencies that already succeeded
/// - produce a [`RunReport`] when every participating task is terminal
pub struct Session {
    graph: TaskGraph,

    /// Per-run states; a task absent from the map is not in the run.
    states: HashMap<TaskName, TaskState>,
    /// skipped task -> failed ancestor, for the current run.
    skipped_by: HashMap<TaskName, TaskName>,
    first_failure: Option<(TaskName, i32)>,

    /// Run ID of the last success per task, across runs.
    history: HashMap<TaskName, u64>,

    run_counter: u64,
    current_run: Option<u64>,
    finished: Option<RunReport>,
}

impl Session {
    /// Create a session over a validated graph.
    pub fn new(graph: TaskGraph) -> Self {
        Self {
            graph,
            states: HashMap::new(),
            skipped_by: HashMap::new(),
            first_failure: None,
            history: HashMap::new(),
            run_counter: 0,
            current_run: None,
            finished: None,
        }
    }

    pub fn graph(&self) -> &TaskGraph {
        &self.graph
    }

    /// True when no run is active.
    pub fn is_idle(&self) -> bool {
        self.current_run.is_none()
    }

    pub fn state_of(&self, name: &str) -> Option<TaskState> {
        self.states.get(name).copied()
    }

    /// Start a new run, clearing per-run state but keeping success history.
    pub fn start_new_run(&mut self) {
        self.run_counter += 1;
        self.current_run = Some(self.run_counter);
        self.states.clear();
        self.skipped_by.clear();
        self.first_failure = None;

        debug!(run_id = self.run_counter, "session: starting new run");
    }

    /// Pull a task and its unsatisfied dependency closure into the current
    /// run, then return any tasks that are now ready to start.
    ///
    /// A dependency that succeeded in an earlier run is treated as
    /// satisfied and is not re-run; everything else in the closure joins
    /// the run as `Pending`.
    pub fn handle_trigger(&mut self, task: &str) -> Vec<ScheduledTask> {
        if self.current_run.is_none() {
            // The runtime normally calls start_new_run first; recover
            // rather than losing the trigger.
            warn!("trigger with no active run; starting one implicitly");
            self.start_new_run();
        }

        if self.graph.contains(task) {
            let mut stack = vec![task.to_string()];
            while let Some(name) = stack.pop() {
                if self.states.contains_key(&name) {
                    continue;
                }
                debug!(task = %name, "task joins run as Pending");
                self.states.insert(name.clone(), TaskState::Pending);

                for dep in self.graph.dependencies_of(&name) {
                    if self.states.contains_key(dep) || self.history.contains_key(dep) {
                        continue;
                    }
                    stack.push(dep.clone());
                }
            }
        } else {
            warn!(task = %task, "trigger for unknown task; ignoring");
        }

        let ready = self.collect_ready();
        self.maybe_finish_run();
        ready
    }

    /// Record a task's completion and return any newly ready dependents.
    ///
    /// On failure, every pending transitive dependent in this run moves to
    /// `Skipped`; branches that do not depend on the failed task continue.
    pub fn handle_completion(&mut self, task: &str, outcome: TaskOutcome) -> Vec<ScheduledTask> {
        let run_id = match self.current_run {
            Some(id) => id,
            None => {
                warn!(task = %task, "completion with no active run; ignoring");
                return Vec::new();
            }
        };

        let mut ready = Vec::new();

        match self.states.get(task).copied() {
            Some(TaskState::Running) => match outcome {
                TaskOutcome::Success => {
                    self.states.insert(task.to_string(), TaskState::Succeeded);
                    self.history.insert(task.to_string(), run_id);
                    debug!(task = %task, "task succeeded");
                    ready = self.collect_ready();
                }
                TaskOutcome::Failed(code) => {
                    self.states.insert(task.to_string(), TaskState::Failed);
                    if self.first_failure.is_none() {
                        self.first_failure = Some((task.to_string(), code));
                    }
                    warn!(task = %task, exit_code = code, "task failed; skipping dependents");
                    self.skip_dependents(task);
                }
            },
            other => {
                warn!(task = %task, state = ?other, "unexpected completion; ignoring");
            }
        }

        self.maybe_finish_run();
        ready
    }

    /// Take the report of a run that just finished, if one did.
    pub fn take_finished_report(&mut self) -> Option<RunReport> {
        self.finished.take()
    }

    /// Pending tasks whose dependencies are all satisfied move to
    /// `Running` and are returned for dispatch.
    fn collect_ready(&mut self) -> Vec<ScheduledTask> {
        let candidates: Vec<TaskName> = self
            .states
            .iter()
            .filter(|(name, state)| {
                **state == TaskState::Pending && self.deps_satisfied(name)
            })
            .map(|(name, _)| name.clone())
            .collect();

        let mut ready = Vec::new();
        for name in candidates {
            self.states.insert(name.clone(), TaskState::Running);
            // contains() was checked when the task joined the run.
            if let Some(spec) = self.graph.get(&name) {
                debug!(task = %name, "dependencies satisfied; marking Running");
                ready.push(ScheduledTask {
                    name: spec.name.clone(),
                    cmd: spec.cmd.clone(),
                });
            }
        }
        ready
    }

    /// A dependency is satisfied if it succeeded in this run, or is not in
    /// this run and succeeded in an earlier one.
    fn deps_satisfied(&self, name: &str) -> bool {
        self.graph.dependencies_of(name).iter().all(|dep| {
            match self.states.get(dep) {
                Some(TaskState::Succeeded) => true,
                Some(_) => false,
                None => self.history.contains_key(dep),
            }
        })
    }

    /// Mark all pending transitive dependents of `failed_task` as skipped,
    /// recording the failure that caused each skip.
    fn skip_dependents(&mut self, failed_task: &str) {
        let mut stack: Vec<TaskName> = self
            .graph
            .dependents_of(failed_task)
            .to_vec();

        while let Some(name) = stack.pop() {
            if self.states.get(&name) == Some(&TaskState::Pending) {
                debug!(task = %name, failed = %failed_task, "skipping dependent");
                self.states.insert(name.clone(), TaskState::Skipped);
                self.skipped_by
                    .insert(name.clone(), failed_task.to_string());
                stack.extend(self.graph.dependents_of(&name).iter().cloned());
            }
        }
    }

    /// If every participating task is terminal, close the run and stash
    /// its report for the runtime to pick up.
    fn maybe_finish_run(&mut self) {
        let run_id = match self.current_run {
            Some(id) => id,
            None => return,
        };

        let any_active = self
            .states
            .values()
            .any(|state| !state.is_terminal());
        if any_active {
            return;
        }

        info!(run_id, "session: all tasks terminal; run finished");
        self.finished = Some(RunReport {
            run_id,
            states: self
                .states
                .iter()
                .map(|(name, state)| (name.clone(), *state))
                .collect(),
            first_failure: self.first_failure.clone(),
            skipped_by: self
                .skipped_by
                .iter()
                .map(|(task, failed)| (task.clone(), failed.clone()))
                .collect(),
        });
        self.current_run = None;
    }
}
