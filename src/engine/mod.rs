// src/engine/mod.rs

//! Orchestration engine.
//!
//! The runtime event loop reacts to:
//! - file-watch and manual triggers
//! - task completion events from the executor
//! - shutdown signals (Ctrl-C, supervisor giving up)
//!
//! Triggers that arrive while a session is active are coalesced by the
//! [`queue`] and drained into the next session once the runner goes idle.

pub mod queue;
pub mod runtime;

pub use queue::{RetriggerPolicy, TriggerQueue};
pub use runtime::{Runtime, RuntimeOptions};

/// Canonical task name type used throughout the engine.
pub type TaskName = String;

/// Outcome of a task's work command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    Failed(i32),
}

/// Why a task was triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerReason {
    /// Manual trigger (CLI target, initial build).
    Manual,
    /// A watched file changed.
    FileWatch,
}

/// Events flowing into the runtime from the watcher, executor and signal
/// handlers.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    TaskTriggered {
        task: TaskName,
        reason: TriggerReason,
    },
    TaskCompleted {
        task: TaskName,
        outcome: TaskOutcome,
    },
    ShutdownRequested,
}
