// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`backend`] defines the [`ExecutorBackend`] seam the runtime talks
//!   to, plus the production implementation.
//! - [`command`] owns the executor loop that consumes scheduled tasks and
//!   spawns their shell commands, reporting completions back to the
//!   runtime.

pub mod backend;
pub mod command;

pub use backend::{ExecutorBackend, ShellExecutorBackend};
pub use command::spawn_executor;
