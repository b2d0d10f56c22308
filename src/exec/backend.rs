// src/exec/backend.rs

//! Pluggable executor backend.
//!
//! The runtime dispatches ready tasks through this trait instead of a raw
//! channel, so tests can substitute an executor that completes tasks
//! without spawning processes.

use std::future::Future;
use std::pin::Pin;

use anyhow::anyhow;
use tokio::sync::mpsc;

use crate::engine::RuntimeEvent;
use crate::errors::{GantryError, Result};
use crate::graph::ScheduledTask;

use super::command::spawn_executor;

/// How scheduled tasks get executed.
pub trait ExecutorBackend: Send {
    /// Dispatch the given tasks for execution. Completion is reported
    /// asynchronously as `RuntimeEvent::TaskCompleted`.
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Production backend: forwards tasks to the shell executor loop.
pub struct ShellExecutorBackend {
    tx: mpsc::Sender<ScheduledTask>,
}

impl ShellExecutorBackend {
    /// Spawns the background executor loop immediately and wires its
    /// completion events to `runtime_tx`.
    pub fn new(runtime_tx: mpsc::Sender<RuntimeEvent>) -> Self {
        let tx = spawn_executor(runtime_tx);
        Self { tx }
    }
}

impl ExecutorBackend for ShellExecutorBackend {
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        // Clone so the future doesn't borrow `self` across await points.
        let tx = self.tx.clone();

        Box::pin(async move {
            for task in tasks {
                tx.send(task)
                    .await
                    .map_err(|e| GantryError::Other(anyhow!("executor channel closed: {e}")))?;
            }
            Ok(())
        })
    }
}
