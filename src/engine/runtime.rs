// src/engine/runtime.rs

use std::collections::HashSet;
use std::fmt;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::engine::queue::TriggerQueue;
use crate::engine::{RuntimeEvent, TaskName, TaskOutcome, TriggerReason};
use crate::errors::Result;
use crate::exec::ExecutorBackend;
use crate::graph::{RunReport, ScheduledTask, Session};

/// Options that shape the runtime's lifecycle.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeOptions {
    /// Exit the event loop once the session is idle and the trigger
    /// backlog is empty. True for one-shot `run`, false for watch/serve.
    pub exit_when_idle: bool,
}

/// The orchestration runtime.
///
/// Consumes [`RuntimeEvent`]s from a unified channel (watcher, executor,
/// signal handlers), drives the [`Session`] scheduler, and hands ready
/// tasks to an [`ExecutorBackend`]. Finished run reports are forwarded on
/// `report_tx` for callers that need them live (watch/serve), and the last
/// one is returned when the loop exits (one-shot runs).
pub struct Runtime<E: ExecutorBackend> {
    session: Session,
    queue: TriggerQueue,
    options: RuntimeOptions,
    events_rx: mpsc::Receiver<RuntimeEvent>,
    executor: E,
    report_tx: Option<mpsc::Sender<RunReport>>,
    last_report: Option<RunReport>,
}

impl<E: ExecutorBackend> fmt::Debug for Runtime<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<E: ExecutorBackend> Runtime<E> {
    pub fn new(
        session: Session,
        queue: TriggerQueue,
        options: RuntimeOptions,
        events_rx: mpsc::Receiver<RuntimeEvent>,
        executor: E,
    ) -> Self {
        Self {
            session,
            queue,
            options,
            events_rx,
            executor,
            report_tx: None,
            last_report: None,
        }
    }

    /// Forward every finished [`RunReport`] on the given channel.
    pub fn with_reports(mut self, report_tx: mpsc::Sender<RunReport>) -> Self {
        self.report_tx = Some(report_tx);
        self
    }

    /// Main event loop. Returns the report of the last finished run, or
    /// `None` if no run ever completed.
    pub async fn run(mut self) -> Result<Option<RunReport>> {
        info!("gantry runtime started");

        while let Some(event) = self.events_rx.recv().await {
            debug!(?event, "runtime received event");

            let keep_running = match event {
                RuntimeEvent::TaskTriggered { task, reason } => {
                    self.handle_trigger(task, reason).await?
                }
                RuntimeEvent::TaskCompleted { task, outcome } => {
                    self.handle_completion(task, outcome).await?
                }
                RuntimeEvent::ShutdownRequested => {
                    info!("shutdown requested, stopping runtime");
                    false
                }
            };

            if !keep_running {
                break;
            }
        }

        info!("gantry runtime exiting");
        Ok(self.last_report)
    }

    async fn handle_trigger(&mut self, task: TaskName, reason: TriggerReason) -> Result<bool> {
        info!(task = %task, ?reason, "task triggered");

        if self.session.is_idle() {
            // Start a new session: merge this trigger with anything queued
            // while the previous session was running.
            let mut triggers: HashSet<TaskName> =
                self.queue.drain_pending().into_iter().collect();
            triggers.insert(task);
            self.start_new_run(triggers.into_iter().collect()).await?;
        } else {
            self.queue.record_trigger(&task);
            debug!(task = %task, "session active; trigger recorded in backlog");
        }

        Ok(true)
    }

    async fn handle_completion(&mut self, task: TaskName, outcome: TaskOutcome) -> Result<bool> {
        match outcome {
            TaskOutcome::Success => info!(task = %task, "task completed successfully"),
            TaskOutcome::Failed(code) => warn!(task = %task, exit_code = code, "task failed"),
        }

        let ready = self.session.handle_completion(&task, outcome);
        self.dispatch(ready).await?;

        self.publish_finished_report().await;
        self.maybe_start_queued_run().await?;

        if self.options.exit_when_idle && self.session.is_idle() && self.queue.is_empty() {
            info!("runtime idle and exit_when_idle set, stopping");
            return Ok(false);
        }

        Ok(true)
    }

    async fn start_new_run(&mut self, triggers: Vec<TaskName>) -> Result<()> {
        if triggers.is_empty() {
            return Ok(());
        }

        info!(?triggers, "starting new run session");
        self.session.start_new_run();

        for task in triggers {
            let ready = self.session.handle_trigger(&task);
            self.dispatch(ready).await?;
        }

        // A trigger set that resolves to nothing (e.g. all deps satisfied
        // by history and the task set empty) can finish immediately.
        self.publish_finished_report().await;
        Ok(())
    }

    async fn maybe_start_queued_run(&mut self) -> Result<()> {
        if !self.session.is_idle() {
            return Ok(());
        }

        let triggers = self.queue.drain_pending();
        if triggers.is_empty() {
            return Ok(());
        }
        self.start_new_run(triggers).await
    }

    async fn dispatch(&mut self, tasks: Vec<ScheduledTask>) -> Result<()> {
        if tasks.is_empty() {
            return Ok(());
        }

        let names: Vec<_> = tasks.iter().map(|t| t.name.as_str()).collect();
        debug!(?names, "dispatching ready tasks to executor");
        self.executor.spawn_ready_tasks(tasks).await
    }

    async fn publish_finished_report(&mut self) {
        let Some(report) = self.session.take_finished_report() else {
            return;
        };

        match &report.first_failure {
            None => info!(run_id = report.run_id, "run session succeeded"),
            Some((task, code)) => warn!(
                run_id = report.run_id,
                task = %task,
                exit_code = code,
                skipped = report.skipped_by.len(),
                "run session failed"
            ),
        }

        if let Some(tx) = &self.report_tx {
            if tx.send(report.clone()).await.is_err() {
                debug!("report receiver dropped; not forwarding further reports");
                self.report_tx = None;
            }
        }
        self.last_report = Some(report);
    }
}
