// src/exec/command.rs

use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::engine::{RuntimeEvent, TaskOutcome};
use crate::graph::ScheduledTask;

/// Spawn the background executor loop.
///
/// Each scheduled task runs in its own tokio task, so tasks with no
/// dependency relationship execute concurrently.
pub fn spawn_executor(runtime_tx: mpsc::Sender<RuntimeEvent>) -> mpsc::Sender<ScheduledTask> {
    let (tx, mut rx) = mpsc::channel::<ScheduledTask>(32);

    tokio::spawn(async move {
        info!("executor loop started");
        while let Some(task) = rx.recv().await {
            let runtime_tx = runtime_tx.clone();
            tokio::spawn(async move {
                run_task(task, runtime_tx).await;
            });
        }
        info!("executor loop finished (channel closed)");
    });

    tx
}

/// Run one task command to completion and report the outcome.
///
/// Spawn or wait errors become a failed completion with exit code -1, so
/// the session always sees a terminal state for the task.
async fn run_task(task: ScheduledTask, runtime_tx: mpsc::Sender<RuntimeEvent>) {
    let task_name = task.name.clone();
    if let Err(err) = run_task_inner(task, &runtime_tx).await {
        error!(task = %task_name, error = %err, "task execution error");
        let _ = runtime_tx
            .send(RuntimeEvent::TaskCompleted {
                task: task_name,
                outcome: TaskOutcome::Failed(-1),
            })
            .await;
    }
}

async fn run_task_inner(
    task: ScheduledTask,
    runtime_tx: &mpsc::Sender<RuntimeEvent>,
) -> Result<()> {
    info!(task = %task.name, cmd = %task.cmd, "starting task command");

    let mut child = shell_command(&task.cmd)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("spawning command for task '{}'", task.name))?;

    // Drain both pipes so OS buffers never fill.
    if let Some(stdout) = child.stdout.take() {
        drain_lines(task.name.clone(), "stdout", stdout);
    }
    if let Some(stderr) = child.stderr.take() {
        drain_lines(task.name.clone(), "stderr", stderr);
    }

    let status = child
        .wait()
        .await
        .with_context(|| format!("waiting for command of task '{}'", task.name))?;

    let code = status.code().unwrap_or(-1);
    let outcome = if status.success() {
        TaskOutcome::Success
    } else {
        TaskOutcome::Failed(code)
    };

    info!(
        task = %task.name,
        exit_code = code,
        success = status.success(),
        "task command exited"
    );

    runtime_tx
        .send(RuntimeEvent::TaskCompleted {
            task: task.name.clone(),
            outcome,
        })
        .await
        .with_context(|| format!("sending TaskCompleted for task '{}'", task.name))?;

    Ok(())
}

/// Build a shell invocation appropriate for the platform.
pub(crate) fn shell_command(cmd: &str) -> Command {
    if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(cmd);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(cmd);
        c
    }
}

fn drain_lines<R>(task: String, stream: &'static str, reader: R)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            debug!(task = %task, "{stream}: {line}");
        }
    });
}
