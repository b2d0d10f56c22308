// src/serve/supervisor.rs

use std::process::Stdio;
use std::time::Duration;

use anyhow::{anyhow, Context};
use regex::Regex;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStdout};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::config::model::ServeSection;
use crate::config::parse_duration;
use crate::engine::RuntimeEvent;
use crate::errors::{GantryError, Result};
use crate::exec::command::shell_command;
use crate::serve::ReloadHub;

/// Resolved supervision settings from the `[serve]` section.
#[derive(Debug, Clone)]
pub struct ServeSettings {
    pub cmd: String,
    pub max_restarts: u32,
    pub restart_delay: Duration,
    pub ready_pattern: Option<Regex>,
}

impl ServeSettings {
    pub fn from_config(serve: &ServeSection) -> Result<Self> {
        let ready_pattern = serve
            .ready_pattern
            .as_deref()
            .map(Regex::new)
            .transpose()
            .map_err(|e| GantryError::Config(format!("invalid [serve].ready_pattern: {e}")))?;

        Ok(Self {
            cmd: serve.cmd.clone(),
            max_restarts: serve.max_restarts,
            restart_delay: parse_duration(&serve.restart_delay)?,
            ready_pattern,
        })
    }
}

/// Supervises the long-running server process.
///
/// The child is restarted on any exit, clean or crashed, up to
/// `max_restarts` times; exceeding the budget ends supervision with
/// [`GantryError::ProcessSupervision`] and asks the runtime to shut down.
/// After each successful restart the reload hub is notified (the first
/// start is not announced; nothing is connected yet).
pub struct Supervisor {
    shutdown_tx: mpsc::Sender<()>,
    handle: JoinHandle<Result<()>>,
}

impl Supervisor {
    /// Start supervising `settings.cmd`.
    ///
    /// `runtime_tx` receives `ShutdownRequested` if the restart budget is
    /// exhausted, so serve mode winds down instead of running build
    /// sessions against a dead server.
    pub fn spawn(
        settings: ServeSettings,
        reload: ReloadHub,
        runtime_tx: mpsc::Sender<RuntimeEvent>,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);

        let handle = tokio::spawn(async move {
            let result = supervise(settings, reload, shutdown_rx).await;
            if let Err(err) = &result {
                error!(error = %err, "supervision ended with error");
                let _ = runtime_tx.send(RuntimeEvent::ShutdownRequested).await;
            }
            result
        });

        Self {
            shutdown_tx,
            handle,
        }
    }

    /// Stop the supervised process and end the restart loop.
    ///
    /// Returns the supervision outcome: `Ok` after a clean stop, the
    /// original error if the loop already died (e.g. restart budget
    /// exceeded).
    pub async fn stop(self) -> Result<()> {
        // Fails harmlessly when the loop already exited on its own.
        let _ = self.shutdown_tx.send(()).await;
        self.handle
            .await
            .map_err(|e| GantryError::Other(anyhow!("supervisor task panicked: {e}")))?
    }
}

async fn supervise(
    settings: ServeSettings,
    reload: ReloadHub,
    mut shutdown_rx: mpsc::Receiver<()>,
) -> Result<()> {
    let mut restarts: u32 = 0;

    loop {
        info!(cmd = %settings.cmd, restarts, "starting supervised process");

        let mut child = spawn_server(&settings.cmd)?;
        let stdout = child.stdout.take();
        announce_ready(&settings, stdout, restarts > 0, reload.clone());

        tokio::select! {
            _ = shutdown_rx.recv() => {
                info!("stopping supervised process");
                if let Err(err) = child.kill().await {
                    warn!("failed to kill supervised process: {err}");
                }
                return Ok(());
            }
            status = child.wait() => {
                let status = status.context("waiting for supervised process")?;
                warn!(
                    exit_code = status.code().unwrap_or(-1),
                    success = status.success(),
                    "supervised process exited"
                );

                if restarts >= settings.max_restarts {
                    return Err(GantryError::ProcessSupervision {
                        restarts: settings.max_restarts,
                    });
                }
                restarts += 1;

                sleep(settings.restart_delay).await;
            }
        }
    }
}

fn spawn_server(cmd: &str) -> Result<Child> {
    shell_command(cmd)
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .kill_on_drop(true)
        .spawn()
        .map_err(GantryError::Io)
}

/// Watch for the child becoming ready and, on a restart, notify reload
/// observers after the configured delay.
///
/// With a `ready_pattern`, readiness is the first stdout line matching it;
/// stdout keeps being drained afterwards. Without one, readiness is
/// assumed immediately.
fn announce_ready(
    settings: &ServeSettings,
    stdout: Option<ChildStdout>,
    is_restart: bool,
    reload: ReloadHub,
) {
    let ready_rx = match (&settings.ready_pattern, stdout) {
        (Some(pattern), Some(stdout)) => watch_stdout_ready(pattern.clone(), stdout),
        (Some(_), None) => {
            warn!("ready_pattern configured but no stdout pipe; assuming ready");
            immediate_ready()
        }
        (None, stdout) => {
            if let Some(stdout) = stdout {
                drain_stdout(stdout);
            }
            immediate_ready()
        }
    };

    let delay = settings.restart_delay;
    tokio::spawn(async move {
        // The sender is dropped without firing when the child exits
        // before becoming ready; nothing to announce then.
        if ready_rx.await.is_err() {
            return;
        }
        info!("supervised process is ready");
        if is_restart {
            sleep(delay).await;
            reload.notify();
        }
    });
}

fn immediate_ready() -> oneshot::Receiver<()> {
    let (tx, rx) = oneshot::channel();
    let _ = tx.send(());
    rx
}

fn watch_stdout_ready(pattern: Regex, stdout: ChildStdout) -> oneshot::Receiver<()> {
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let mut tx = Some(tx);
        let mut lines = BufReader::new(stdout).lines();

        while let Ok(Some(line)) = lines.next_line().await {
            debug!("server stdout: {line}");
            if pattern.is_match(&line) {
                if let Some(tx) = tx.take() {
                    let _ = tx.send(());
                }
            }
        }

        debug!("server stdout closed");
    });

    rx
}

fn drain_stdout(stdout: ChildStdout) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(stdout).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            debug!("server stdout: {line}");
        }
    });
}
