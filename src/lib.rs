// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod graph;
pub mod logging;
pub mod serve;
pub mod watch;

use std::path::{Path, PathBuf};

use anyhow::anyhow;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::cli::{CliArgs, Command};
use crate::config::loader::load_and_validate;
use crate::config::model::ConfigFile;
use crate::config::parse_duration;
use crate::engine::{
    Runtime, RuntimeEvent, RuntimeOptions, TriggerQueue, TriggerReason,
};
use crate::errors::{GantryError, Result};
use crate::exec::ShellExecutorBackend;
use crate::graph::{RunReport, Session, TaskGraph};
use crate::serve::{ReloadHub, ReloadListener, ServeSettings, Supervisor};
use crate::watch::{spawn_watcher, watch_rules_from_config};

/// High-level entry point used by `main.rs`.
///
/// Wires together config loading, graph construction, the runtime event
/// loop, the executor, and (per subcommand) the file watcher, the reload
/// channel and the process supervisor.
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)?;
    let mode = resolve_mode(&cfg, args.mode.as_deref())?;

    match args.command {
        Command::Run { task, dry_run } => {
            if dry_run {
                print_plan(&cfg, &mode);
                return Ok(());
            }
            let target = task.unwrap_or_else(|| cfg.config.default_task.clone());
            run_once(&cfg, &mode, &target).await
        }
        Command::Watch => run_persistent(&cfg, &mode, &config_path, false).await,
        Command::Serve => run_persistent(&cfg, &mode, &config_path, true).await,
    }
}

/// One-shot `run [TASK]`: execute the target's dependency closure and
/// surface the first failure, if any, as the process outcome.
async fn run_once(cfg: &ConfigFile, mode: &str, target: &str) -> Result<()> {
    let graph = TaskGraph::from_config(cfg, mode)?;
    if !graph.contains(target) {
        return Err(GantryError::TaskNotFound(target.to_string()));
    }

    let session = Session::new(graph);
    let queue = TriggerQueue::new(cfg.config.on_retrigger, cfg.config.queue_length);

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);
    let executor = ShellExecutorBackend::new(rt_tx.clone());
    spawn_ctrl_c_handler(rt_tx.clone());

    send_trigger(&rt_tx, target).await?;

    let options = RuntimeOptions {
        exit_when_idle: true,
    };
    let runtime = Runtime::new(session, queue, options, rt_rx, executor);
    let report = runtime.run().await?;

    match report {
        Some(report) => first_error(&report),
        // Interrupted before any run finished.
        None => Ok(()),
    }
}

/// Watch and serve mode share this flow: initial build of the default
/// task, then a persistent watch loop; serve mode adds the supervised
/// server process and the reload channel.
async fn run_persistent(
    cfg: &ConfigFile,
    mode: &str,
    config_path: &Path,
    serving: bool,
) -> Result<()> {
    let graph = TaskGraph::from_config(cfg, mode)?;
    let target = cfg.config.default_task.clone();
    if !graph.contains(&target) {
        return Err(GantryError::TaskNotFound(target));
    }

    let debounce = parse_duration(&cfg.config.debounce)?;

    let session = Session::new(graph);
    let queue = TriggerQueue::new(cfg.config.on_retrigger, cfg.config.queue_length);

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);
    let (report_tx, mut report_rx) = mpsc::channel::<RunReport>(8);
    let executor = ShellExecutorBackend::new(rt_tx.clone());
    spawn_ctrl_c_handler(rt_tx.clone());

    // Serve infrastructure binds before anything runs, so observers can
    // connect early; the server itself starts after the initial build.
    let serve_parts: Option<(ServeSettings, ReloadHub, ReloadListener)> = if serving {
        let section = cfg.serve.as_ref().ok_or_else(|| {
            GantryError::Config("serve mode requires a [serve] section".to_string())
        })?;
        let settings = ServeSettings::from_config(section)?;
        let (hub, listener) = serve::reload::bind(&section.reload_addr).await?;
        Some((settings, hub, listener))
    } else {
        None
    };

    send_trigger(&rt_tx, &target).await?;

    let options = RuntimeOptions {
        exit_when_idle: false,
    };
    let runtime = Runtime::new(session, queue, options, rt_rx, executor)
        .with_reports(report_tx);
    let runtime_task = tokio::spawn(runtime.run());

    // Wait for the initial build before subscribing the watcher, so file
    // changes racing the first build cannot interleave with it.
    let initial = report_rx.recv().await;
    match &initial {
        Some(report) if report.success() => info!("initial build succeeded"),
        Some(_) => warn!("initial build failed; watching for changes anyway"),
        None => info!("interrupted before the initial build finished"),
    }

    let mut reload_hub = None;
    let mut reload_listener = None;
    let mut supervisor = None;

    let _watcher = if initial.is_some() {
        let rules = watch_rules_from_config(cfg)?;
        let handle = spawn_watcher(config_root_dir(config_path), rules, rt_tx.clone(), debounce)?;

        if let Some((settings, hub, listener)) = serve_parts {
            supervisor = Some(Supervisor::spawn(settings, hub.clone(), rt_tx.clone()));
            reload_hub = Some(hub);
            reload_listener = Some(listener);
        }
        Some(handle)
    } else {
        if let Some((_, _, listener)) = serve_parts {
            listener.stop();
        }
        None
    };

    // Drain reports until the runtime exits; every successful rebuild
    // notifies connected reload observers.
    while let Some(report) = report_rx.recv().await {
        if report.success() {
            if let Some(hub) = &reload_hub {
                hub.notify();
            }
        }
    }

    runtime_task
        .await
        .map_err(|e| GantryError::Other(anyhow!("runtime task panicked: {e}")))??;

    // Scoped shutdown: stop the supervised server and the reload
    // listener; dropping the watcher handle releases its subscriptions.
    let outcome = match supervisor {
        Some(sup) => sup.stop().await,
        None => Ok(()),
    };
    if let Some(listener) = reload_listener {
        listener.stop();
    }
    outcome
}

/// The failing task's error from a finished report, or `Ok` on success.
fn first_error(report: &RunReport) -> Result<()> {
    match report.errors().into_iter().next() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

async fn send_trigger(rt_tx: &mpsc::Sender<RuntimeEvent>, task: &str) -> Result<()> {
    rt_tx
        .send(RuntimeEvent::TaskTriggered {
            task: task.to_string(),
            reason: TriggerReason::Manual,
        })
        .await
        .map_err(|e| GantryError::Other(anyhow!("sending initial trigger: {e}")))
}

fn spawn_ctrl_c_handler(rt_tx: mpsc::Sender<RuntimeEvent>) {
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            eprintln!("failed to listen for Ctrl+C: {e}");
            return;
        }
        let _ = rt_tx.send(RuntimeEvent::ShutdownRequested).await;
    });
}

/// Select and validate the build mode: the CLI flag wins, else the
/// configured default; either way it must be a recognized mode.
fn resolve_mode(cfg: &ConfigFile, cli_mode: Option<&str>) -> Result<String> {
    let mode = cli_mode.unwrap_or(&cfg.modes.default);
    if !cfg.modes.known.iter().any(|known| known == mode) {
        return Err(GantryError::Config(format!(
            "unrecognized build mode '{mode}' (known: {:?})",
            cfg.modes.known
        )));
    }
    Ok(mode.to_string())
}

/// Project root for watching: the directory containing the config file,
/// or the working directory for a bare filename.
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

/// Dry-run output: the mode-resolved plan, no execution.
fn print_plan(cfg: &ConfigFile, mode: &str) {
    println!("gantry plan (mode: {mode})");
    println!("  default task: {}", cfg.config.default_task);
    println!("  on_retrigger: {:?}", cfg.config.on_retrigger);
    println!();

    println!("tasks ({}):", cfg.task.len());
    for (name, task) in cfg.task.iter() {
        println!("  - {name}");
        println!("      cmd: {}", task.effective_cmd(mode));
        if !task.after.is_empty() {
            println!("      after: {:?}", task.after);
        }
        let watch = task.watch.as_ref().unwrap_or(&cfg.default.watch);
        if !watch.is_empty() {
            println!("      watch: {watch:?}");
        }
        let exclude = task.exclude.as_ref().unwrap_or(&cfg.default.exclude);
        if !exclude.is_empty() {
            println!("      exclude: {exclude:?}");
        }
    }

    if let Some(serve) = &cfg.serve {
        println!();
        println!("serve:");
        println!("      cmd: {}", serve.cmd);
        println!("      max_restarts: {}", serve.max_restarts);
        println!("      reload_addr: {}", serve.reload_addr);
    }
}
