// src/watch/watcher.rs

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::engine::{RuntimeEvent, TaskName, TriggerReason};
use crate::watch::patterns::WatchRule;

/// Handle keeping the filesystem watcher alive.
///
/// Dropping it drops the underlying `notify` watcher, which releases every
/// subscription: after that, file changes trigger nothing.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

/// Watch `root` recursively and send `TaskTriggered` for every rule whose
/// patterns match a changed path.
///
/// Repeat triggers for the same task inside `debounce` are dropped; editors
/// tend to emit bursts of events per save.
pub fn spawn_watcher(
    root: impl Into<PathBuf>,
    rules: Vec<WatchRule>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    debounce: Duration,
) -> Result<WatcherHandle> {
    let root = root.into();
    let root = root.canonicalize().unwrap_or_else(|_| root.clone());

    let rules = Arc::new(rules);

    // Bridge from the blocking notify callback into the async world.
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();

    let watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if let Err(err) = event_tx.send(event) {
                    // tracing isn't usable from the notify thread reliably.
                    eprintln!("gantry: failed to forward notify event: {err}");
                }
            }
            Err(err) => {
                eprintln!("gantry: file watch error: {err}");
            }
        },
        Config::default(),
    )
    .and_then(|mut w| {
        w.watch(&root, RecursiveMode::Recursive)?;
        Ok(w)
    })?;

    info!("file watcher started on {:?}", root);

    let async_root = root.clone();
    let async_rules = Arc::clone(&rules);
    tokio::spawn(async move {
        let mut last_sent: HashMap<TaskName, Instant> = HashMap::new();

        while let Some(event) = event_rx.recv().await {
            debug!(?event, "received notify event");

            for path in &event.paths {
                let Some(rel) = relative_str(&async_root, path) else {
                    debug!(?path, "path outside watch root; ignoring");
                    continue;
                };

                for rule in async_rules.iter() {
                    if !rule.matches(&rel) {
                        continue;
                    }

                    let now = Instant::now();
                    if let Some(prev) = last_sent.get(rule.name()) {
                        if now.duration_since(*prev) < debounce {
                            debug!(task = %rule.name(), path = %rel, "debounced repeat trigger");
                            continue;
                        }
                    }
                    last_sent.insert(rule.name().to_string(), now);

                    debug!(task = %rule.name(), path = %rel, "watch match, triggering task");
                    if let Err(err) = runtime_tx
                        .send(RuntimeEvent::TaskTriggered {
                            task: rule.name().to_string(),
                            reason: TriggerReason::FileWatch,
                        })
                        .await
                    {
                        warn!("runtime channel closed ({err}); stopping watch loop");
                        return;
                    }
                }
            }
        }

        debug!("file watcher loop ended");
    });

    Ok(WatcherHandle { _inner: watcher })
}

/// Relativize a path against `root`, normalising to forward slashes.
fn relative_str(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    Some(rel.to_string_lossy().replace('\\', "/"))
}
