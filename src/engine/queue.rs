// src/engine/queue.rs

use std::collections::{HashSet, VecDeque};

use serde::Deserialize;
use tracing::{debug, warn};

use super::TaskName;

/// What to do with a trigger that arrives while a session is running.
///
/// - `Queue`: remember it and start a new session when the current one
///   finishes (default).
/// - `Cancel`: drop anything already queued and keep only the latest
///   trigger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetriggerPolicy {
    #[default]
    Queue,
    Cancel,
}

/// Backlog of triggers that arrived while a session was active.
///
/// Each entry is a batch of task names to be triggered together as one
/// future session. `queue_length` bounds how many batches are remembered;
/// when the runner goes idle, [`TriggerQueue::drain_pending`] merges all
/// batches into a single trigger set for the next session.
#[derive(Debug)]
pub struct TriggerQueue {
    policy: RetriggerPolicy,
    max_batches: usize,
    batches: VecDeque<HashSet<TaskName>>,
}

impl TriggerQueue {
    /// `max_batches` is clamped to at least 1; a zero-length backlog would
    /// silently drop every trigger.
    pub fn new(policy: RetriggerPolicy, max_batches: usize) -> Self {
        Self {
            policy,
            max_batches: max_batches.max(1),
            batches: VecDeque::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    pub fn policy(&self) -> RetriggerPolicy {
        self.policy
    }

    /// Record a trigger for a future session.
    pub fn record_trigger(&mut self, task: &str) {
        match self.policy {
            RetriggerPolicy::Queue => {
                match self.batches.back_mut() {
                    Some(batch) => {
                        batch.insert(task.to_string());
                        debug!(task = %task, "merged trigger into queued batch");
                    }
                    None => {
                        self.batches
                            .push_back(HashSet::from([task.to_string()]));
                        debug!(task = %task, "queued first trigger batch");
                    }
                }

                if self.batches.len() > self.max_batches {
                    warn!(
                        batches = self.batches.len(),
                        max = self.max_batches,
                        "trigger backlog over limit; dropping oldest batches"
                    );
                    while self.batches.len() > self.max_batches {
                        self.batches.pop_front();
                    }
                }
            }
            RetriggerPolicy::Cancel => {
                debug!(task = %task, "cancel policy: keeping only latest trigger");
                self.batches.clear();
                self.batches
                    .push_back(HashSet::from([task.to_string()]));
            }
        }
    }

    /// Merge every queued batch into one set of trigger names for the next
    /// session.
    pub fn drain_pending(&mut self) -> Vec<TaskName> {
        let mut merged: HashSet<TaskName> = HashSet::new();
        while let Some(batch) = self.batches.pop_front() {
            merged.extend(batch);
        }

        let tasks: Vec<TaskName> = merged.into_iter().collect();
        if !tasks.is_empty() {
            debug!(drained = tasks.len(), "drained trigger backlog");
        }
        tasks
    }
}
