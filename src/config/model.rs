// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::engine::RetriggerPolicy;

/// Top-level configuration as read from `Gantry.toml`:
///
/// ```toml
/// [config]
/// default_task = "default"
///
/// [modes]
/// known = ["development", "production"]
/// default = "development"
///
/// [default]
/// watch = ["app/**/*"]
/// exclude = ["dist/**"]
///
/// [serve]
/// cmd = "node server.js"
///
/// [task.css]
/// cmd = "sass app/scss:dist/css"
/// after = ["clean"]
/// watch = ["app/scss/**/*.scss"]
///
/// [task.css.mode.production]
/// cmd = "sass --style=compressed app/scss:dist/css"
/// ```
///
/// All sections except `[task.*]` are optional with sensible defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    #[serde(default)]
    pub modes: ModesSection,

    /// Defaults for `watch` / `exclude` from `[default]`.
    #[serde(default)]
    pub default: DefaultSection,

    /// Optional supervised server process for serve mode.
    #[serde(default)]
    pub serve: Option<ServeSection>,

    /// All tasks from `[task.<name>]`, keyed by task name.
    #[serde(default)]
    pub task: BTreeMap<String, TaskConfig>,
}

/// `[config]` section: global runner behaviour.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Task to run when `run` is invoked without a name, and the root of
    /// the initial build in watch/serve mode.
    #[serde(default = "default_task_name")]
    pub default_task: String,

    /// What to do with triggers arriving while a session runs.
    #[serde(default)]
    pub on_retrigger: RetriggerPolicy,

    /// Maximum number of queued trigger batches.
    #[serde(default = "default_queue_length")]
    pub queue_length: usize,

    /// Debounce window for repeated file events per task, e.g. `"200ms"`.
    #[serde(default = "default_debounce")]
    pub debounce: String,
}

fn default_task_name() -> String {
    "default".to_string()
}

fn default_queue_length() -> usize {
    1
}

fn default_debounce() -> String {
    "200ms".to_string()
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            default_task: default_task_name(),
            on_retrigger: RetriggerPolicy::default(),
            queue_length: default_queue_length(),
            debounce: default_debounce(),
        }
    }
}

/// `[modes]` section: the recognized build modes.
///
/// Modes replace per-call conditionals ("minify only in production") with
/// declarations resolved once at graph construction: a task's command for
/// mode M is its `[task.<name>.mode.<M>]` override when present, else its
/// base `cmd`.
#[derive(Debug, Clone, Deserialize)]
pub struct ModesSection {
    #[serde(default = "default_known_modes")]
    pub known: Vec<String>,

    #[serde(default = "default_mode_name")]
    pub default: String,
}

fn default_known_modes() -> Vec<String> {
    vec!["development".to_string(), "production".to_string()]
}

fn default_mode_name() -> String {
    "development".to_string()
}

impl Default for ModesSection {
    fn default() -> Self {
        Self {
            known: default_known_modes(),
            default: default_mode_name(),
        }
    }
}

/// `[default]` section: watch patterns for tasks that declare none.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct DefaultSection {
    #[serde(default)]
    pub watch: Vec<String>,

    #[serde(default)]
    pub exclude: Vec<String>,
}

/// `[serve]` section: the supervised server process.
#[derive(Debug, Clone, Deserialize)]
pub struct ServeSection {
    /// Command for the long-running server process.
    pub cmd: String,

    /// Restart budget over the life of the serve session.
    #[serde(default = "default_max_restarts")]
    pub max_restarts: u32,

    /// Pause before restarting (and before the post-restart reload
    /// notification), e.g. `"1s"`.
    #[serde(default = "default_restart_delay")]
    pub restart_delay: String,

    /// Optional regex matched against the child's stdout; the process
    /// counts as up once a line matches. Without it, readiness is assumed
    /// right after spawn.
    #[serde(default)]
    pub ready_pattern: Option<String>,

    /// Address reload observers connect to.
    #[serde(default = "default_reload_addr")]
    pub reload_addr: String,
}

fn default_max_restarts() -> u32 {
    3
}

fn default_restart_delay() -> String {
    "1s".to_string()
}

fn default_reload_addr() -> String {
    "127.0.0.1:35729".to_string()
}

/// `[task.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskConfig {
    /// The command to execute.
    pub cmd: String,

    /// Dependency list: this task waits for all tasks listed here.
    #[serde(default)]
    pub after: Vec<String>,

    /// Task-local watch patterns. If `None`, the task uses
    /// `default.watch`; an empty list opts the task out of watching.
    #[serde(default)]
    pub watch: Option<Vec<String>>,

    /// Task-local exclude patterns; same fallback as `watch`.
    #[serde(default)]
    pub exclude: Option<Vec<String>>,

    /// Per-mode command overrides from `[task.<name>.mode.<mode>]`.
    #[serde(default)]
    pub mode: BTreeMap<String, ModeOverride>,
}

/// A build mode's effect on one task.
#[derive(Debug, Clone, Deserialize)]
pub struct ModeOverride {
    pub cmd: String,
}

impl TaskConfig {
    /// The command this task runs under the given mode.
    pub fn effective_cmd(&self, mode: &str) -> &str {
        self.mode
            .get(mode)
            .map(|o| o.cmd.as_str())
            .unwrap_or(self.cmd.as_str())
    }
}
