// src/errors.rs

//! Crate-wide error taxonomy.
//!
//! Registration and validation errors (`DuplicateTask`, `MissingDependency`,
//! `Cycle`) are fatal at startup. `TaskExecution` and `UpstreamFailure` are
//! session-local: they end up on a [`RunReport`](crate::graph::RunReport)
//! and never tear down the runtime.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GantryError {
    #[error("task '{0}' is already registered")]
    DuplicateTask(String),

    #[error("task '{task}' depends on unknown task '{dependency}'")]
    MissingDependency { task: String, dependency: String },

    #[error("cycle detected in task graph involving '{0}'")]
    Cycle(String),

    #[error("no task named '{0}'")]
    TaskNotFound(String),

    #[error("task '{task}' exited with code {code}")]
    TaskExecution { task: String, code: i32 },

    #[error("task '{task}' skipped: upstream dependency '{failed}' failed")]
    UpstreamFailure { task: String, failed: String },

    #[error("supervised process exceeded restart budget ({restarts} restarts)")]
    ProcessSupervision { restarts: u32 },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, GantryError>;
