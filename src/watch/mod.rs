// src/watch/mod.rs

//! File watching.
//!
//! - [`patterns`] compiles per-task `watch` / `exclude` globs into
//!   [`WatchRule`]s.
//! - [`watcher`] wires a cross-platform filesystem watcher (`notify`) that
//!   turns matching change events into task triggers, with a per-task
//!   debounce window.
//!
//! This module knows nothing about dependencies; it only maps filesystem
//! changes to task-level triggers.

pub mod patterns;
pub mod watcher;

pub use patterns::{watch_rules_from_config, WatchRule};
pub use watcher::{spawn_watcher, WatcherHandle};
