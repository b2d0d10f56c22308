// src/serve/mod.rs

//! Serve mode: a supervised server process plus reload notifications.
//!
//! - [`supervisor`] keeps the long-running server command alive, with a
//!   bounded restart budget and an optional stdout readiness pattern.
//! - [`reload`] is the notification channel: observers connect over TCP
//!   and receive a `reload` line whenever a rebuild or a server restart
//!   completes.

pub mod reload;
pub mod supervisor;

pub use reload::{ReloadHub, ReloadListener};
pub use supervisor::{ServeSettings, Supervisor};
