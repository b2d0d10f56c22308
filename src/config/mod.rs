// src/config/mod.rs

//! Configuration loading and validation.
//!
//! `Gantry.toml` declares the task graph, watch patterns, build modes and
//! the optional `[serve]` section. [`loader`] reads and parses, then
//! [`validate`] checks semantics (graph shape included) before anything
//! runs.

pub mod duration;
pub mod loader;
pub mod model;
pub mod validate;

pub use duration::parse_duration;
pub use loader::{load_and_validate, load_from_path};
pub use model::{
    ConfigFile, ConfigSection, DefaultSection, ModeOverride, ModesSection, ServeSection,
    TaskConfig,
};
pub use validate::validate_config;
