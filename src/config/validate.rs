// src/config/validate.rs

use regex::Regex;

use crate::config::duration::parse_duration;
use crate::config::model::ConfigFile;
use crate::errors::{GantryError, Result};
use crate::graph::TaskGraph;

/// Semantic validation of a loaded configuration.
///
/// Checks:
/// - at least one task is declared
/// - `queue_length >= 1` and `debounce` parses
/// - the default build mode and every per-task mode override name a
///   recognized mode
/// - `[serve]`: `restart_delay` parses and `ready_pattern` compiles
/// - the task graph validates (unknown `after` references, self-deps,
///   cycles)
pub fn validate_config(cfg: &ConfigFile) -> Result<()> {
    ensure_has_tasks(cfg)?;
    validate_global(cfg)?;
    validate_modes(cfg)?;
    validate_serve(cfg)?;

    // Graph shape: building with the default mode exercises the same
    // register/validate path every run uses.
    TaskGraph::from_config(cfg, &cfg.modes.default)?;
    Ok(())
}

fn ensure_has_tasks(cfg: &ConfigFile) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(GantryError::Config(
            "config must contain at least one [task.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_global(cfg: &ConfigFile) -> Result<()> {
    if cfg.config.queue_length == 0 {
        return Err(GantryError::Config(
            "[config].queue_length must be >= 1 (got 0)".to_string(),
        ));
    }
    parse_duration(&cfg.config.debounce)?;
    Ok(())
}

fn validate_modes(cfg: &ConfigFile) -> Result<()> {
    if cfg.modes.known.is_empty() {
        return Err(GantryError::Config(
            "[modes].known must list at least one build mode".to_string(),
        ));
    }

    if !cfg.modes.known.contains(&cfg.modes.default) {
        return Err(GantryError::Config(format!(
            "[modes].default '{}' is not in [modes].known",
            cfg.modes.default
        )));
    }

    for (name, task) in cfg.task.iter() {
        for mode in task.mode.keys() {
            if !cfg.modes.known.contains(mode) {
                return Err(GantryError::Config(format!(
                    "task '{name}' overrides unrecognized mode '{mode}'"
                )));
            }
        }
    }

    Ok(())
}

fn validate_serve(cfg: &ConfigFile) -> Result<()> {
    let Some(serve) = &cfg.serve else {
        return Ok(());
    };

    if serve.cmd.trim().is_empty() {
        return Err(GantryError::Config(
            "[serve].cmd must not be empty".to_string(),
        ));
    }

    parse_duration(&serve.restart_delay)?;

    if let Some(pattern) = &serve.ready_pattern {
        Regex::new(pattern).map_err(|e| {
            GantryError::Config(format!("invalid [serve].ready_pattern: {e}"))
        })?;
    }

    Ok(())
}
