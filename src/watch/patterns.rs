// src/watch/patterns.rs

use std::fmt;

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::config::model::ConfigFile;
use crate::engine::TaskName;

/// Compiled watch/exclude glob sets bound to one task.
///
/// Patterns are evaluated against paths relative to the project root,
/// with forward slashes (e.g. `"app/scss/site.scss"`).
#[derive(Clone)]
pub struct WatchRule {
    name: TaskName,
    include: GlobSet,
    exclude: Option<GlobSet>,
}

impl fmt::Debug for WatchRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchRule")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl WatchRule {
    /// Compile a rule from raw glob patterns.
    pub fn compile(
        name: impl Into<TaskName>,
        include: &[String],
        exclude: &[String],
    ) -> Result<Self> {
        let name = name.into();
        let include_set = build_globset(include)
            .with_context(|| format!("building watch globset for task '{name}'"))?;
        let exclude_set = if exclude.is_empty() {
            None
        } else {
            Some(
                build_globset(exclude)
                    .with_context(|| format!("building exclude globset for task '{name}'"))?,
            )
        };

        Ok(Self {
            name,
            include: include_set,
            exclude: exclude_set,
        })
    }

    /// The task this rule triggers.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// True if a change to `rel_path` should trigger the task.
    pub fn matches(&self, rel_path: &str) -> bool {
        if !self.include.is_match(rel_path) {
            return false;
        }
        if let Some(exclude) = &self.exclude {
            if exclude.is_match(rel_path) {
                return false;
            }
        }
        true
    }
}

/// Build one rule per task that has effective watch patterns.
///
/// A task's own `watch` / `exclude` lists take precedence; tasks that
/// declare none inherit the `[default]` lists. Tasks with an empty
/// effective watch list (e.g. `clean`) get no rule and are only ever run
/// as dependencies or explicit targets.
pub fn watch_rules_from_config(cfg: &ConfigFile) -> Result<Vec<WatchRule>> {
    let mut rules = Vec::new();

    for (name, task) in cfg.task.iter() {
        let include = task.watch.as_ref().unwrap_or(&cfg.default.watch);
        if include.is_empty() {
            continue;
        }
        let exclude = task.exclude.as_ref().unwrap_or(&cfg.default.exclude);

        rules.push(WatchRule::compile(name.clone(), include, exclude)?);
    }

    Ok(rules)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat).with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}
