// src/cli.rs

//! CLI argument parsing using `clap` (derive feature).

use clap::{Parser, Subcommand, ValueEnum};

/// Command-line arguments for `gantry`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "gantry",
    version,
    about = "Task-graph build runner with watch and serve modes.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    #[arg(long, global = true, value_name = "PATH", default_value = "Gantry.toml")]
    pub config: String,

    /// Build mode (must be listed in [modes].known).
    ///
    /// If omitted, [modes].default is used.
    #[arg(long, global = true, value_name = "MODE")]
    pub mode: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `GANTRY_LOG` or a default level will be used.
    #[arg(long, global = true, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run a task and its dependency closure once.
    Run {
        /// Task to run; the configured default task if omitted.
        task: Option<String>,

        /// Print the resolved plan without executing anything.
        #[arg(long)]
        dry_run: bool,
    },

    /// Build once, then re-run tasks as watched files change.
    Watch,

    /// Watch, plus a supervised server process and reload notifications.
    Serve,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
