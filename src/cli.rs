// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `funsize`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "funsize",
    version,
    about = "Schedule partial update generation for finished nightly builds.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    #[arg(long, value_name = "PATH", default_value = "funsize.toml")]
    pub config: String,

    /// Read build-finished messages (one JSON document per line) from this
    /// file instead of STDIN.
    #[arg(long, value_name = "PATH")]
    pub events: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `FUNSIZE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Build graphs but log them instead of submitting to the scheduler.
    #[arg(long)]
    pub dry_run: bool,
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
