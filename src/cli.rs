// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `watchrun`.
#[derive(Debug, Clone, Default, Parser)]
#[command(
    name = "watchrun",
    version,
    about = "Watch directories, rebuild on change and restart the program.",
    long_about = None,
    after_help = "Example:\n  watchrun --init-cmd=\"echo start\" --prep-cmd=\"go build -o app .\" \
                  --run-cmd=\"./app\" --file-extensions=\".go,.mod\" ./cmd ./internal"
)]
pub struct CliArgs {
    /// Command executed once on startup, before watching begins.
    #[arg(long, value_name = "CMD")]
    pub init_cmd: Option<String>,

    /// Command executed on every change (compilation).
    #[arg(long, value_name = "CMD")]
    pub prep_cmd: Option<String>,

    /// Command that runs the program. Restarted after every successful prep.
    #[arg(long, value_name = "CMD")]
    pub run_cmd: Option<String>,

    /// File extensions to react to, comma separated.
    ///
    /// Default: `.go,.mod`. Pass an empty string to react to every file.
    #[arg(long, value_name = "EXTS", value_delimiter = ',')]
    pub file_extensions: Option<Vec<String>>,

    /// Path to a TOML config file.
    ///
    /// Default: `Watchrun.toml` in the current working directory, if present.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `WATCHRUN_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Resolve and print the settings, but don't run or watch anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Directories (or files) to watch. Default: the current directory.
    #[arg(value_name = "PATH")]
    pub paths: Vec<PathBuf>,
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
