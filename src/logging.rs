// src/logging.rs

//! Logging setup for `watchrun` using `tracing` + `tracing-subscriber`.
//!
//! The filter is taken from, in order:
//! 1. `--log-level` (applies to every target)
//! 2. `WATCHRUN_LOG`, which accepts full `EnvFilter` directives
//!    (`debug`, `watchrun::engine=trace,info`, ...)
//! 3. `info`
//!
//! Logs and status lines go to STDERR. The watched commands inherit STDOUT.

use std::fmt::Display;

use anyhow::Result;
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::LogLevel;

/// Environment variable consulted when `--log-level` is absent.
pub const LOG_ENV: &str = "WATCHRUN_LOG";

const DEFAULT_DIRECTIVES: &str = "info";

/// Install the global subscriber. Call once, at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let env = std::env::var(LOG_ENV).ok();
    let directives = filter_directives(cli_level, env.as_deref());

    let filter = EnvFilter::try_new(&directives).unwrap_or_else(|e| {
        eprintln!("[watchrun] ignoring invalid {LOG_ENV}={directives:?}: {e}");
        EnvFilter::new(DEFAULT_DIRECTIVES)
    });

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install log subscriber: {e}"))?;

    Ok(())
}

/// Resolve the filter string from the CLI flag and the raw `WATCHRUN_LOG`
/// value. Blank environment values are ignored.
pub fn filter_directives(cli_level: Option<LogLevel>, env: Option<&str>) -> String {
    if let Some(level) = cli_level {
        return level_directive(level).to_string();
    }
    match env.map(str::trim) {
        Some(value) if !value.is_empty() => value.to_string(),
        _ => DEFAULT_DIRECTIVES.to_string(),
    }
}

fn level_directive(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    }
}

/// Print a user-facing status line (`[watchrun] Running: make`), regardless
/// of the log filter.
pub fn status(label: &str, message: impl Display) {
    eprintln!("[watchrun] {label}: {message}");
}
