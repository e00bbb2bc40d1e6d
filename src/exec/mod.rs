// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`command`] runs a shell command in its own process group, either to
//!   completion or detached.
//! - [`process`] defines the `ProcessHandle` capability (signal + reap) and
//!   its `sh -c` implementation.
//! - [`backend`] provides the `CommandBackend` trait the orchestrator drives,
//!   and the real `ShellBackend`; tests substitute a fake.

pub mod backend;
pub mod command;
pub mod process;

pub use backend::{CommandBackend, ShellBackend};
pub use command::run_command;
pub use process::{ProcessHandle, ShellProcess};
