// src/engine/mod.rs

//! Change-to-action orchestration engine.
//!
//! This module ties together:
//! - the bounded change queue fed by the watcher
//! - the cycle orchestrator (cancel prep, restart run)
//! - the per-cycle supersession watcher
//! - the process termination protocol
//!
//! Two cancellation vocabularies are kept apart: in-process work
//! (prep wait, supersession watchers, the event loop) hangs off a
//! `CancellationToken` tree rooted at process shutdown, while spawned process
//! trees are only ever stopped through [`terminate::terminate_process`].

use std::path::PathBuf;

/// A logical, already debounced change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSignal {
    /// Path of the raw event that triggered it.
    pub path: PathBuf,
}

impl ChangeSignal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

/// Where the orchestrator currently is in a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    /// No prep running and no run command alive.
    Idle,
    /// The prep command of the current cycle is executing.
    RunningPrep,
    /// The run command is alive and the orchestrator waits for the next change.
    RunningMain,
}

pub mod orchestrator;
pub mod queue;
pub mod supersede;
pub mod terminate;

pub use orchestrator::{CycleCommands, Orchestrator, OrchestratorOptions};
pub use queue::{CHANGE_QUEUE_CAPACITY, ChangeReceiver, ChangeSender};
pub use supersede::{join_supersession_watcher, spawn_supersession_watcher};
pub use terminate::{TERMINATION_GRACE, terminate_process};
