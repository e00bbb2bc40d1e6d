// src/exec/backend.rs

//! Pluggable command backend.
//!
//! The orchestrator talks to a `CommandBackend` instead of spawning processes
//! itself. This makes it easy to swap in a fake backend in tests while keeping
//! the production implementation in [`super::command`].

use std::future::Future;
use std::pin::Pin;

use tokio_util::sync::CancellationToken;

use crate::errors::CommandError;
use crate::exec::command::run_command;
use crate::exec::process::ProcessHandle;

/// How the orchestrator starts prep and run commands.
pub trait CommandBackend: Send {
    /// Run a command to completion (the prep step).
    ///
    /// Cancelling `cancel` should make this return promptly with
    /// [`CommandError::Cancelled`].
    fn run_to_completion(
        &mut self,
        command: &str,
        cancel: CancellationToken,
    ) -> Pin<Box<dyn Future<Output = Result<(), CommandError>> + Send + '_>>;

    /// Start a long-running command (the run step) and return its handle
    /// without waiting.
    fn start_detached(
        &mut self,
        command: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Box<dyn ProcessHandle>, CommandError>> + Send + '_>>;
}

/// Backend that runs real shell commands.
#[derive(Debug, Clone, Default)]
pub struct ShellBackend;

impl CommandBackend for ShellBackend {
    fn run_to_completion(
        &mut self,
        command: &str,
        cancel: CancellationToken,
    ) -> Pin<Box<dyn Future<Output = Result<(), CommandError>> + Send + '_>> {
        let command = command.to_string();
        Box::pin(async move {
            run_command(&cancel, &command, true).await?;
            Ok(())
        })
    }

    fn start_detached(
        &mut self,
        command: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Box<dyn ProcessHandle>, CommandError>> + Send + '_>> {
        let command = command.to_string();
        Box::pin(async move {
            // The run command is only ever stopped through explicit
            // termination, never through a token.
            let never = CancellationToken::new();
            let process = run_command(&never, &command, false).await?;
            Ok(Box::new(process) as Box<dyn ProcessHandle>)
        })
    }
}
