// src/exec/command.rs

//! Shell command runner.

use std::process::Stdio;

use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::errors::CommandError;
use crate::exec::process::ShellProcess;
use crate::logging;

/// Run `command` through the platform shell.
///
/// - The process is placed in its own process group so that the whole tree
///   can be signalled later (see [`crate::exec::ProcessHandle::terminate`]).
/// - STDOUT / STDERR are inherited; STDIN is closed.
/// - With `wait = true` this blocks until the command exits and fails with
///   [`CommandError::Exit`] on a non-zero status. The returned handle is the
///   finished process.
/// - With `wait = false` the live handle is returned right after spawning.
///
/// Cancelling `cancel` while waiting kills the group leader only (like
/// dropping a context on an external process) and yields
/// [`CommandError::Cancelled`]. Tearing down the rest of the group is the
/// caller's business.
pub async fn run_command(
    cancel: &CancellationToken,
    command: &str,
    wait: bool,
) -> Result<ShellProcess, CommandError> {
    logging::status("Running", command);

    let result = run_command_inner(cancel, command, wait).await;
    match &result {
        Err(err) if err.is_cancelled() => {
            warn!(cmd = %command, "command cancelled");
        }
        Err(err) => {
            logging::status("Error", err);
            error!(cmd = %command, error = %err, "command failed");
        }
        Ok(_) => {}
    }
    result
}

async fn run_command_inner(
    cancel: &CancellationToken,
    command: &str,
    wait: bool,
) -> Result<ShellProcess, CommandError> {
    if cancel.is_cancelled() {
        return Err(CommandError::Cancelled {
            cmd: command.to_string(),
        });
    }

    let mut child = shell_command(command)
        .spawn()
        .map_err(|source| CommandError::Spawn {
            cmd: command.to_string(),
            source,
        })?;

    info!(cmd = %command, pid = ?child.id(), wait, "command started");

    if !wait {
        return Ok(ShellProcess::new(command.to_string(), child));
    }

    tokio::select! {
        status = child.wait() => {
            let status = status.map_err(|source| CommandError::Wait {
                cmd: command.to_string(),
                source,
            })?;

            debug!(cmd = %command, code = ?status.code(), "command exited");

            if !status.success() {
                return Err(CommandError::Exit {
                    cmd: command.to_string(),
                    code: status.code(),
                });
            }
        }

        _ = cancel.cancelled() => {
            debug!(cmd = %command, "cancellation requested; killing command");
            if let Err(e) = child.start_kill() {
                debug!(cmd = %command, error = %e, "kill after cancellation failed");
            }
            if let Err(e) = child.wait().await {
                debug!(cmd = %command, error = %e, "reaping cancelled command failed");
            }
            return Err(CommandError::Cancelled {
                cmd: command.to_string(),
            });
        }
    }

    Ok(ShellProcess::new(command.to_string(), child))
}

/// Build a shell command appropriate for the platform.
fn shell_command(command: &str) -> Command {
    let mut cmd = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(command);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(command);
        c
    };

    cmd.stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .kill_on_drop(true);

    #[cfg(unix)]
    cmd.process_group(0);

    cmd
}
