// src/engine/terminate.rs

//! Escalating shutdown of a spawned process tree.

use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, info};

use crate::exec::ProcessHandle;

/// Time a process gets between the graceful request and SIGKILL.
pub const TERMINATION_GRACE: Duration = Duration::from_millis(500);

/// Stop `handle` and everything in its process group:
///
/// 1. graceful terminate (group, then leader)
/// 2. wait up to `grace` for the leader to exit
/// 3. force-kill the leader if it is still alive
/// 4. reap it
///
/// Every step is best-effort; failures are logged, never returned.
pub async fn terminate_process(handle: &mut dyn ProcessHandle, grace: Duration) {
    let pid = handle.id();
    debug!(?pid, "terminating process group");

    if let Err(e) = handle.terminate() {
        debug!(?pid, error = %e, "graceful terminate failed (process may have exited)");
    }

    match timeout(grace, handle.wait()).await {
        Ok(Ok(code)) => {
            debug!(?pid, ?code, "process exited within grace period");
            return;
        }
        Ok(Err(e)) => {
            debug!(?pid, error = %e, "waiting for process failed; forcing kill");
        }
        Err(_elapsed) => {
            info!(
                ?pid,
                grace_ms = grace.as_millis() as u64,
                "process still alive after grace period; killing"
            );
        }
    }

    if let Err(e) = handle.force_kill() {
        debug!(?pid, error = %e, "force kill failed");
    }
    match handle.wait().await {
        Ok(code) => debug!(?pid, ?code, "process reaped"),
        Err(e) => debug!(?pid, error = %e, "reaping process failed"),
    }
}
