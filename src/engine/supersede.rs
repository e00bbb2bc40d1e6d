// src/engine/supersede.rs

//! The "change arrived while busy" watcher spawned once per cycle.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::queue::{ChangeReceiver, ChangeSender};

/// Watch the change queue for the duration of one cycle.
///
/// The watcher takes ownership of the receiver and hands it back through the
/// join handle. It finishes on the first of:
/// - a new change: the cycle token is cancelled and the change is
///   re-enqueued, so the orchestrator starts a fresh cycle for it;
/// - cancellation of `cycle` (process shutdown, via the parent token).
///
/// The watcher never touches process handles.
pub fn spawn_supersession_watcher(
    mut changes: ChangeReceiver,
    queue: ChangeSender,
    cycle: CancellationToken,
) -> JoinHandle<ChangeReceiver> {
    tokio::spawn(async move {
        tokio::select! {
            _ = cycle.cancelled() => {
                debug!("cycle cancelled; supersession watcher exiting");
            }
            next = changes.recv() => {
                if let Some(change) = next {
                    debug!(path = ?change.path, "change arrived during cycle; superseding");
                    cycle.cancel();
                    queue.requeue(change);
                }
            }
        }
        changes
    })
}

/// Wait for a supersession watcher and take the receiver back.
///
/// `None` means the watcher panicked or was aborted. Its receiver was dropped
/// with it, which closes the change queue.
pub async fn join_supersession_watcher(
    watcher: JoinHandle<ChangeReceiver>,
) -> Option<ChangeReceiver> {
    match watcher.await {
        Ok(changes) => Some(changes),
        Err(err) => {
            warn!(error = %err, "supersession watcher failed; stopping orchestrator");
            None
        }
    }
}
