// src/engine/queue.rs

use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::ChangeSignal;

/// Room for bursts without blocking the watcher. A full queue applies
/// back-pressure to producers; nothing is dropped.
pub const CHANGE_QUEUE_CAPACITY: usize = 1024;

pub type ChangeReceiver = mpsc::Receiver<ChangeSignal>;

/// Create the change queue: many producers (event loop, supersession
/// watchers), one consumer (the orchestrator).
pub fn channel(capacity: usize) -> (ChangeSender, ChangeReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (ChangeSender { tx }, rx)
}

/// Cloneable producer side of the change queue.
#[derive(Debug, Clone)]
pub struct ChangeSender {
    tx: mpsc::Sender<ChangeSignal>,
}

impl ChangeSender {
    /// Enqueue a change, waiting for capacity if the queue is full.
    ///
    /// Fails only when the orchestrator has closed the queue.
    pub async fn send(
        &self,
        change: ChangeSignal,
    ) -> Result<(), mpsc::error::SendError<ChangeSignal>> {
        self.tx.send(change).await
    }

    /// Put a change consumed by a supersession watcher back on the queue.
    ///
    /// The caller may be holding the only receiver, so this must not wait
    /// for capacity inline: on a full queue the send is handed to a detached
    /// task which completes once the orchestrator drains.
    pub fn requeue(&self, change: ChangeSignal) {
        match self.tx.try_send(change) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(change)) => {
                warn!(path = ?change.path, "change queue full; re-enqueueing in background");
                let tx = self.tx.clone();
                tokio::spawn(async move {
                    if tx.send(change).await.is_err() {
                        debug!("change queue closed before re-enqueued change was delivered");
                    }
                });
            }
            Err(mpsc::error::TrySendError::Closed(change)) => {
                debug!(path = ?change.path, "change queue closed; dropping re-enqueued change");
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
