// src/engine/orchestrator.rs

use std::fmt;
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::exec::{CommandBackend, ProcessHandle};
use crate::logging;

use super::queue::{ChangeReceiver, ChangeSender};
use super::supersede::{join_supersession_watcher, spawn_supersession_watcher};
use super::terminate::{TERMINATION_GRACE, terminate_process};
use super::{ChangeSignal, CycleState};

/// The prep / run command pair driven by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleCommands {
    /// Executed to completion at the start of every cycle, if set.
    pub prep: Option<String>,
    /// Long-running command restarted after every successful prep.
    pub run: String,
}

#[derive(Debug, Clone, Copy)]
pub struct OrchestratorOptions {
    /// Time between the graceful terminate and the force kill of the run
    /// command.
    pub grace_period: Duration,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            grace_period: TERMINATION_GRACE,
        }
    }
}

/// Central state machine: on every logical change, re-run prep and restart
/// the run command, staying responsive to changes that arrive mid-cycle.
///
/// The orchestrator is the only owner of the run command's process handle.
/// Supersession watchers only ever cancel tokens and re-enqueue changes.
pub struct Orchestrator<B: CommandBackend> {
    backend: B,
    commands: CycleCommands,
    queue: ChangeSender,
    shutdown: CancellationToken,
    options: OrchestratorOptions,
    running: Option<Box<dyn ProcessHandle>>,
    state: watch::Sender<CycleState>,
    cycles: u64,
}

impl<B: CommandBackend> fmt::Debug for Orchestrator<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("commands", &self.commands)
            .field("state", &*self.state.borrow())
            .field("cycles", &self.cycles)
            .finish_non_exhaustive()
    }
}

impl<B: CommandBackend> Orchestrator<B> {
    /// `queue` must be the sending side of the channel whose receiver is
    /// later passed to [`Orchestrator::run`]; it is used to re-enqueue
    /// superseding changes.
    pub fn new(
        backend: B,
        commands: CycleCommands,
        queue: ChangeSender,
        shutdown: CancellationToken,
        options: OrchestratorOptions,
    ) -> Self {
        let (state, _) = watch::channel(CycleState::Idle);
        Self {
            backend,
            commands,
            queue,
            shutdown,
            options,
            running: None,
            state,
            cycles: 0,
        }
    }

    /// Observe state transitions (used by tests and diagnostics).
    pub fn subscribe_state(&self) -> watch::Receiver<CycleState> {
        self.state.subscribe()
    }

    /// Main loop.
    ///
    /// - Starts the run command immediately.
    /// - Runs one cycle per (coalesced) change from `changes`.
    /// - On shutdown, closes the queue and terminates the run command.
    pub async fn run(mut self, changes: ChangeReceiver) -> Result<()> {
        info!("watchrun orchestrator started");

        self.restart_run_command().await;

        let mut receiver = Some(changes);
        while let Some(mut changes) = receiver.take() {
            let next = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => {
                    info!("shutdown requested; stopping orchestrator");
                    None
                }
                next = changes.recv() => {
                    if next.is_none() {
                        info!("change queue closed; stopping orchestrator");
                    }
                    next
                }
            };

            let Some(first) = next else {
                receiver = Some(changes);
                break;
            };
            let change = coalesce_pending(&mut changes, first);
            receiver = self.run_cycle(change, changes).await;
        }

        // A failed supersession watcher took the receiver down with it, so
        // the queue is already closed in that case.
        if let Some(mut changes) = receiver {
            changes.close();
        }
        self.stop_run_command().await;
        self.set_state(CycleState::Idle);

        info!(cycles = self.cycles, "orchestrator exiting");
        Ok(())
    }

    /// One prep-then-run attempt.
    ///
    /// Returns the queue receiver once the cycle's supersession watcher has
    /// seen the next change (or shutdown), or `None` if the watcher failed.
    async fn run_cycle(
        &mut self,
        change: ChangeSignal,
        changes: ChangeReceiver,
    ) -> Option<ChangeReceiver> {
        self.cycles += 1;
        let cycle_id = self.cycles;

        logging::status("Update", change.path.display());
        info!(cycle = cycle_id, path = ?change.path, "change detected; starting cycle");

        let cycle = self.shutdown.child_token();
        let watcher = spawn_supersession_watcher(changes, self.queue.clone(), cycle.clone());

        if self.prepare(cycle_id, &cycle).await {
            if cycle.is_cancelled() {
                info!(cycle = cycle_id, "cycle superseded after prep; not starting run command");
            } else {
                self.restart_run_command().await;
            }
        }
        self.set_state(self.steady_state());

        let changes = join_supersession_watcher(watcher).await;
        debug!(cycle = cycle_id, "cycle finished");
        changes
    }

    /// Run the prep command under the cycle token.
    ///
    /// Returns `true` when the cycle may go on to (re)start the run command.
    async fn prepare(&mut self, cycle_id: u64, cycle: &CancellationToken) -> bool {
        let Some(prep) = self.commands.prep.as_deref() else {
            return true;
        };

        self.state.send_replace(CycleState::RunningPrep);

        match self.backend.run_to_completion(prep, cycle.clone()).await {
            Ok(()) => true,
            Err(err) if cycle.is_cancelled() => {
                info!(cycle = cycle_id, error = %err, "prep superseded by a newer change");
                false
            }
            Err(err) => {
                warn!(
                    cycle = cycle_id,
                    error = %err,
                    "prep failed; waiting for the next change"
                );
                false
            }
        }
    }

    /// Terminate the previous run command (if any), then start a new one.
    ///
    /// The old instance is stopped right before the new one starts, so two
    /// instances never overlap.
    async fn restart_run_command(&mut self) {
        self.stop_run_command().await;

        match self.backend.start_detached(&self.commands.run).await {
            Ok(handle) => {
                info!(pid = ?handle.id(), cmd = %self.commands.run, "run command started");
                self.running = Some(handle);
                self.set_state(CycleState::RunningMain);
            }
            Err(err) => {
                warn!(error = %err, "run command failed to start; waiting for the next change");
                self.set_state(CycleState::Idle);
            }
        }
    }

    async fn stop_run_command(&mut self) {
        if let Some(mut handle) = self.running.take() {
            terminate_process(handle.as_mut(), self.options.grace_period).await;
        }
    }

    fn steady_state(&self) -> CycleState {
        if self.running.is_some() {
            CycleState::RunningMain
        } else {
            CycleState::Idle
        }
    }

    fn set_state(&self, state: CycleState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            debug!(?previous, ?state, "cycle state changed");
        }
    }
}

/// Fold everything already waiting in the queue into a single cycle for the
/// most recent path.
fn coalesce_pending(changes: &mut ChangeReceiver, first: ChangeSignal) -> ChangeSignal {
    let mut latest = first;
    let mut merged = 0usize;
    while let Ok(next) = changes.try_recv() {
        latest = next;
        merged += 1;
    }
    if merged > 0 {
        debug!(merged, path = ?latest.path, "coalesced queued changes into one cycle");
    }
    latest
}
