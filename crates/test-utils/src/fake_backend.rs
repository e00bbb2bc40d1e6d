use std::collections::VecDeque;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{Notify, watch};
use tokio_util::sync::CancellationToken;
use watchrun::errors::CommandError;
use watchrun::exec::{CommandBackend, ProcessHandle};

/// Something the fake backend did, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    PrepStarted(String),
    PrepSucceeded,
    PrepFailed,
    PrepCancelled,
    RunStarted(u32),
    Terminated(u32),
    Killed(u32),
    Reaped(u32),
}

/// Shared, append-only record of [`Step`]s.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    steps: Arc<Mutex<Vec<Step>>>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, step: Step) {
        self.steps.lock().unwrap().push(step);
    }

    pub fn steps(&self) -> Vec<Step> {
        self.steps.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&Step) -> bool) -> usize {
        self.steps.lock().unwrap().iter().filter(|s| pred(s)).count()
    }

    /// Poll until `pred` holds for the recorded steps. Pair with
    /// `with_timeout` so a broken expectation fails instead of hanging.
    pub async fn wait_for(&self, pred: impl Fn(&[Step]) -> bool) -> Vec<Step> {
        loop {
            {
                let steps = self.steps.lock().unwrap();
                if pred(&steps) {
                    return steps.clone();
                }
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

/// What the next prep invocation does.
#[derive(Debug, Clone)]
pub enum PrepScript {
    Succeed,
    Fail,
    /// Block until the `Notify` fires (then succeed) or the token is cancelled.
    Block(Arc<Notify>),
}

/// A fake backend that:
/// - plays back scripted prep outcomes (default: succeed immediately)
/// - hands out [`FakeProcess`]es with increasing pids for the run command
/// - records everything in a [`Journal`].
#[derive(Debug, Clone, Default)]
pub struct FakeBackend {
    journal: Journal,
    preps: Arc<Mutex<VecDeque<PrepScript>>>,
    next_pid: Arc<AtomicU32>,
    ignores_terminate: bool,
}

impl FakeBackend {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            ..Self::default()
        }
    }

    /// Run commands started from now on ignore the graceful terminate and
    /// only die on force kill.
    pub fn ignoring_terminate(mut self) -> Self {
        self.ignores_terminate = true;
        self
    }

    pub fn script_prep(&self, script: PrepScript) {
        self.preps.lock().unwrap().push_back(script);
    }
}

impl CommandBackend for FakeBackend {
    fn run_to_completion(
        &mut self,
        command: &str,
        cancel: CancellationToken,
    ) -> Pin<Box<dyn Future<Output = Result<(), CommandError>> + Send + '_>> {
        let script = self
            .preps
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(PrepScript::Succeed);
        let journal = self.journal.clone();
        let cmd = command.to_string();

        Box::pin(async move {
            journal.record(Step::PrepStarted(cmd.clone()));
            match script {
                PrepScript::Succeed => {
                    journal.record(Step::PrepSucceeded);
                    Ok(())
                }
                PrepScript::Fail => {
                    journal.record(Step::PrepFailed);
                    Err(CommandError::Exit { cmd, code: Some(1) })
                }
                PrepScript::Block(release) => {
                    tokio::select! {
                        _ = release.notified() => {
                            journal.record(Step::PrepSucceeded);
                            Ok(())
                        }
                        _ = cancel.cancelled() => {
                            journal.record(Step::PrepCancelled);
                            Err(CommandError::Cancelled { cmd })
                        }
                    }
                }
            }
        })
    }

    fn start_detached(
        &mut self,
        _command: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Box<dyn ProcessHandle>, CommandError>> + Send + '_>>
    {
        let pid = self.next_pid.fetch_add(1, Ordering::SeqCst) + 1;
        let process = FakeProcess::new(pid, self.journal.clone(), self.ignores_terminate);
        self.journal.record(Step::RunStarted(pid));

        Box::pin(async move { Ok(Box::new(process) as Box<dyn ProcessHandle>) })
    }
}

/// In-memory stand-in for a running command.
#[derive(Debug)]
pub struct FakeProcess {
    pid: u32,
    journal: Journal,
    exited: watch::Sender<bool>,
    ignores_terminate: bool,
    reaped: bool,
}

impl FakeProcess {
    pub fn new(pid: u32, journal: Journal, ignores_terminate: bool) -> Self {
        let (exited, _) = watch::channel(false);
        Self {
            pid,
            journal,
            exited,
            ignores_terminate,
            reaped: false,
        }
    }
}

impl ProcessHandle for FakeProcess {
    fn id(&self) -> Option<u32> {
        (!self.reaped).then_some(self.pid)
    }

    fn terminate(&mut self) -> io::Result<()> {
        self.journal.record(Step::Terminated(self.pid));
        if !self.ignores_terminate {
            self.exited.send_replace(true);
        }
        Ok(())
    }

    fn force_kill(&mut self) -> io::Result<()> {
        self.journal.record(Step::Killed(self.pid));
        self.exited.send_replace(true);
        Ok(())
    }

    fn wait(&mut self) -> Pin<Box<dyn Future<Output = io::Result<Option<i32>>> + Send + '_>> {
        let mut exited = self.exited.subscribe();
        Box::pin(async move {
            exited
                .wait_for(|done| *done)
                .await
                .map(|_| ())
                .map_err(|_| io::Error::other("fake process dropped"))?;
            if !self.reaped {
                self.reaped = true;
                self.journal.record(Step::Reaped(self.pid));
            }
            Ok(Some(0))
        })
    }
}
