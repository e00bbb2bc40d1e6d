// src/exec/process.rs

//! Capability interface over a spawned command's process tree.
//!
//! The handle only knows how to deliver signals and reap the leader. How and
//! when those are combined (graceful, grace period, force, reap) is decided
//! by `engine::terminate`.

use std::future::Future;
use std::io;
use std::pin::Pin;

use tokio::process::Child;

/// A live (or finished) command started by the runner.
pub trait ProcessHandle: Send {
    /// PID of the process-group leader, if it has not been reaped yet.
    fn id(&self) -> Option<u32>;

    /// Ask the whole process tree to shut down (SIGTERM on unix).
    fn terminate(&mut self) -> io::Result<()>;

    /// Unconditionally kill the leader (SIGKILL on unix).
    fn force_kill(&mut self) -> io::Result<()>;

    /// Wait for the leader to exit and reap it. Returns the exit code, or
    /// `None` when it was ended by a signal.
    ///
    /// Must be cancel-safe: it is raced against the grace period timer.
    fn wait(&mut self) -> Pin<Box<dyn Future<Output = io::Result<Option<i32>>> + Send + '_>>;
}

/// A command started through `sh -c` in its own process group.
#[derive(Debug)]
pub struct ShellProcess {
    cmd: String,
    child: Child,
}

impl ShellProcess {
    pub(crate) fn new(cmd: String, child: Child) -> Self {
        Self { cmd, child }
    }

    pub fn command(&self) -> &str {
        &self.cmd
    }
}

impl ProcessHandle for ShellProcess {
    fn id(&self) -> Option<u32> {
        self.child.id()
    }

    #[cfg(unix)]
    fn terminate(&mut self) -> io::Result<()> {
        use nix::sys::signal::{Signal, kill, killpg};
        use nix::unistd::{Pid, getpgid};

        let Some(raw) = self.child.id() else {
            // Already reaped; nothing left to signal.
            return Ok(());
        };
        let pid = Pid::from_raw(raw as i32);

        // Signal the whole group first so descendants get the request too,
        // then the leader itself in case it left its group.
        let group = getpgid(Some(pid)).and_then(|pgid| killpg(pgid, Signal::SIGTERM));
        let leader = kill(pid, Signal::SIGTERM);

        match (group, leader) {
            (Ok(()), _) | (_, Ok(())) => Ok(()),
            (Err(_), Err(errno)) => Err(io::Error::from(errno)),
        }
    }

    #[cfg(not(unix))]
    fn terminate(&mut self) -> io::Result<()> {
        self.child.start_kill()
    }

    fn force_kill(&mut self) -> io::Result<()> {
        self.child.start_kill()
    }

    fn wait(&mut self) -> Pin<Box<dyn Future<Output = io::Result<Option<i32>>> + Send + '_>> {
        Box::pin(async move {
            let status = self.child.wait().await?;
            Ok(status.code())
        })
    }
}
