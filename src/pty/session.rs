//! Session lifecycle around a [`Pty`]
//!
//! A session moves Uninitialized -> Running -> Closed and never back.
//! Closing is idempotent and never waits for the child to exit; a child
//! still running at that point is handed back so its owner can reap it
//! later with [`reap`](super::reap).

use std::os::fd::{AsFd, BorrowedFd};

use nix::sys::signal::Signal;
use nix::unistd::Pid;

use super::{Pty, PtyError, PtyResult, ReadOutcome, WindowSize};
use crate::config::Config;

/// Lifecycle state of a [`Session`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Running,
    Closed,
}

/// A shell attached to a pseudoterminal
#[derive(Debug)]
pub struct Session {
    shell: String,
    shell_args: Vec<String>,
    term: String,
    state: SessionState,
    pty: Option<Pty>,
    size: WindowSize,
}

impl Session {
    /// A session that has not spawned anything yet
    pub fn new(config: &Config) -> Self {
        Self {
            shell: config.resolve_shell(),
            shell_args: config.shell_args.clone(),
            term: config.term.clone(),
            state: SessionState::Uninitialized,
            pty: None,
            size: WindowSize::default(),
        }
    }

    /// Create and start a session in one step
    pub fn create(rows: usize, cols: usize, config: &Config) -> PtyResult<Self> {
        let mut session = Self::new(config);
        session.start(rows, cols)?;
        Ok(session)
    }

    /// Spawn the shell at the given size
    pub fn start(&mut self, rows: usize, cols: usize) -> PtyResult<()> {
        if self.state != SessionState::Uninitialized {
            return Err(PtyError::AlreadyStarted);
        }
        let size = WindowSize::from_grid(rows, cols);
        let args: Vec<&str> = self.shell_args.iter().map(String::as_str).collect();
        let env = [("TERM", self.term.as_str()), ("COLORTERM", "truecolor")];
        let pty = Pty::spawn(&self.shell, &args, size, &env)?;

        self.pty = Some(pty);
        self.size = size;
        self.state = SessionState::Running;
        Ok(())
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Current window size
    pub fn size(&self) -> WindowSize {
        self.size
    }

    pub fn child_pid(&self) -> Option<Pid> {
        self.pty.as_ref().map(Pty::child_pid)
    }

    fn running(&self) -> PtyResult<&Pty> {
        match (&self.pty, self.state) {
            (Some(pty), SessionState::Running) => Ok(pty),
            _ => Err(PtyError::NotRunning),
        }
    }

    /// Non-blocking read of child output
    pub fn read(&self, buf: &mut [u8]) -> PtyResult<ReadOutcome> {
        self.running()?.read(buf)
    }

    /// Non-blocking write of input bytes; returns how many were accepted
    pub fn write(&self, data: &[u8]) -> PtyResult<usize> {
        self.running()?.write(data)
    }

    /// Wait up to `timeout_ms` for output to become readable
    pub fn poll_read(&self, timeout_ms: i32) -> PtyResult<bool> {
        self.running()?.poll_read(timeout_ms)
    }

    /// Inform the kernel and the child of a new size
    pub fn resize(&mut self, rows: usize, cols: usize) -> PtyResult<()> {
        let size = WindowSize::from_grid(rows, cols);
        self.running()?.resize(size)?;
        self.size = size;
        Ok(())
    }

    /// Reap the child if it exited; see [`Pty::try_wait`]
    pub fn try_wait(&mut self) -> PtyResult<Option<i32>> {
        match (&mut self.pty, self.state) {
            (Some(pty), SessionState::Running) => pty.try_wait(),
            _ => Err(PtyError::NotRunning),
        }
    }

    /// Hang up the child and release the PTY. Safe to call repeatedly.
    ///
    /// Returns the pid of a child that had not exited yet; it stays a
    /// zombie until someone reaps it.
    pub fn close(&mut self) -> Option<Pid> {
        if self.state == SessionState::Closed {
            return None;
        }
        self.state = SessionState::Closed;
        let mut pty = self.pty.take()?;
        if let Err(e) = pty.signal(Signal::SIGHUP) {
            tracing::warn!("Failed to hang up child: {}", e);
        }
        let pid = pty.child_pid();
        tracing::info!(pid = pid.as_raw(), "Session closed");
        match pty.try_wait() {
            Ok(Some(_)) => None,
            Ok(None) | Err(_) => Some(pid),
        }
    }

    /// Descriptor for an external event loop, while running
    pub fn as_fd(&self) -> Option<BorrowedFd<'_>> {
        self.running().ok().map(|pty| pty.as_fd())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(pid) = self.close() {
            tracing::debug!(pid = pid.as_raw(), "Dropped session with child still running");
        }
    }
}
