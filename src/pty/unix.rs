//! POSIX pseudoterminal backend
//!
//! Allocates the primary/secondary pair, forks the child onto the
//! secondary side and owns the primary descriptor afterwards.

use std::ffi::{CStr, CString, OsStr};
use std::os::fd::{AsFd, BorrowedFd};
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::PermissionsExt;
use std::os::unix::io::{AsRawFd, RawFd};
use std::path::{Path, PathBuf};

use nix::errno::Errno;
use nix::fcntl::{fcntl, open, FcntlArg, OFlag};
use nix::libc::{self, STDERR_FILENO, STDIN_FILENO, STDOUT_FILENO};
use nix::poll::{poll, PollFd, PollFlags};
use nix::pty::{grantpt, posix_openpt, ptsname, unlockpt, PtyMaster};
use nix::sys::signal::{kill, killpg, Signal};
use nix::sys::stat::Mode;
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::{close, dup2, execve, fork, read, setsid, write, ForkResult, Pid};

use super::{PtyError, PtyResult, ReadOutcome, WindowSize};

/// Primary side of a pseudoterminal plus the child attached to it
pub struct Pty {
    /// Primary descriptor
    master: PtyMaster,
    /// The child process ID
    child_pid: Pid,
    /// Set once waitpid has reported the child gone
    exit_code: Option<i32>,
}

impl std::fmt::Debug for Pty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pty")
            .field("master", &self.master.as_raw_fd())
            .field("child_pid", &self.child_pid)
            .field("exit_code", &self.exit_code)
            .finish()
    }
}

fn to_cstring(s: &str) -> PtyResult<CString> {
    CString::new(s).map_err(|_| PtyError::InvalidArgument(s.to_string()))
}

/// Locate `program` the way execvp would, using `path` (the PATH value).
/// Names containing a slash are used as given; an unresolved name is
/// returned unchanged so exec fails in the child with 127.
fn resolve_program(program: &str, path: Option<&OsStr>) -> PathBuf {
    if program.contains('/') {
        return PathBuf::from(program);
    }
    path.into_iter()
        .flat_map(|dirs| std::env::split_paths(dirs))
        .map(|dir| dir.join(program))
        .find(|candidate| is_executable(candidate))
        .unwrap_or_else(|| PathBuf::from(program))
}

fn is_executable(path: &Path) -> bool {
    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

/// `KEY=VALUE` strings for the child: the inherited environment with
/// `overrides` replacing or adding entries. Inherited entries that cannot
/// be represented as C strings are skipped.
fn build_envp(overrides: &[(&str, &str)]) -> PtyResult<Vec<CString>> {
    let mut envp = Vec::new();
    for (key, value) in std::env::vars_os() {
        if overrides.iter().any(|(k, _)| OsStr::new(k) == key) {
            continue;
        }
        let mut entry = key.as_bytes().to_vec();
        entry.push(b'=');
        entry.extend_from_slice(value.as_bytes());
        if let Ok(entry) = CString::new(entry) {
            envp.push(entry);
        }
    }
    for (key, value) in overrides {
        if key.is_empty() || key.contains('=') {
            return Err(PtyError::InvalidArgument((*key).to_string()));
        }
        envp.push(to_cstring(&format!("{}={}", key, value))?);
    }
    Ok(envp)
}

impl Pty {
    /// Spawn `program` on a new PTY with the given window size.
    ///
    /// `env` entries are exported in the child on top of the inherited
    /// environment. Fails without leaving a child behind if the PTY pair
    /// or the fork cannot be created; a program that cannot be executed
    /// shows up as the child exiting with status 127.
    pub fn spawn(
        program: &str,
        args: &[&str],
        size: WindowSize,
        env: &[(&str, &str)],
    ) -> PtyResult<Self> {
        // Everything the child needs is allocated before fork
        let mut argv = Vec::with_capacity(args.len() + 1);
        argv.push(to_cstring(program)?);
        for arg in args {
            argv.push(to_cstring(arg)?);
        }
        let path = resolve_program(program, std::env::var_os("PATH").as_deref());
        let path = CString::new(path.as_os_str().as_bytes())
            .map_err(|_| PtyError::InvalidArgument(program.to_string()))?;
        let envp = build_envp(env)?;

        let master = posix_openpt(OFlag::O_RDWR | OFlag::O_NOCTTY).map_err(PtyError::OpenMaster)?;
        grantpt(&master).map_err(PtyError::GrantPty)?;
        unlockpt(&master).map_err(PtyError::UnlockPty)?;

        // SAFETY: ptsname is not thread-safe; the returned name is copied
        // before anything else can call it on this thread
        let secondary_name = unsafe { ptsname(&master) }.map_err(PtyError::PtsName)?;
        let secondary = to_cstring(&secondary_name)?;

        set_window_size(master.as_raw_fd(), size)?;

        // SAFETY: the child only calls exec_child, which never returns
        match unsafe { fork() }.map_err(PtyError::Fork)? {
            ForkResult::Child => {
                drop(master);
                exec_child(&secondary, &path, &argv, &envp)
            },
            ForkResult::Parent { child } => {
                let flags =
                    fcntl(master.as_raw_fd(), FcntlArg::F_GETFL).map_err(PtyError::SetNonBlocking)?;
                let flags = OFlag::from_bits_truncate(flags);
                fcntl(
                    master.as_raw_fd(),
                    FcntlArg::F_SETFL(flags | OFlag::O_NONBLOCK),
                )
                .map_err(PtyError::SetNonBlocking)?;

                tracing::info!(pid = child.as_raw(), program, "Spawned child on PTY");
                Ok(Pty {
                    master,
                    child_pid: child,
                    exit_code: None,
                })
            },
        }
    }

    /// Descriptor to register with poll/epoll
    pub fn master_fd(&self) -> RawFd {
        self.master.as_raw_fd()
    }

    /// Pid of the forked child
    pub fn child_pid(&self) -> Pid {
        self.child_pid
    }

    /// Reap the child if it has exited, without blocking.
    ///
    /// Returns the exit code (128 + signal for a killed child) once the
    /// child is gone, `None` while it is still running. The code is kept,
    /// so later calls report the same value.
    pub fn try_wait(&mut self) -> PtyResult<Option<i32>> {
        if self.exit_code.is_some() {
            return Ok(self.exit_code);
        }

        let code = match waitpid(self.child_pid, Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::Exited(_, code)) => code,
            Ok(WaitStatus::Signaled(_, signal, _)) => 128 + signal as i32,
            Ok(_) => return Ok(None),
            // Reaped elsewhere; the status is gone
            Err(Errno::ECHILD) => 0,
            Err(e) => return Err(PtyError::Wait(e)),
        };
        self.exit_code = Some(code);
        Ok(Some(code))
    }

    /// Non-blocking liveness check; reaps the child if it has exited
    pub fn is_alive(&mut self) -> bool {
        matches!(self.try_wait(), Ok(None))
    }

    /// Read from the PTY master without blocking
    pub fn read(&self, buf: &mut [u8]) -> PtyResult<ReadOutcome> {
        match read(self.master.as_raw_fd(), buf) {
            Ok(0) => Ok(ReadOutcome::Eof),
            Ok(n) => Ok(ReadOutcome::Data(n)),
            // EAGAIN == EWOULDBLOCK here
            Err(Errno::EAGAIN) | Err(Errno::EINTR) => Ok(ReadOutcome::WouldBlock),
            // Linux reports a closed secondary side as EIO
            Err(Errno::EIO) => Ok(ReadOutcome::Eof),
            Err(e) => Err(PtyError::Read(e)),
        }
    }

    /// Queue bytes for the child; may write fewer than `data.len()`
    ///
    /// Returns the number of bytes written; 0 when the buffer is full.
    pub fn write(&self, data: &[u8]) -> PtyResult<usize> {
        match write(self.master.as_raw_fd(), data) {
            Ok(n) => Ok(n),
            Err(Errno::EAGAIN) | Err(Errno::EINTR) => Ok(0),
            Err(e) => Err(PtyError::Write(e)),
        }
    }

    /// Wait up to `timeout_ms` for readable data
    ///
    /// Returns true if data is available (or the child hung up), false if
    /// the timeout expired.
    pub fn poll_read(&self, timeout_ms: i32) -> PtyResult<bool> {
        let fd = self.as_fd();
        let mut fds = [PollFd::new(&fd, PollFlags::POLLIN)];
        let n = poll(&mut fds, timeout_ms).map_err(PtyError::Poll)?;
        Ok(n > 0
            && fds[0]
                .revents()
                .is_some_and(|r| r.intersects(PollFlags::POLLIN | PollFlags::POLLHUP)))
    }

    /// Resize the PTY and tell the child's process group
    pub fn resize(&self, size: WindowSize) -> PtyResult<()> {
        set_window_size(self.master.as_raw_fd(), size)?;
        match killpg(self.child_pid, Signal::SIGWINCH) {
            Ok(()) | Err(Errno::ESRCH) => Ok(()),
            Err(e) => Err(PtyError::Signal(e)),
        }
    }

    /// Deliver `signal` to the child
    pub fn signal(&self, signal: Signal) -> PtyResult<()> {
        match kill(self.child_pid, signal) {
            Ok(()) | Err(Errno::ESRCH) => Ok(()),
            Err(e) => Err(PtyError::Signal(e)),
        }
    }
}

impl AsFd for Pty {
    fn as_fd(&self) -> BorrowedFd<'_> {
        // SAFETY: the master fd is open for the lifetime of this Pty
        unsafe { BorrowedFd::borrow_raw(self.master.as_raw_fd()) }
    }
}

impl AsRawFd for Pty {
    fn as_raw_fd(&self) -> RawFd {
        self.master.as_raw_fd()
    }
}

impl Drop for Pty {
    fn drop(&mut self) {
        if self.exit_code.is_none() {
            let _ = waitpid(self.child_pid, Some(WaitPidFlag::WNOHANG));
        }
    }
}

/// Collect `pid` if it has exited, without blocking. True once the
/// process is gone (reaped here or already reaped elsewhere).
pub fn reap(pid: Pid) -> bool {
    match waitpid(pid, Some(WaitPidFlag::WNOHANG)) {
        Ok(WaitStatus::Exited(..)) | Ok(WaitStatus::Signaled(..)) => true,
        Ok(_) => false,
        Err(Errno::ECHILD) => true,
        Err(e) => {
            tracing::warn!(pid = pid.as_raw(), "waitpid failed: {}", e);
            false
        },
    }
}

/// Child half of `spawn`: attach to the secondary side and exec.
///
/// Runs between fork and exec, so it only makes syscalls on data prepared
/// by the parent (no allocation) and leaves with `_exit` on any failure.
fn exec_child(secondary: &CStr, path: &CStr, argv: &[CString], envp: &[CString]) -> ! {
    if setsid().is_err() {
        fail();
    }

    let Ok(secondary_fd) = open(secondary, OFlag::O_RDWR, Mode::empty()) else {
        fail();
    };

    // SAFETY: TIOCSCTTY on a freshly opened terminal fd in a new session
    unsafe {
        libc::ioctl(secondary_fd, libc::TIOCSCTTY as _, 0);
    }

    for target in [STDIN_FILENO, STDOUT_FILENO, STDERR_FILENO] {
        if dup2(secondary_fd, target).is_err() {
            fail();
        }
    }
    if secondary_fd > STDERR_FILENO {
        let _ = close(secondary_fd);
    }

    let _ = execve(path, argv, envp);
    fail()
}

fn fail() -> ! {
    // SAFETY: _exit is async-signal-safe and skips the parent's atexit handlers
    unsafe { libc::_exit(127) }
}

/// TIOCSWINSZ on `fd`
fn set_window_size(fd: RawFd, size: WindowSize) -> PtyResult<()> {
    let winsize = libc::winsize {
        ws_row: size.rows,
        ws_col: size.cols,
        ws_xpixel: size.pixel_width,
        ws_ypixel: size.pixel_height,
    };

    // SAFETY: fd is a tty descriptor and winsize outlives the call
    let result = unsafe { libc::ioctl(fd, libc::TIOCSWINSZ, &winsize) };

    if result < 0 {
        Err(PtyError::SetWinsize(Errno::last()))
    } else {
        Ok(())
    }
}

/// TIOCGWINSZ on `fd`
pub fn get_window_size(fd: RawFd) -> PtyResult<WindowSize> {
    let mut winsize = libc::winsize {
        ws_row: 0,
        ws_col: 0,
        ws_xpixel: 0,
        ws_ypixel: 0,
    };

    // SAFETY: fd is a tty descriptor and winsize is writable for the call
    let result = unsafe { libc::ioctl(fd, libc::TIOCGWINSZ, &mut winsize) };

    if result < 0 {
        Err(PtyError::SetWinsize(Errno::last()))
    } else {
        Ok(WindowSize {
            rows: winsize.ws_row,
            cols: winsize.ws_col,
            pixel_width: winsize.ws_xpixel,
            pixel_height: winsize.ws_ypixel,
        })
    }
}
