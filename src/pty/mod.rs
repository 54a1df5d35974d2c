//! PTY (Pseudoterminal) handling
//!
//! Creates the pseudoterminal pair, spawns the child shell on the secondary
//! side and exposes the primary side as a non-blocking byte channel.
//! [`Session`] wraps a [`Pty`] with an explicit lifecycle.

#[cfg(unix)]
mod session;
#[cfg(unix)]
mod unix;

#[cfg(unix)]
pub use session::{Session, SessionState};
#[cfg(unix)]
pub use unix::{reap, Pty};

/// A failed pseudoterminal or child-process syscall
#[derive(Debug, thiserror::Error)]
pub enum PtyError {
    #[error("posix_openpt failed: {0}")]
    OpenMaster(#[source] nix::Error),

    #[error("grantpt failed: {0}")]
    GrantPty(#[source] nix::Error),

    #[error("unlockpt failed: {0}")]
    UnlockPty(#[source] nix::Error),

    #[error("ptsname failed: {0}")]
    PtsName(#[source] nix::Error),

    #[error("fork failed: {0}")]
    Fork(#[source] nix::Error),

    #[error("Argument contains a NUL byte: {0:?}")]
    InvalidArgument(String),

    #[error("TIOCSWINSZ failed: {0}")]
    SetWinsize(#[source] nix::Error),

    #[error("read from primary side failed: {0}")]
    Read(#[source] nix::Error),

    #[error("write to primary side failed: {0}")]
    Write(#[source] nix::Error),

    #[error("setting O_NONBLOCK failed: {0}")]
    SetNonBlocking(#[source] nix::Error),

    #[error("poll failed: {0}")]
    Poll(#[source] nix::Error),

    #[error("waitpid failed: {0}")]
    Wait(#[source] nix::Error),

    #[error("signalling the child failed: {0}")]
    Signal(#[source] nix::Error),

    #[error("Session is not running")]
    NotRunning,

    #[error("Session was already started")]
    AlreadyStarted,
}

pub type PtyResult<T> = Result<T, PtyError>;

/// Terminal dimensions as reported to the child through TIOCSWINSZ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSize {
    pub rows: u16,
    pub cols: u16,
    pub pixel_width: u16,
    pub pixel_height: u16,
}

impl WindowSize {
    /// Character dimensions with no pixel size
    pub fn new(cols: u16, rows: u16) -> Self {
        Self {
            rows,
            cols,
            pixel_width: 0,
            pixel_height: 0,
        }
    }

    /// From grid dimensions, saturating at `u16::MAX`
    pub fn from_grid(rows: usize, cols: usize) -> Self {
        let clamp = |v: usize| u16::try_from(v).unwrap_or(u16::MAX);
        Self::new(clamp(cols), clamp(rows))
    }
}

impl Default for WindowSize {
    fn default() -> Self {
        Self::new(80, 24)
    }
}

/// Result of a non-blocking read from the primary side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// This many bytes were read into the buffer
    Data(usize),
    /// Nothing available yet
    WouldBlock,
    /// The child side hung up
    Eof,
}
