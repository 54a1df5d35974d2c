//! Termgrid Terminal Core
//!
//! Turns the byte stream of a child shell into a renderable screen. This
//! crate provides:
//!
//! - `parser`: streaming VT/xterm escape sequence parser
//! - `core`: cells, rows, grid, scrollback, cursor and damage tracking
//! - `terminal`: the state machine applying parsed actions to the grid
//! - `pty`: pseudoterminal creation and the session lifecycle
//! - `handle`: a handle table exposing everything through plain calls
//! - `config`: JSON configuration
//!
//! A terminal is single-owner: feeding, resizing and reading must be
//! serialized by the caller.

pub mod config;
pub mod core;
#[cfg(unix)]
pub mod handle;
pub mod parser;
pub mod pty;
pub mod terminal;

pub use config::{Config, ConfigError};
#[cfg(unix)]
pub use handle::{CellRecord, Handle, Status, TerminalTable};
pub use terminal::{Terminal, TerminalEvent};
