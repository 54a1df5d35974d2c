//! Handle-based boundary for embedding
//!
//! A [`TerminalTable`] owns terminal instances (state machine plus optional
//! PTY session) and hands out generation-checked [`Handle`]s. Every call
//! returns a status or sentinel instead of panicking, so the table can sit
//! directly behind a foreign-language shim.

use std::os::fd::{AsRawFd, BorrowedFd, RawFd};

use crate::config::Config;
use crate::core::{Cell, Palette};
use nix::unistd::Pid;

use crate::pty::{self, PtyError, PtyResult, ReadOutcome, Session};
use crate::terminal::{Terminal, TerminalEvent};

/// `read_channel`: nothing available yet
pub const READ_WOULD_BLOCK: isize = -1;
/// `read_channel`: the channel failed or there is none
pub const READ_ERROR: isize = -2;
/// `read_channel`: the handle is not live
pub const READ_INVALID: isize = -3;

/// Bytes read per `pump` iteration
const PUMP_CHUNK: usize = 4096;
/// Most bytes one `pump` call will feed before handing control back
pub const PUMP_BUDGET: usize = 64 * 1024;

/// Reference to a terminal in a [`TerminalTable`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle {
    index: u32,
    generation: u32,
}

impl Handle {
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

/// Outcome of calls that do not return data
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok = 0,
    InvalidHandle = -1,
    /// The child hung up, the channel failed, or there never was one
    ChannelClosed = -2,
    /// Only part of the input was accepted before the channel filled up
    WouldBlock = -3,
}

/// Fixed-layout cell with colors resolved to RGB
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CellRecord {
    pub codepoint: u32,
    pub fg_r: u8,
    pub fg_g: u8,
    pub fg_b: u8,
    pub bg_r: u8,
    pub bg_g: u8,
    pub bg_b: u8,
    /// Attribute bits; inverse is reported here, never pre-applied
    pub flags: u8,
}

impl CellRecord {
    pub fn from_cell(cell: &Cell, palette: &Palette) -> Self {
        let fg = palette.resolve(cell.fg, true);
        let bg = palette.resolve(cell.bg, false);
        Self {
            codepoint: cell.c as u32,
            fg_r: fg.r,
            fg_g: fg.g,
            fg_b: fg.b,
            bg_r: bg.r,
            bg_g: bg.g,
            bg_b: bg.b,
            flags: cell.flags.bits(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Channel {
    Open,
    Eof,
    Failed,
}

#[derive(Debug)]
struct Instance {
    terminal: Terminal,
    session: Option<Session>,
    channel: Channel,
}

impl Instance {
    fn session(&self) -> Option<&Session> {
        match self.channel {
            Channel::Open => self.session.as_ref(),
            Channel::Eof | Channel::Failed => None,
        }
    }

    /// Write queued device reports back to the child
    fn flush_responses(&mut self) {
        let responses = self.terminal.take_responses();
        if responses.is_empty() {
            return;
        }
        if let Some(session) = self.session() {
            if let Err(e) = write_all(session, &responses) {
                tracing::warn!("Failed to send terminal response: {}", e);
            }
        }
    }

    fn read(&mut self, buf: &mut [u8]) -> isize {
        match self.channel {
            Channel::Eof => return 0,
            Channel::Failed => return READ_ERROR,
            Channel::Open => {},
        }
        let Some(session) = self.session.as_ref() else {
            self.channel = Channel::Failed;
            return READ_ERROR;
        };
        match session.read(buf) {
            Ok(ReadOutcome::Data(n)) => n as isize,
            Ok(ReadOutcome::WouldBlock) => READ_WOULD_BLOCK,
            Ok(ReadOutcome::Eof) => {
                tracing::info!("Child closed the terminal channel");
                self.channel = Channel::Eof;
                0
            },
            Err(e) => {
                tracing::warn!("Terminal channel read failed: {}", e);
                self.channel = Channel::Failed;
                READ_ERROR
            },
        }
    }
}

/// Write everything or stop when the channel fills up
fn write_all(session: &Session, mut data: &[u8]) -> PtyResult<bool> {
    while !data.is_empty() {
        let n = session.write(data)?;
        if n == 0 {
            return Ok(false);
        }
        data = &data[n..];
    }
    Ok(true)
}

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    instance: Option<Instance>,
}

/// Arena of terminal instances addressed by [`Handle`]
#[derive(Debug, Default)]
pub struct TerminalTable {
    slots: Vec<Slot>,
    free: Vec<u32>,
    config: Config,
    /// Children of destroyed terminals that had not exited yet
    unreaped: Vec<Pid>,
}

impl TerminalTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Number of live terminals
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.instance.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Children of destroyed terminals still waiting to be collected
    pub fn unreaped_children(&self) -> usize {
        self.unreaped.len()
    }

    /// Collect exited children of destroyed terminals, without blocking.
    /// Also runs on every `create`, `destroy` and `pump`.
    pub fn reap_children(&mut self) {
        self.unreaped.retain(|&pid| !pty::reap(pid));
    }

    fn insert(&mut self, instance: Instance) -> Handle {
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.slots.push(Slot::default());
                (self.slots.len() - 1) as u32
            },
        };
        let slot = &mut self.slots[index as usize];
        slot.instance = Some(instance);
        Handle {
            index,
            generation: slot.generation,
        }
    }

    fn get(&self, handle: Handle) -> Option<&Instance> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.instance.as_ref())
    }

    fn get_mut(&mut self, handle: Handle) -> Option<&mut Instance> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.instance.as_mut())
    }

    /// Create a terminal with a shell attached. Nothing is registered if
    /// the PTY or the child cannot be created.
    pub fn create(&mut self, rows: usize, cols: usize) -> Result<Handle, PtyError> {
        self.reap_children();
        let terminal = Terminal::with_config(rows, cols, &self.config);
        let session = Session::create(terminal.rows(), terminal.cols(), &self.config)?;
        let handle = self.insert(Instance {
            terminal,
            session: Some(session),
            channel: Channel::Open,
        });
        tracing::info!(index = handle.index, rows, cols, "Created terminal");
        Ok(handle)
    }

    /// Create a terminal without a child; channel calls report it closed
    pub fn create_detached(&mut self, rows: usize, cols: usize) -> Handle {
        let terminal = Terminal::with_config(rows, cols, &self.config);
        self.insert(Instance {
            terminal,
            session: None,
            channel: Channel::Open,
        })
    }

    /// Destroy a terminal, closing its session. Returns false for a stale
    /// or unknown handle.
    pub fn destroy(&mut self, handle: Handle) -> bool {
        let Some(slot) = self
            .slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
        else {
            return false;
        };
        let Some(mut instance) = slot.instance.take() else {
            return false;
        };
        slot.generation = slot.generation.wrapping_add(1);
        if let Some(pid) = instance.session.as_mut().and_then(Session::close) {
            self.unreaped.push(pid);
        }
        self.free.push(handle.index);
        self.reap_children();
        tracing::info!(index = handle.index, "Destroyed terminal");
        true
    }

    /// Parse output bytes into the terminal
    pub fn feed(&mut self, handle: Handle, bytes: &[u8]) -> Status {
        let Some(instance) = self.get_mut(handle) else {
            return Status::InvalidHandle;
        };
        instance.terminal.feed(bytes);
        instance.flush_responses();
        Status::Ok
    }

    /// Write input bytes (keystrokes, pastes) to the child
    pub fn send_input(&mut self, handle: Handle, bytes: &[u8]) -> Status {
        let Some(instance) = self.get_mut(handle) else {
            return Status::InvalidHandle;
        };
        let Some(session) = instance.session() else {
            return Status::ChannelClosed;
        };
        match write_all(session, bytes) {
            Ok(true) => Status::Ok,
            Ok(false) => Status::WouldBlock,
            Err(e) => {
                tracing::warn!("Terminal channel write failed: {}", e);
                instance.channel = Channel::Failed;
                Status::ChannelClosed
            },
        }
    }

    /// Read raw child output into `buf` without feeding it.
    ///
    /// Returns the byte count, 0 at end of stream, or one of
    /// [`READ_WOULD_BLOCK`], [`READ_ERROR`], [`READ_INVALID`].
    pub fn read_channel(&mut self, handle: Handle, buf: &mut [u8]) -> isize {
        match self.get_mut(handle) {
            Some(instance) => instance.read(buf),
            None => READ_INVALID,
        }
    }

    /// Read what is available, up to [`PUMP_BUDGET`] bytes, and feed it.
    ///
    /// Returns the number of bytes processed, or the `read_channel` code
    /// that stopped it when nothing was processed. A call that hits the
    /// budget leaves the rest for the next one, so a child that never
    /// stops writing cannot hold the caller.
    pub fn pump(&mut self, handle: Handle) -> isize {
        if !self.unreaped.is_empty() {
            self.reap_children();
        }
        let Some(instance) = self.get_mut(handle) else {
            return READ_INVALID;
        };
        let mut buf = [0u8; PUMP_CHUNK];
        let mut total = 0usize;
        while total < PUMP_BUDGET {
            let want = PUMP_CHUNK.min(PUMP_BUDGET - total);
            let n = instance.read(&mut buf[..want]);
            if n <= 0 {
                return if total > 0 { total as isize } else { n };
            }
            instance.terminal.feed(&buf[..n as usize]);
            instance.flush_responses();
            total += n as usize;
        }
        total as isize
    }

    /// Descriptor to wait on for readability, while the channel is open
    pub fn poll_handle(&self, handle: Handle) -> Option<BorrowedFd<'_>> {
        self.get(handle)?.session()?.as_fd()
    }

    /// Raw form of [`poll_handle`](Self::poll_handle); -1 when there is none
    pub fn poll_fd(&self, handle: Handle) -> RawFd {
        self.poll_handle(handle).map_or(-1, |fd| fd.as_raw_fd())
    }

    /// One cell; a blank record when the handle or position is invalid
    pub fn get_cell(&self, handle: Handle, row: usize, col: usize) -> CellRecord {
        let palette = self.palette(handle);
        let cell = self
            .get(handle)
            .and_then(|i| i.terminal.get_cell(row, col))
            .unwrap_or(&Cell::BLANK);
        CellRecord::from_cell(cell, palette)
    }

    /// Fill `buf` with a row; returns how many records were written
    pub fn get_row(&self, handle: Handle, row: usize, buf: &mut [CellRecord]) -> usize {
        let Some(instance) = self.get(handle) else {
            return 0;
        };
        let Some(cells) = instance.terminal.get_row(row) else {
            return 0;
        };
        let palette = instance.terminal.palette();
        let n = cells.len().min(buf.len());
        for (record, cell) in buf[..n].iter_mut().zip(cells) {
            *record = CellRecord::from_cell(cell, palette);
        }
        n
    }

    /// Cursor as (row, col)
    pub fn get_cursor(&self, handle: Handle) -> Option<(usize, usize)> {
        let cursor = self.get(handle)?.terminal.cursor();
        Some((cursor.row, cursor.col))
    }

    /// Resize the grid and the PTY together
    pub fn resize(&mut self, handle: Handle, rows: usize, cols: usize) -> Status {
        let Some(instance) = self.get_mut(handle) else {
            return Status::InvalidHandle;
        };
        instance.terminal.resize(rows, cols);
        let (rows, cols) = (instance.terminal.rows(), instance.terminal.cols());
        if instance.channel == Channel::Open {
            if let Some(session) = instance.session.as_mut() {
                if let Err(e) = session.resize(rows, cols) {
                    tracing::warn!("Failed to resize PTY: {}", e);
                }
            }
        }
        Status::Ok
    }

    /// Copy dirty row indices into `buf`; returns the count written
    pub fn get_dirty_rows(&self, handle: Handle, buf: &mut [u16]) -> usize {
        self.get(handle)
            .map_or(0, |instance| instance.terminal.dirty_rows_into(buf))
    }

    pub fn mark_clean(&mut self, handle: Handle) -> Status {
        match self.get_mut(handle) {
            Some(instance) => {
                instance.terminal.mark_clean();
                Status::Ok
            },
            None => Status::InvalidHandle,
        }
    }

    /// Drain title, working-directory and bell events
    pub fn take_events(&mut self, handle: Handle) -> Vec<TerminalEvent> {
        self.get_mut(handle)
            .map(|instance| instance.terminal.take_events())
            .unwrap_or_default()
    }

    pub fn terminal(&self, handle: Handle) -> Option<&Terminal> {
        self.get(handle).map(|instance| &instance.terminal)
    }

    /// Whether the channel has hit EOF or an error
    pub fn is_channel_closed(&self, handle: Handle) -> bool {
        self.get(handle)
            .map_or(true, |instance| instance.session().is_none())
    }

    fn palette(&self, handle: Handle) -> &Palette {
        self.get(handle)
            .map_or(&self.config.palette, |instance| instance.terminal.palette())
    }
}
