//! Terminal state machine
//!
//! Consumes parser actions and applies terminal semantics (cursor motion,
//! rendition, modes, scroll region) to the grid. All mutation goes through
//! [`Terminal::feed`] or [`Terminal::apply`], and every row that changes is
//! left marked dirty for the renderer.

use std::collections::VecDeque;

use unicode_width::UnicodeWidthChar;

use crate::config::Config;
use crate::core::{
    Cell, CellFlags, CellSnapshot, Color, Cursor, Grid, Modes, Palette, Pen, Row, SavedCursor,
    ScrollRegion, Scrollback, Snapshot,
};
use crate::parser::{Action, CharsetSlot, CsiAction, EscAction, OscAction, Params, Parser};

/// Events pending beyond this many are dropped oldest-first
const MAX_PENDING_EVENTS: usize = 256;

/// Metadata surfaced to the caller instead of being stored in the grid
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalEvent {
    /// BEL was received
    Bell,
    /// OSC 0 / OSC 2
    TitleChanged(String),
    /// OSC 7, usually a `file://host/path` URI
    WorkingDirectoryChanged(String),
}

/// Character sets selectable into G0/G1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Charset {
    #[default]
    Ascii,
    /// DEC Special Graphics (line drawing)
    DecSpecial,
}

impl Charset {
    fn map(self, c: char) -> char {
        if self == Charset::Ascii {
            return c;
        }
        match c {
            '_' => ' ',
            '`' => '◆',
            'a' => '▒',
            'b' => '␉',
            'c' => '␌',
            'd' => '␍',
            'e' => '␊',
            'f' => '°',
            'g' => '±',
            'h' => '␤',
            'i' => '␋',
            'j' => '┘',
            'k' => '┐',
            'l' => '┌',
            'm' => '└',
            'n' => '┼',
            'o' => '⎺',
            'p' => '⎻',
            'q' => '─',
            'r' => '⎼',
            's' => '⎽',
            't' => '├',
            'u' => '┤',
            'v' => '┴',
            'w' => '┬',
            'x' => '│',
            'y' => '≤',
            'z' => '≥',
            '{' => 'π',
            '|' => '≠',
            '}' => '£',
            '~' => '·',
            other => other,
        }
    }
}

/// A terminal instance: parser, screens, cursor and modes
#[derive(Debug, Clone)]
pub struct Terminal {
    parser: Parser,
    primary: Grid,
    alternate: Grid,
    cursor: Cursor,
    pen: Pen,
    /// DECSC slots for the primary and alternate screens
    saved: [SavedCursor; 2],
    modes: Modes,
    scroll_region: ScrollRegion,
    tab_stops: Vec<bool>,
    tab_width: usize,
    charsets: [Charset; 2],
    active_charset: usize,
    last_printed: Option<char>,
    title: String,
    working_directory: Option<String>,
    palette: Palette,
    scrollback_lines: usize,
    events: VecDeque<TerminalEvent>,
    responses: Vec<u8>,
}

/// Largest row count; dirty row indices cross the boundary as `u16`
pub const MAX_ROWS: usize = u16::MAX as usize;

impl Terminal {
    /// Create a terminal with default configuration
    pub fn new(rows: usize, cols: usize) -> Self {
        Self::with_config(rows, cols, &Config::default())
    }

    /// Create a terminal; sizes below 1x1 are raised to 1x1 and the row
    /// count is capped at `MAX_ROWS`
    pub fn with_config(rows: usize, cols: usize, config: &Config) -> Self {
        let rows = rows.clamp(1, MAX_ROWS);
        let cols = cols.max(1);
        let tab_width = config.tab_width.max(1);
        Self {
            parser: Parser::new(),
            primary: Grid::new(rows, cols, config.scrollback_lines),
            // The alternate screen never feeds history
            alternate: Grid::new(rows, cols, 0),
            cursor: Cursor::default(),
            pen: Pen::default(),
            saved: [SavedCursor::default(); 2],
            modes: Modes::new(),
            scroll_region: ScrollRegion::full(rows),
            tab_stops: default_tab_stops(cols, tab_width),
            tab_width,
            charsets: [Charset::Ascii; 2],
            active_charset: 0,
            last_printed: None,
            title: String::new(),
            working_directory: None,
            palette: config.palette.clone(),
            scrollback_lines: config.scrollback_lines,
            events: VecDeque::new(),
            responses: Vec::new(),
        }
    }

    /// Feed raw output bytes; chunk boundaries may fall anywhere
    pub fn feed(&mut self, bytes: &[u8]) {
        let mut parser = std::mem::take(&mut self.parser);
        parser.parse(bytes, |action| self.apply(action));
        self.parser = parser;
    }

    /// Apply a single parsed action
    pub fn apply(&mut self, action: Action) {
        match action {
            Action::Print(c) => self.print(c),
            Action::Execute(byte) => self.execute(byte),
            Action::Csi(csi) => self.handle_csi(&csi),
            Action::Esc(esc) => self.handle_esc(esc),
            Action::Osc(osc) => self.handle_osc(osc),
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// The active screen
    pub fn grid(&self) -> &Grid {
        if self.modes.alternate_screen {
            &self.alternate
        } else {
            &self.primary
        }
    }

    fn grid_mut(&mut self) -> &mut Grid {
        if self.modes.alternate_screen {
            &mut self.alternate
        } else {
            &mut self.primary
        }
    }

    pub fn rows(&self) -> usize {
        self.grid().rows()
    }

    pub fn cols(&self) -> usize {
        self.grid().cols()
    }

    pub fn get_cell(&self, row: usize, col: usize) -> Option<&Cell> {
        self.grid().get_cell(row, col)
    }

    pub fn get_row(&self, row: usize) -> Option<&[Cell]> {
        self.grid().get_row(row)
    }

    /// Text of a visible row with trailing blanks trimmed
    pub fn row_text(&self, row: usize) -> String {
        self.grid().row_text(row)
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    /// The current rendition
    pub fn pen(&self) -> Pen {
        self.pen
    }

    pub fn modes(&self) -> &Modes {
        &self.modes
    }

    pub fn scroll_region(&self) -> ScrollRegion {
        self.scroll_region
    }

    /// History of the primary screen
    pub fn scrollback(&self) -> &Scrollback {
        self.primary.scrollback()
    }

    pub fn is_alternate_screen(&self) -> bool {
        self.modes.alternate_screen
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn working_directory(&self) -> Option<&str> {
        self.working_directory.as_deref()
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// Rows of the active screen changed since the last `mark_clean`
    pub fn dirty_rows(&self) -> impl Iterator<Item = usize> + '_ {
        self.grid().dirty_rows()
    }

    pub fn dirty_rows_into(&self, buf: &mut [u16]) -> usize {
        self.grid().dirty_rows_into(buf)
    }

    pub fn mark_clean(&mut self) {
        self.grid_mut().mark_clean();
    }

    /// Drain pending metadata events
    pub fn take_events(&mut self) -> Vec<TerminalEvent> {
        self.events.drain(..).collect()
    }

    /// Drain bytes the terminal wants written back to the child
    /// (device status and attribute reports)
    pub fn take_responses(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.responses)
    }

    /// Deterministic picture of the visible state
    pub fn snapshot(&self) -> Snapshot {
        let grid = self.grid();
        let mut styled = Vec::new();
        for row in 0..grid.rows() {
            for (col, cell) in grid.get_row(row).unwrap_or(&[]).iter().enumerate() {
                if cell.fg != Color::Default || cell.bg != Color::Default || !cell.flags.is_empty()
                {
                    styled.push(CellSnapshot::new(row, col, cell, &self.palette));
                }
            }
        }
        Snapshot {
            rows: grid.rows(),
            cols: grid.cols(),
            lines: (0..grid.rows()).map(|r| grid.row_text(r)).collect(),
            styled,
            cursor: self.cursor,
            scroll_region: self.scroll_region,
            modes: self.modes.clone(),
            title: self.title.clone(),
            scrollback_lines: self.primary.scrollback().len(),
        }
    }

    // ========================================================================
    // Resize and reset
    // ========================================================================

    /// Resize both screens with truncate/pad semantics.
    ///
    /// The cursor is clamped, the scroll region reset to the full screen
    /// and every row marked dirty.
    pub fn resize(&mut self, rows: usize, cols: usize) {
        let rows = rows.clamp(1, MAX_ROWS);
        let cols = cols.max(1);
        if rows == self.rows() && cols == self.cols() {
            self.scroll_region = ScrollRegion::full(rows);
            self.grid_mut().mark_all_dirty();
            return;
        }
        tracing::debug!(rows, cols, "Resizing terminal");

        let (active, inactive) = if self.modes.alternate_screen {
            (&mut self.alternate, &mut self.primary)
        } else {
            (&mut self.primary, &mut self.alternate)
        };
        let shifted = active.resize(rows, cols, self.cursor.row);
        let inactive_slot = usize::from(!self.modes.alternate_screen);
        let inactive_row = self.saved[inactive_slot].row;
        let inactive_shift = inactive.resize(rows, cols, inactive_row);

        self.cursor.row = self.cursor.row.saturating_sub(shifted);
        self.cursor.clamp(rows, cols);
        self.saved[inactive_slot].row = inactive_row.saturating_sub(inactive_shift);
        for saved in &mut self.saved {
            saved.row = saved.row.min(rows - 1);
            saved.col = saved.col.min(cols - 1);
            saved.pending_wrap = false;
        }

        self.scroll_region = ScrollRegion::full(rows);
        let old_cols = self.tab_stops.len();
        self.tab_stops.resize(cols, false);
        for col in old_cols..cols {
            self.tab_stops[col] = col % self.tab_width == 0;
        }
    }

    /// RIS: back to the power-on state, keeping size and configuration
    pub fn reset(&mut self) {
        let rows = self.rows();
        let cols = self.cols();
        self.parser.reset();
        self.primary = Grid::new(rows, cols, self.scrollback_lines);
        self.alternate = Grid::new(rows, cols, 0);
        self.cursor = Cursor::default();
        self.pen = Pen::default();
        self.saved = [SavedCursor::default(); 2];
        self.modes.reset();
        self.scroll_region = ScrollRegion::full(rows);
        self.tab_stops = default_tab_stops(cols, self.tab_width);
        self.charsets = [Charset::Ascii; 2];
        self.active_charset = 0;
        self.last_printed = None;
    }

    // ========================================================================
    // Printing and cursor primitives
    // ========================================================================

    fn print(&mut self, c: char) {
        let c = self.charsets[self.active_charset].map(c);
        let width = match c.width() {
            Some(w) if w > 0 => w,
            // Combining marks and other zero-width characters are not stored
            _ => return,
        };
        let cols = self.cols();
        if width > cols {
            return;
        }

        if self.cursor.pending_wrap && self.modes.auto_wrap {
            self.wrap_line();
        }
        if width == 2 && self.cursor.col + 1 >= cols {
            if self.modes.auto_wrap {
                self.wrap_line();
            } else {
                self.cursor.col = cols - 2;
            }
        }

        let row = self.cursor.row;
        let col = self.cursor.col;
        let pen = self.pen;
        let insert = self.modes.insert_mode;
        let grid = self.grid_mut();
        if let Some(line) = grid.row_mut(row) {
            if insert {
                line.insert_cells(col, width, Color::Default);
            }
            clear_wide_pair(line, col);
            if width == 2 {
                clear_wide_pair(line, col + 1);
                let mut cell = pen.cell(c);
                cell.flags.insert(CellFlags::WIDE);
                line.set(col, cell);
                let mut spacer = pen.cell(' ');
                spacer.flags.insert(CellFlags::WIDE_SPACER);
                line.set(col + 1, spacer);
            } else {
                line.set(col, pen.cell(c));
            }
        }

        let next = col + width;
        if next >= cols {
            self.cursor.col = cols - 1;
            self.cursor.pending_wrap = self.modes.auto_wrap;
        } else {
            self.cursor.col = next;
        }
        self.last_printed = Some(c);
    }

    /// Soft wrap to the start of the next line
    fn wrap_line(&mut self) {
        let row = self.cursor.row;
        if let Some(line) = self.grid_mut().row_mut(row) {
            line.set_wrapped(true);
        }
        self.cursor.col = 0;
        self.cursor.pending_wrap = false;
        self.index();
    }

    /// Move down one row, scrolling the region when at its bottom
    fn index(&mut self) {
        self.cursor.pending_wrap = false;
        if self.cursor.row == self.scroll_region.bottom {
            let region = self.scroll_region;
            self.grid_mut().scroll_up(region, 1);
        } else if self.cursor.row + 1 < self.rows() {
            self.cursor.row += 1;
        }
    }

    /// Move up one row, scrolling the region down when at its top
    fn reverse_index(&mut self) {
        self.cursor.pending_wrap = false;
        if self.cursor.row == self.scroll_region.top {
            let region = self.scroll_region;
            self.grid_mut().scroll_down(region, 1);
        } else if self.cursor.row > 0 {
            self.cursor.row -= 1;
        }
    }

    fn linefeed(&mut self) {
        self.index();
        if self.modes.linefeed_mode {
            self.cursor.col = 0;
        }
    }

    fn tab_forward(&mut self, n: usize) {
        let last = self.cols() - 1;
        let mut col = self.cursor.col;
        for _ in 0..n {
            col = (col + 1..=last)
                .find(|&c| self.tab_stops.get(c).copied().unwrap_or(false))
                .unwrap_or(last);
        }
        self.cursor.col = col;
    }

    fn tab_backward(&mut self, n: usize) {
        let mut col = self.cursor.col;
        for _ in 0..n {
            col = (0..col)
                .rev()
                .find(|&c| self.tab_stops.get(c).copied().unwrap_or(false))
                .unwrap_or(0);
        }
        self.cursor.col = col;
        self.cursor.pending_wrap = false;
    }

    /// Top and bottom rows the cursor may address
    fn origin_bounds(&self) -> (usize, usize) {
        if self.modes.origin_mode {
            (self.scroll_region.top, self.scroll_region.bottom)
        } else {
            (0, self.rows() - 1)
        }
    }

    /// CUP/VPA target row, 1-based, honouring origin mode
    fn goto(&mut self, row: usize, col: usize) {
        let (top, bottom) = self.origin_bounds();
        let row = (top + row.saturating_sub(1)).min(bottom);
        let (rows, cols) = (self.rows(), self.cols());
        self.cursor.move_to(row, col.saturating_sub(1), rows, cols);
    }

    fn save_cursor(&mut self) {
        let slot = usize::from(self.modes.alternate_screen);
        self.saved[slot] = SavedCursor {
            row: self.cursor.row,
            col: self.cursor.col,
            pending_wrap: self.cursor.pending_wrap,
            pen: self.pen,
            origin_mode: self.modes.origin_mode,
            auto_wrap: self.modes.auto_wrap,
        };
    }

    fn restore_cursor(&mut self) {
        let slot = usize::from(self.modes.alternate_screen);
        let saved = self.saved[slot];
        let (rows, cols) = (self.rows(), self.cols());
        self.cursor.move_to(saved.row, saved.col, rows, cols);
        self.cursor.pending_wrap = saved.pending_wrap && saved.auto_wrap;
        self.pen = saved.pen;
        self.modes.origin_mode = saved.origin_mode;
        self.modes.auto_wrap = saved.auto_wrap;
    }

    fn enter_alternate_screen(&mut self, clear: bool) {
        if self.modes.alternate_screen {
            return;
        }
        self.modes.alternate_screen = true;
        let rows = self.rows();
        if clear {
            self.alternate.erase_rows(0..rows, Color::Default);
        }
        self.alternate.mark_all_dirty();
    }

    fn exit_alternate_screen(&mut self) {
        if !self.modes.alternate_screen {
            return;
        }
        self.modes.alternate_screen = false;
        self.primary.mark_all_dirty();
    }

    fn push_event(&mut self, event: TerminalEvent) {
        if self.events.len() >= MAX_PENDING_EVENTS {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    // ========================================================================
    // C0 controls
    // ========================================================================

    fn execute(&mut self, byte: u8) {
        match byte {
            0x07 => self.push_event(TerminalEvent::Bell),
            0x08 => {
                self.cursor.move_left(1);
            },
            0x09 => self.tab_forward(1),
            0x0A..=0x0C => self.linefeed(),
            0x0D => {
                self.cursor.col = 0;
                self.cursor.pending_wrap = false;
            },
            // SO / SI
            0x0E => self.active_charset = 1,
            0x0F => self.active_charset = 0,
            _ => {},
        }
    }

    // ========================================================================
    // ESC sequences
    // ========================================================================

    fn handle_esc(&mut self, esc: EscAction) {
        match esc {
            EscAction::SaveCursor => self.save_cursor(),
            EscAction::RestoreCursor => self.restore_cursor(),
            EscAction::Index => self.index(),
            EscAction::ReverseIndex => self.reverse_index(),
            EscAction::NextLine => {
                self.index();
                self.cursor.col = 0;
            },
            EscAction::HorizontalTabSet => {
                let col = self.cursor.col;
                if let Some(stop) = self.tab_stops.get_mut(col) {
                    *stop = true;
                }
            },
            EscAction::FullReset => self.reset(),
            EscAction::ApplicationKeypad => self.modes.application_keypad = true,
            EscAction::NormalKeypad => self.modes.application_keypad = false,
            EscAction::DesignateCharset { slot, charset } => {
                let set = match charset {
                    b'0' => Charset::DecSpecial,
                    _ => Charset::Ascii,
                };
                match slot {
                    CharsetSlot::G0 => self.charsets[0] = set,
                    CharsetSlot::G1 => self.charsets[1] = set,
                    CharsetSlot::G2 | CharsetSlot::G3 => {
                        tracing::debug!("Ignoring designation into {:?}", slot);
                    },
                }
            },
            EscAction::DecAlignmentTest => {
                let rows = self.rows();
                let cols = self.cols();
                self.scroll_region = ScrollRegion::full(rows);
                let grid = self.grid_mut();
                for row in 0..rows {
                    if let Some(line) = grid.row_mut(row) {
                        line.fill(Cell::new('E'));
                    }
                }
                self.cursor.move_to(0, 0, rows, cols);
            },
            EscAction::Unknown {
                intermediates,
                final_byte,
            } => {
                tracing::debug!(
                    "Unknown ESC sequence: {:?} {:?}",
                    intermediates,
                    final_byte as char
                );
            },
        }
    }

    // ========================================================================
    // CSI sequences
    // ========================================================================

    fn handle_csi(&mut self, csi: &CsiAction) {
        match csi.marker {
            Some(b'?') => return self.handle_csi_private(csi),
            Some(b'>') if csi.final_byte == b'c' => {
                // Secondary device attributes
                self.responses.extend_from_slice(b"\x1b[>0;10;1c");
                return;
            },
            Some(_) => {
                tracing::debug!("Unhandled CSI with marker: {:?}", csi);
                return;
            },
            None => {},
        }

        if !csi.intermediates.is_empty() {
            if csi.intermediates.as_slice() == b"!" && csi.final_byte == b'p' {
                self.soft_reset();
            } else {
                tracing::debug!("Unhandled CSI with intermediates: {:?}", csi);
            }
            return;
        }

        let n = csi.param(0, 1) as usize;
        let rows = self.rows();
        let cols = self.cols();
        match csi.final_byte {
            b'@' => {
                // ICH - Insert Character
                let (row, col, bg) = (self.cursor.row, self.cursor.col, self.pen.bg);
                if let Some(line) = self.grid_mut().row_mut(row) {
                    line.insert_cells(col, n, bg);
                }
                self.cursor.pending_wrap = false;
            },
            b'A' => self.cursor.move_up(n, self.scroll_region.top),
            b'B' | b'e' => {
                let bottom = self.down_limit();
                self.cursor.move_down(n, bottom);
            },
            b'C' | b'a' => self.cursor.move_right(n, cols),
            b'D' => self.cursor.move_left(n),
            b'E' => {
                // CNL - Cursor Next Line
                let bottom = self.down_limit();
                self.cursor.move_down(n, bottom);
                self.cursor.col = 0;
            },
            b'F' => {
                // CPL - Cursor Previous Line
                self.cursor.move_up(n, self.scroll_region.top);
                self.cursor.col = 0;
            },
            b'G' | b'`' => {
                // CHA - Cursor Horizontal Absolute
                let row = self.cursor.row;
                self.cursor.move_to(row, n - 1, rows, cols);
            },
            b'H' | b'f' => self.goto(n, csi.param(1, 1) as usize),
            b'I' => {
                self.cursor.pending_wrap = false;
                self.tab_forward(n);
            },
            b'J' => self.erase_display(csi.params.raw(0)),
            b'K' => self.erase_line(csi.params.raw(0)),
            b'L' => {
                // IL - Insert Lines
                let (row, region) = (self.cursor.row, self.scroll_region);
                if region.contains(row) {
                    self.grid_mut().insert_lines(row, n, region);
                    self.cursor.col = 0;
                    self.cursor.pending_wrap = false;
                }
            },
            b'M' => {
                // DL - Delete Lines
                let (row, region) = (self.cursor.row, self.scroll_region);
                if region.contains(row) {
                    self.grid_mut().delete_lines(row, n, region);
                    self.cursor.col = 0;
                    self.cursor.pending_wrap = false;
                }
            },
            b'P' => {
                // DCH - Delete Character
                let (row, col, bg) = (self.cursor.row, self.cursor.col, self.pen.bg);
                if let Some(line) = self.grid_mut().row_mut(row) {
                    line.delete_cells(col, n, bg);
                }
                self.cursor.pending_wrap = false;
            },
            b'S' => {
                let region = self.scroll_region;
                self.grid_mut().scroll_up(region, n);
            },
            b'T' => {
                let region = self.scroll_region;
                self.grid_mut().scroll_down(region, n);
            },
            b'X' => {
                // ECH - Erase Character
                let (row, col, bg) = (self.cursor.row, self.cursor.col, self.pen.bg);
                if let Some(line) = self.grid_mut().row_mut(row) {
                    line.erase(col..col.saturating_add(n), bg);
                }
                self.cursor.pending_wrap = false;
            },
            b'Z' => self.tab_backward(n),
            b'b' => {
                // REP - repeat the last printed character
                if let Some(c) = self.last_printed {
                    for _ in 0..n.min(rows * cols) {
                        self.print(c);
                    }
                }
            },
            b'c' if csi.params.raw(0) == 0 => {
                // Primary device attributes: VT220 with ANSI color
                self.responses.extend_from_slice(b"\x1b[?62;22c");
            },
            b'd' => {
                // VPA - Line Position Absolute
                let col = self.cursor.col;
                self.goto(n, col + 1);
            },
            b'g' => match csi.params.raw(0) {
                0 => {
                    let col = self.cursor.col;
                    if let Some(stop) = self.tab_stops.get_mut(col) {
                        *stop = false;
                    }
                },
                3 => self.tab_stops.fill(false),
                _ => {},
            },
            b'h' | b'l' => {
                let value = csi.final_byte == b'h';
                for mode in csi.params.iter() {
                    self.modes.set_ansi_mode(mode, value);
                }
            },
            b'm' => self.select_graphic_rendition(&csi.params),
            b'n' => self.device_status_report(csi.params.raw(0)),
            b'r' => self.set_scroll_region(&csi.params),
            b's' => self.save_cursor(),
            b'u' => self.restore_cursor(),
            _ => {
                tracing::debug!("Unknown CSI sequence: {:?}", csi);
            },
        }
    }

    fn handle_csi_private(&mut self, csi: &CsiAction) {
        match csi.final_byte {
            b'h' | b'l' if csi.intermediates.is_empty() => {
                let value = csi.final_byte == b'h';
                for mode in csi.params.iter() {
                    self.set_private_mode(mode, value);
                }
            },
            _ => {
                tracing::debug!("Unknown private CSI sequence: {:?}", csi);
            },
        }
    }

    /// Bottom limit for CUD/CNL: the region bottom when inside it
    fn down_limit(&self) -> usize {
        if self.cursor.row <= self.scroll_region.bottom {
            self.scroll_region.bottom
        } else {
            self.rows() - 1
        }
    }

    fn set_private_mode(&mut self, mode: u16, value: bool) {
        tracing::debug!(mode, value, "DEC private mode");
        match mode {
            6 => {
                self.modes.origin_mode = value;
                self.goto(1, 1);
            },
            7 => {
                self.modes.auto_wrap = value;
                if !value {
                    self.cursor.pending_wrap = false;
                }
            },
            25 => {
                self.modes.cursor_visible = value;
                self.cursor.visible = value;
            },
            47 => {
                if value {
                    self.enter_alternate_screen(false);
                } else {
                    self.exit_alternate_screen();
                }
            },
            1047 => {
                if value {
                    self.enter_alternate_screen(true);
                } else {
                    if self.modes.alternate_screen {
                        let rows = self.rows();
                        self.alternate.erase_rows(0..rows, Color::Default);
                    }
                    self.exit_alternate_screen();
                }
            },
            1048 => {
                if value {
                    self.save_cursor();
                } else {
                    self.restore_cursor();
                }
            },
            1049 => {
                if value {
                    if !self.modes.alternate_screen {
                        self.save_cursor();
                        self.enter_alternate_screen(true);
                    }
                } else if self.modes.alternate_screen {
                    self.exit_alternate_screen();
                    self.restore_cursor();
                }
            },
            _ => {
                self.modes.set_dec_mode(mode, value);
            },
        }
    }

    /// DECSTR
    fn soft_reset(&mut self) {
        self.cursor.visible = true;
        self.cursor.pending_wrap = false;
        self.modes.cursor_visible = true;
        self.modes.insert_mode = false;
        self.modes.origin_mode = false;
        self.modes.auto_wrap = true;
        self.modes.application_cursor_keys = false;
        self.modes.application_keypad = false;
        self.pen.reset();
        self.scroll_region = ScrollRegion::full(self.rows());
        self.charsets = [Charset::Ascii; 2];
        self.active_charset = 0;
        self.saved = [SavedCursor::default(); 2];
    }

    fn set_scroll_region(&mut self, params: &Params) {
        let rows = self.rows();
        let top = params.get_or(0, 1) as usize;
        let bottom = (params.get_or(1, rows as u16) as usize).min(rows);
        if top >= bottom {
            tracing::debug!("Ignoring invalid scroll region {};{}", top, bottom);
            return;
        }
        self.scroll_region = ScrollRegion {
            top: top - 1,
            bottom: bottom - 1,
        };
        self.goto(1, 1);
    }

    fn erase_display(&mut self, mode: u16) {
        let (row, col, bg) = (self.cursor.row, self.cursor.col, self.pen.bg);
        let rows = self.rows();
        let grid = self.grid_mut();
        match mode {
            0 => {
                if let Some(line) = grid.row_mut(row) {
                    let len = line.len();
                    line.erase(col..len, bg);
                }
                grid.erase_rows(row + 1..rows, bg);
            },
            1 => {
                grid.erase_rows(0..row, bg);
                if let Some(line) = grid.row_mut(row) {
                    line.erase(0..col + 1, bg);
                }
            },
            2 => grid.erase_rows(0..rows, bg),
            3 => grid.clear_history(),
            _ => tracing::debug!("Unknown erase display mode: {}", mode),
        }
    }

    fn erase_line(&mut self, mode: u16) {
        let (row, col, bg) = (self.cursor.row, self.cursor.col, self.pen.bg);
        let Some(line) = self.grid_mut().row_mut(row) else {
            return;
        };
        let len = line.len();
        match mode {
            0 => line.erase(col..len, bg),
            1 => line.erase(0..col + 1, bg),
            2 => line.erase(0..len, bg),
            _ => tracing::debug!("Unknown erase line mode: {}", mode),
        }
    }

    fn device_status_report(&mut self, kind: u16) {
        match kind {
            5 => self.responses.extend_from_slice(b"\x1b[0n"),
            6 => {
                let (top, _) = self.origin_bounds();
                let row = self.cursor.row.saturating_sub(top) + 1;
                let col = self.cursor.col + 1;
                self.responses
                    .extend_from_slice(format!("\x1b[{};{}R", row, col).as_bytes());
            },
            _ => tracing::debug!("Unknown device status report: {}", kind),
        }
    }

    // ========================================================================
    // SGR
    // ========================================================================

    fn select_graphic_rendition(&mut self, params: &Params) {
        if params.is_empty() {
            self.pen.reset();
            return;
        }

        let mut i = 0;
        while i < params.len() {
            let code = params.raw(i);
            match code {
                0 => self.pen.reset(),
                1 => self.pen.flags.insert(CellFlags::BOLD),
                3 => self.pen.flags.insert(CellFlags::ITALIC),
                // 4:0 is the colon form of "no underline"
                4 if params.subparams(i).first() == Some(&0) => {
                    self.pen.flags.remove(CellFlags::UNDERLINE)
                },
                4 | 21 => self.pen.flags.insert(CellFlags::UNDERLINE),
                5 | 6 => self.pen.flags.insert(CellFlags::BLINK),
                7 => self.pen.flags.insert(CellFlags::INVERSE),
                9 => self.pen.flags.insert(CellFlags::STRIKETHROUGH),
                22 => self.pen.flags.remove(CellFlags::BOLD),
                23 => self.pen.flags.remove(CellFlags::ITALIC),
                24 => self.pen.flags.remove(CellFlags::UNDERLINE),
                25 => self.pen.flags.remove(CellFlags::BLINK),
                27 => self.pen.flags.remove(CellFlags::INVERSE),
                29 => self.pen.flags.remove(CellFlags::STRIKETHROUGH),
                // Faint, hidden and their resets are accepted without effect
                2 | 8 | 28 => {},
                30..=37 => self.pen.fg = Color::Named((code - 30) as u8),
                38 => {
                    let (color, consumed) = extended_color(params, i);
                    if let Some(color) = color {
                        self.pen.fg = color;
                    }
                    i += consumed;
                },
                39 => self.pen.fg = Color::Default,
                40..=47 => self.pen.bg = Color::Named((code - 40) as u8),
                48 => {
                    let (color, consumed) = extended_color(params, i);
                    if let Some(color) = color {
                        self.pen.bg = color;
                    }
                    i += consumed;
                },
                49 => self.pen.bg = Color::Default,
                90..=97 => self.pen.fg = Color::Named((code - 90 + 8) as u8),
                100..=107 => self.pen.bg = Color::Named((code - 100 + 8) as u8),
                _ => tracing::debug!("Unknown SGR parameter: {}", code),
            }
            i += 1;
        }
    }

    // ========================================================================
    // OSC
    // ========================================================================

    fn handle_osc(&mut self, osc: OscAction) {
        match osc {
            OscAction::SetIconAndTitle(title) | OscAction::SetTitle(title) => {
                self.title = title.clone();
                self.push_event(TerminalEvent::TitleChanged(title));
            },
            OscAction::SetWorkingDirectory(dir) => {
                self.working_directory = Some(dir.clone());
                self.push_event(TerminalEvent::WorkingDirectoryChanged(dir));
            },
            OscAction::SetIconName(_) => {},
            OscAction::Unknown { command, .. } => {
                tracing::debug!("Unhandled OSC {}", command);
            },
        }
    }
}

fn default_tab_stops(cols: usize, width: usize) -> Vec<bool> {
    (0..cols).map(|c| c != 0 && c % width == 0).collect()
}

/// Overwriting either half of a wide character blanks the other half
fn clear_wide_pair(line: &mut Row, col: usize) {
    let Some(cell) = line.get(col).copied() else {
        return;
    };
    if cell.flags.contains(CellFlags::WIDE_SPACER) && col > 0 {
        line.set(col - 1, Cell::erased(cell.bg));
    } else if cell.flags.contains(CellFlags::WIDE) {
        line.set(col + 1, Cell::erased(cell.bg));
    }
}

/// Parse the color after SGR 38/48 at `index`.
///
/// Handles both `38;5;N` / `38;2;R;G;B` and the colon forms
/// `38:5:N`, `38:2:R:G:B`, `38:2:CS:R:G:B`. Returns the color and how
/// many extra semicolon parameters were consumed.
fn extended_color(params: &Params, index: usize) -> (Option<Color>, usize) {
    let channel = |v: u16| v.min(255) as u8;

    let sub = params.subparams(index);
    if !sub.is_empty() {
        let color = match sub {
            [5, n, ..] => Some(Color::Indexed(channel(*n))),
            [2, r, g, b] => Some(Color::Rgb(channel(*r), channel(*g), channel(*b))),
            [2, _, r, g, b, ..] => Some(Color::Rgb(channel(*r), channel(*g), channel(*b))),
            _ => None,
        };
        return (color, 0);
    }

    let remaining = params.len() - index - 1;
    match params.raw(index + 1) {
        5 if remaining >= 2 => (Some(Color::Indexed(channel(params.raw(index + 2)))), 2),
        2 if remaining >= 4 => (
            Some(Color::Rgb(
                channel(params.raw(index + 2)),
                channel(params.raw(index + 3)),
                channel(params.raw(index + 4)),
            )),
            4,
        ),
        // Malformed: drop the rest of the sequence
        _ => (None, remaining),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn term(input: &[u8]) -> Terminal {
        let mut t = Terminal::new(24, 80);
        t.feed(input);
        t
    }

    fn cell(t: &Terminal, row: usize, col: usize) -> Cell {
        t.get_cell(row, col).copied().unwrap_or_default()
    }

    #[test]
    fn test_print_and_newline() {
        let t = term(b"Hello\r\n");
        assert_eq!(t.row_text(0), "Hello");
        assert_eq!((t.cursor().row, t.cursor().col), (1, 0));
    }

    #[test]
    fn test_pending_wrap() {
        let mut t = Terminal::new(3, 5);
        t.feed(b"abcde");
        assert_eq!(t.cursor().col, 4);
        assert!(t.cursor().pending_wrap);
        assert_eq!(t.cursor().row, 0);
        t.feed(b"f");
        assert_eq!(t.row_text(1), "f");
        assert_eq!((t.cursor().row, t.cursor().col), (1, 1));
        assert!(t.grid().row(0).map_or(false, |r| r.is_wrapped()));
    }

    #[test]
    fn test_exact_fill_then_crlf_has_no_blank_line() {
        let mut t = Terminal::new(3, 5);
        t.feed(b"abcde\r\nxy");
        assert_eq!(t.row_text(0), "abcde");
        assert_eq!(t.row_text(1), "xy");
    }

    #[test]
    fn test_autowrap_off_overwrites_last_column() {
        let mut t = Terminal::new(2, 3);
        t.feed(b"\x1b[?7labcdef");
        assert_eq!(t.row_text(0), "abf");
        assert_eq!(t.cursor().row, 0);
    }

    #[test]
    fn test_backspace_clamps() {
        let t = term(b"\x08\x08A\x08B");
        assert_eq!(t.row_text(0), "B");
        assert_eq!(t.cursor().col, 1);
    }

    #[test]
    fn test_tab_stops() {
        let t = term(b"\tX\tY");
        assert_eq!(cell(&t, 0, 8).c, 'X');
        assert_eq!(cell(&t, 0, 16).c, 'Y');

        let t = term(b"\x1b[3g\x1b[5G\x1bH\r\tZ");
        assert_eq!(cell(&t, 0, 4).c, 'Z');
    }

    #[test]
    fn test_cursor_motion() {
        let t = term(b"\x1b[10;20H");
        assert_eq!((t.cursor().row, t.cursor().col), (9, 19));
        let t = term(b"\x1b[10;20H\x1b[3A\x1b[5D");
        assert_eq!((t.cursor().row, t.cursor().col), (6, 14));
        let t = term(b"\x1b[999;999H");
        assert_eq!((t.cursor().row, t.cursor().col), (23, 79));
        let t = term(b"\x1b[5;5H\x1b[d");
        assert_eq!((t.cursor().row, t.cursor().col), (0, 4));
    }

    #[test]
    fn test_erase_display_modes() {
        let mut t = Terminal::new(3, 4);
        t.feed(b"aaaa\r\nbbbb\r\ncccc\x1b[2;2H\x1b[J");
        assert_eq!(t.row_text(0), "aaaa");
        assert_eq!(t.row_text(1), "b");
        assert_eq!(t.row_text(2), "");

        t.feed(b"\x1b[1J");
        assert_eq!(t.row_text(0), "");
        assert_eq!(t.row_text(1), "");

        t.feed(b"\x1b[Hzz\x1b[2J");
        assert_eq!(t.row_text(0), "");
    }

    #[test]
    fn test_erase_line_modes() {
        let mut t = Terminal::new(2, 6);
        t.feed(b"abcdef\x1b[1;3H\x1b[K");
        assert_eq!(t.row_text(0), "ab");
        t.feed(b"\x1b[1;6Hxyz\x1b[1;2H\x1b[1K");
        assert_eq!(cell(&t, 0, 0).c, ' ');
        assert_eq!(cell(&t, 0, 1).c, ' ');
        t.feed(b"\x1b[2K");
        assert_eq!(t.row_text(0), "");
    }

    #[test]
    fn test_erase_uses_pen_background() {
        let t = term(b"\x1b[44m\x1b[2K");
        assert_eq!(cell(&t, 0, 10).bg, Color::BLUE);
        assert_eq!(cell(&t, 0, 10).c, ' ');
    }

    #[test]
    fn test_sgr_attributes() {
        let t = term(b"\x1b[1;3;4;7;9mA\x1b[22;23;24;27;29mB");
        let a = cell(&t, 0, 0);
        assert!(a.flags.contains(
            CellFlags::BOLD
                | CellFlags::ITALIC
                | CellFlags::UNDERLINE
                | CellFlags::INVERSE
                | CellFlags::STRIKETHROUGH
        ));
        assert!(cell(&t, 0, 1).flags.is_empty());
    }

    #[test]
    fn test_sgr_colors() {
        let t = term(b"\x1b[31;42mA\x1b[91;103mB\x1b[38;5;196mC\x1b[38;2;1;2;3;48;2;4;5;6mD");
        assert_eq!(cell(&t, 0, 0).fg, Color::Named(1));
        assert_eq!(cell(&t, 0, 0).bg, Color::Named(2));
        assert_eq!(cell(&t, 0, 1).fg, Color::Named(9));
        assert_eq!(cell(&t, 0, 1).bg, Color::Named(11));
        assert_eq!(cell(&t, 0, 2).fg, Color::Indexed(196));
        assert_eq!(cell(&t, 0, 3).fg, Color::Rgb(1, 2, 3));
        assert_eq!(cell(&t, 0, 3).bg, Color::Rgb(4, 5, 6));
    }

    #[test]
    fn test_sgr_colon_forms() {
        let t = term(b"\x1b[38:5:21mA\x1b[38:2:10:20:30mB\x1b[48:2::7:8:9mC\x1b[4:0mD");
        assert_eq!(cell(&t, 0, 0).fg, Color::Indexed(21));
        assert_eq!(cell(&t, 0, 1).fg, Color::Rgb(10, 20, 30));
        assert_eq!(cell(&t, 0, 2).bg, Color::Rgb(7, 8, 9));
        assert!(!cell(&t, 0, 3).flags.contains(CellFlags::UNDERLINE));
    }

    #[test]
    fn test_sgr_truncated_extended_color_is_ignored() {
        let t = term(b"\x1b[31m\x1b[38;2;1mA");
        assert_eq!(cell(&t, 0, 0).fg, Color::Named(1));
    }

    #[test]
    fn test_pen_survives_cursor_motion() {
        let t = term(b"\x1b[1mA\x1b[5;5HB\x1b[0mC");
        assert!(cell(&t, 0, 0).flags.contains(CellFlags::BOLD));
        assert!(cell(&t, 4, 4).flags.contains(CellFlags::BOLD));
        assert!(cell(&t, 4, 5).flags.is_empty());
    }

    #[test]
    fn test_scroll_region_linefeed() {
        let mut t = Terminal::new(5, 4);
        t.feed(b"0\r\n1\r\n2\r\n3\r\n4");
        t.feed(b"\x1b[2;4r");
        assert_eq!((t.cursor().row, t.cursor().col), (0, 0));
        t.feed(b"\x1b[4;1H\nX");
        assert_eq!(t.row_text(0), "0");
        assert_eq!(t.row_text(1), "2");
        assert_eq!(t.row_text(2), "3");
        assert_eq!(t.row_text(3), "X");
        assert_eq!(t.row_text(4), "4");
        assert!(t.scrollback().is_empty());
    }

    #[test]
    fn test_invalid_scroll_region_ignored() {
        let t = term(b"\x1b[10;5r");
        assert_eq!(t.scroll_region(), ScrollRegion::full(24));
    }

    #[test]
    fn test_reverse_index_at_top_scrolls_down() {
        let mut t = Terminal::new(3, 4);
        t.feed(b"a\r\nb\x1b[H\x1bM");
        assert_eq!(t.row_text(0), "");
        assert_eq!(t.row_text(1), "a");
        assert_eq!(t.row_text(2), "b");
    }

    #[test]
    fn test_scroll_up_down_commands() {
        let mut t = Terminal::new(3, 4);
        t.feed(b"a\r\nb\r\nc\x1b[S");
        assert_eq!(t.row_text(0), "b");
        assert_eq!(t.scrollback().len(), 1);
        t.feed(b"\x1b[2T");
        assert_eq!(t.row_text(2), "b");
    }

    #[test]
    fn test_insert_delete_chars_and_lines() {
        let mut t = Terminal::new(4, 6);
        t.feed(b"abcdef\x1b[1;2H\x1b[2@");
        assert_eq!(t.row_text(0), "a  bcd");
        t.feed(b"\x1b[3P");
        assert_eq!(t.row_text(0), "acd");
        t.feed(b"\x1b[2;1Hline2\x1b[1;1H\x1b[L");
        assert_eq!(t.row_text(0), "");
        assert_eq!(t.row_text(1), "acd");
        assert_eq!(t.row_text(2), "line2");
        t.feed(b"\x1b[2M");
        assert_eq!(t.row_text(0), "line2");
        t.feed(b"\x1b[1;2H\x1b[2X");
        assert_eq!(t.row_text(0), "l  e2");
    }

    #[test]
    fn test_insert_mode() {
        let t = term(b"abc\x1b[1;1H\x1b[4hX");
        assert_eq!(t.row_text(0), "Xabc");
    }

    #[test]
    fn test_alternate_screen() {
        let mut t = Terminal::new(4, 10);
        t.feed(b"primary\x1b[?1049h");
        assert!(t.is_alternate_screen());
        assert_eq!(t.row_text(0), "");
        t.feed(b"alt\r\n\n\n\n\n\n");
        assert!(t.scrollback().is_empty());
        t.feed(b"\x1b[?1049l");
        assert!(!t.is_alternate_screen());
        assert_eq!(t.row_text(0), "primary");
        assert_eq!(t.cursor().col, 7);
    }

    #[test]
    fn test_mode_flags() {
        let t = term(b"\x1b[?25l\x1b[?2004h\x1b[?1h");
        assert!(!t.cursor().visible);
        assert!(t.modes().bracketed_paste);
        assert!(t.modes().application_cursor_keys);
        let t = term(b"\x1b[?2004h\x1b[?2004l\x1b[?25l\x1b[?25h");
        assert!(!t.modes().bracketed_paste);
        assert!(t.cursor().visible);
    }

    #[test]
    fn test_origin_mode() {
        let t = term(b"\x1b[5;10r\x1b[?6h\x1b[2;3H");
        assert_eq!((t.cursor().row, t.cursor().col), (5, 2));
        let t = term(b"\x1b[5;10r\x1b[?6h\x1b[99;1H");
        assert_eq!(t.cursor().row, 9);
    }

    #[test]
    fn test_save_restore_cursor() {
        let t = term(b"\x1b[5;5H\x1b[31m\x1b7\x1b[H\x1b[0m\x1b8X");
        assert_eq!(cell(&t, 4, 4).c, 'X');
        assert_eq!(cell(&t, 4, 4).fg, Color::RED);
        let t = term(b"\x1b[3;3H\x1b[s\x1b[H\x1b[uY");
        assert_eq!(cell(&t, 2, 2).c, 'Y');
    }

    #[test]
    fn test_title_and_cwd_events() {
        let mut t = term(b"\x1b]2;my title\x07\x1b]7;file://host/tmp\x1b\\\x07");
        assert_eq!(t.title(), "my title");
        assert_eq!(t.working_directory(), Some("file://host/tmp"));
        assert_eq!(t.take_events(), vec![
            TerminalEvent::TitleChanged("my title".to_string()),
            TerminalEvent::WorkingDirectoryChanged("file://host/tmp".to_string()),
            TerminalEvent::Bell,
        ]);
        assert!(t.take_events().is_empty());
        // Metadata never reaches the grid
        assert_eq!(t.row_text(0), "");
    }

    #[test]
    fn test_device_reports() {
        let mut t = term(b"\x1b[3;7H\x1b[6n\x1b[5n\x1b[c");
        assert_eq!(t.take_responses(), b"\x1b[3;7R\x1b[0n\x1b[?62;22c".to_vec());
        assert!(t.take_responses().is_empty());
    }

    #[test]
    fn test_unknown_sequences_ignored() {
        let t = term(b"\x1b[5;5~\x1b[?9999hA\x1bP+q\x1b\\\x1b[>4;1mB");
        assert_eq!(t.row_text(0), "AB");
    }

    #[test]
    fn test_line_drawing_charset() {
        let t = term(b"\x1b(0lqk\x1b(Bq");
        assert_eq!(t.row_text(0), "┌─┐q");
        let t = term(b"\x1b)0a\x0eq\x0fq");
        assert_eq!(t.row_text(0), "a─q");
    }

    #[test]
    fn test_wide_characters() {
        let mut t = Terminal::new(2, 5);
        t.feed("中a".as_bytes());
        assert!(cell(&t, 0, 0).flags.contains(CellFlags::WIDE));
        assert!(cell(&t, 0, 1).is_wide_spacer());
        assert_eq!(t.row_text(0), "中a");
        assert_eq!(t.cursor().col, 3);
        // Does not fit in the last column: wraps first
        t.feed("b文".as_bytes());
        assert_eq!(t.row_text(1), "文");
        // Overwriting the spacer blanks the wide half
        t.feed(b"\x1b[1;2Hx");
        assert_eq!(cell(&t, 0, 0).c, ' ');
    }

    #[test]
    fn test_combining_marks_dropped() {
        let t = term("e\u{0301}x".as_bytes());
        assert_eq!(t.row_text(0), "ex");
    }

    #[test]
    fn test_repeat_last_character() {
        let t = term(b"-\x1b[4b");
        assert_eq!(t.row_text(0), "-----");
    }

    #[test]
    fn test_alignment_pattern_and_reset() {
        let mut t = Terminal::new(2, 3);
        t.feed(b"\x1b#8");
        assert_eq!(t.row_text(1), "EEE");
        t.feed(b"\x1b[31m\x1b[?25l\x1bc");
        assert_eq!(t.row_text(1), "");
        assert_eq!(t.pen(), Pen::default());
        assert!(t.cursor().visible);
    }

    #[test]
    fn test_resize_clamps_cursor_and_resets_region() {
        let mut t = term(b"\x1b[5;10r\x1b[24;80H");
        t.resize(10, 40);
        assert!(t.cursor().row <= 9);
        assert!(t.cursor().col <= 39);
        assert_eq!(t.scroll_region(), ScrollRegion::full(10));
        assert_eq!(t.dirty_rows().count(), 10);
    }

    #[test]
    fn test_resize_to_same_size_resets_region() {
        let mut t = term(b"\x1b[5;10r");
        assert_eq!(t.scroll_region(), ScrollRegion { top: 4, bottom: 9 });
        t.resize(24, 80);
        assert_eq!(t.scroll_region(), ScrollRegion::full(24));
    }

    #[test]
    fn test_resize_caps_row_count() {
        let mut t = Terminal::new(2, 4);
        t.resize(MAX_ROWS + 10, 4);
        assert_eq!(t.rows(), MAX_ROWS);
    }

    #[test]
    fn test_resize_full_screen_with_cursor_home_keeps_every_row() {
        let mut t = Terminal::new(24, 80);
        for i in 0..24 {
            t.feed(format!("row{}", i).as_bytes());
            if i < 23 {
                t.feed(b"\r\n");
            }
        }
        t.feed(b"\x1b[H");
        t.resize(10, 80);

        let visible: Vec<String> = (0..10).map(|r| t.row_text(r)).collect();
        let expected: Vec<String> = (14..24).map(|i| format!("row{}", i)).collect();
        assert_eq!(visible, expected);
        let history: Vec<String> = t.scrollback().iter().map(Row::text).collect();
        let expected: Vec<String> = (0..14).map(|i| format!("row{}", i)).collect();
        assert_eq!(history, expected);
        assert_eq!((t.cursor().row, t.cursor().col), (0, 0));
    }

    #[test]
    fn test_resize_moves_top_rows_to_history() {
        let mut t = Terminal::new(4, 10);
        t.feed(b"r0\r\nr1\r\nr2\r\nr3");
        t.resize(2, 10);
        assert_eq!(t.row_text(0), "r2");
        assert_eq!(t.row_text(1), "r3");
        assert_eq!(t.scrollback().len(), 2);
        assert_eq!((t.cursor().row, t.cursor().col), (1, 2));
    }

    #[test]
    fn test_resize_grow_pads_and_extends_tabs() {
        let mut t = Terminal::new(2, 10);
        t.feed(b"ab");
        t.resize(4, 20);
        assert_eq!(t.rows(), 4);
        assert_eq!(t.cols(), 20);
        assert_eq!(t.row_text(0), "ab");
        t.feed(b"\r\t\tX");
        assert_eq!(cell(&t, 0, 16).c, 'X');
    }

    #[test]
    fn test_damage_tracking() {
        let mut t = Terminal::new(5, 10);
        t.mark_clean();
        assert_eq!(t.dirty_rows().count(), 0);
        t.feed(b"\x1b[3;1Hx");
        assert_eq!(t.dirty_rows().collect::<Vec<_>>(), vec![2]);
        t.mark_clean();
        t.feed(b"\x1b[5;1H\n");
        assert_eq!(t.dirty_rows().count(), 5);
    }

    #[test]
    fn test_snapshot() {
        let t = term(b"\x1b[31mR\x1b[0mok\x1b]2;snap\x07");
        let snapshot = t.snapshot();
        assert_eq!(snapshot.lines[0], "Rok");
        assert_eq!(snapshot.styled.len(), 1);
        assert_eq!(snapshot.styled[0].c, 'R');
        assert_eq!(snapshot.title, "snap");
    }
}
