//! Cursor and pen state
//!
//! The cursor is a position plus the pending-wrap flag; the pen (current
//! graphics rendition) is kept beside it because DECSC saves both.

use serde::{Deserialize, Serialize};

use super::cell::{Cell, CellFlags};
use super::color::Color;

/// Cursor position and visibility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    /// 0-based row
    pub row: usize,
    /// 0-based column
    pub col: usize,
    /// DECTCEM; mirrors `Modes::cursor_visible`
    pub visible: bool,
    /// Cursor sits past the last column; the next printable wraps first
    pub pending_wrap: bool,
}

impl Default for Cursor {
    fn default() -> Self {
        Self {
            row: 0,
            col: 0,
            visible: true,
            pending_wrap: false,
        }
    }
}

impl Cursor {
    /// Move to an absolute position, clamped to `rows` x `cols`
    pub fn move_to(&mut self, row: usize, col: usize, rows: usize, cols: usize) {
        self.row = row.min(rows.saturating_sub(1));
        self.col = col.min(cols.saturating_sub(1));
        self.pending_wrap = false;
    }

    /// Move up by n rows, stopping at `top` when starting at or below it
    pub fn move_up(&mut self, n: usize, top: usize) {
        let limit = if self.row >= top { top } else { 0 };
        self.row = self.row.saturating_sub(n).max(limit);
        self.pending_wrap = false;
    }

    /// Move down by n rows, stopping at `bottom` (never moves up)
    pub fn move_down(&mut self, n: usize, bottom: usize) {
        self.row = self.row.saturating_add(n).min(bottom.max(self.row));
        self.pending_wrap = false;
    }

    /// Move left by n columns, stopping at column 0
    pub fn move_left(&mut self, n: usize) {
        self.col = self.col.saturating_sub(n);
        self.pending_wrap = false;
    }

    /// Move right by n columns, stopping at the last column
    pub fn move_right(&mut self, n: usize, cols: usize) {
        self.col = self.col.saturating_add(n).min(cols.saturating_sub(1));
        self.pending_wrap = false;
    }

    /// Clamp into a (possibly smaller) screen
    pub fn clamp(&mut self, rows: usize, cols: usize) {
        self.row = self.row.min(rows.saturating_sub(1));
        self.col = self.col.min(cols.saturating_sub(1));
        self.pending_wrap = false;
    }
}

/// Current graphics rendition applied to newly written cells
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pen {
    pub fg: Color,
    pub bg: Color,
    pub flags: CellFlags,
}

impl Pen {
    /// SGR 0
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// A cell holding `c` drawn with this pen
    pub fn cell(&self, c: char) -> Cell {
        Cell {
            c,
            fg: self.fg,
            bg: self.bg,
            flags: self.flags,
        }
    }
}

/// State saved by DECSC / CSI s and restored by DECRC / CSI u
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedCursor {
    pub row: usize,
    pub col: usize,
    pub pending_wrap: bool,
    pub pen: Pen,
    pub origin_mode: bool,
    pub auto_wrap: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_move_to_clamps() {
        let mut cursor = Cursor::default();
        cursor.move_to(10, 5, 24, 80);
        assert_eq!((cursor.row, cursor.col), (10, 5));
        cursor.move_to(50, 100, 24, 80);
        assert_eq!((cursor.row, cursor.col), (23, 79));
    }

    #[test]
    fn test_cursor_relative_moves_stop_at_margins() {
        let mut cursor = Cursor::default();
        cursor.move_to(10, 10, 24, 80);
        cursor.move_up(20, 5);
        assert_eq!(cursor.row, 5);
        cursor.move_down(100, 12);
        assert_eq!(cursor.row, 12);
        cursor.move_left(100);
        assert_eq!(cursor.col, 0);
        cursor.move_right(100, 80);
        assert_eq!(cursor.col, 79);
    }

    #[test]
    fn test_margins_do_not_trap_cursor_outside_region() {
        // Above the region, CUU stops at row 0 rather than jumping down
        let mut cursor = Cursor::default();
        cursor.move_to(2, 0, 24, 80);
        cursor.move_up(1, 5);
        assert_eq!(cursor.row, 1);
    }

    #[test]
    fn test_moves_clear_pending_wrap() {
        let mut cursor = Cursor {
            pending_wrap: true,
            ..Cursor::default()
        };
        cursor.move_left(1);
        assert!(!cursor.pending_wrap);
    }

    #[test]
    fn test_pen_cell() {
        let mut pen = Pen {
            fg: Color::RED,
            flags: CellFlags::BOLD,
            ..Pen::default()
        };
        let cell = pen.cell('x');
        assert_eq!(cell.fg, Color::RED);
        assert!(cell.flags.contains(CellFlags::BOLD));
        pen.reset();
        assert_eq!(pen, Pen::default());
    }
}
