//! A single row of the grid
//!
//! Every mutating method sets the row's dirty flag, so callers cannot
//! change a row without it showing up in the damage list.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use super::cell::{Cell, CellFlags};
use super::color::Color;

/// A row of cells plus its damage flag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    cells: Vec<Cell>,
    dirty: bool,
    /// Row was continued onto the next one by autowrap
    wrapped: bool,
}

impl Row {
    /// Blank row; new rows start dirty
    pub fn new(cols: usize) -> Self {
        Self {
            cells: vec![Cell::BLANK; cols],
            dirty: true,
            wrapped: false,
        }
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// True when no cell holds anything visible
    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(Cell::is_blank)
    }

    pub fn get(&self, col: usize) -> Option<&Cell> {
        self.cells.get(col)
    }

    /// Write a cell; returns false if `col` is out of range
    pub fn set(&mut self, col: usize, cell: Cell) -> bool {
        match self.cells.get_mut(col) {
            Some(slot) => {
                *slot = cell;
                self.dirty = true;
                true
            },
            None => false,
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    pub fn is_wrapped(&self) -> bool {
        self.wrapped
    }

    pub fn set_wrapped(&mut self, wrapped: bool) {
        self.wrapped = wrapped;
        self.dirty = true;
    }

    /// Reset every cell to `cell`
    pub fn fill(&mut self, cell: Cell) {
        self.cells.fill(cell);
        self.wrapped = false;
        self.dirty = true;
    }

    /// Erase a column range, keeping `bg` as the background
    pub fn erase(&mut self, range: Range<usize>, bg: Color) {
        let end = range.end.min(self.cells.len());
        let start = range.start.min(end);
        self.cells[start..end].fill(Cell::erased(bg));
        self.dirty = true;
    }

    /// Insert `n` blank cells at `col`, shifting the rest right (ICH)
    pub fn insert_cells(&mut self, col: usize, n: usize, bg: Color) {
        let len = self.cells.len();
        if col >= len {
            return;
        }
        let n = n.min(len - col);
        self.cells[col..].rotate_right(n);
        self.cells[col..col + n].fill(Cell::erased(bg));
        self.dirty = true;
    }

    /// Delete `n` cells at `col`, shifting the rest left (DCH)
    pub fn delete_cells(&mut self, col: usize, n: usize, bg: Color) {
        let len = self.cells.len();
        if col >= len {
            return;
        }
        let n = n.min(len - col);
        self.cells[col..].rotate_left(n);
        self.cells[len - n..].fill(Cell::erased(bg));
        self.dirty = true;
    }

    /// Truncate or pad to `cols`
    pub fn resize(&mut self, cols: usize) {
        self.cells.resize(cols, Cell::BLANK);
        if let Some(last) = self.cells.last_mut() {
            // A wide character cut in half by truncation becomes blank
            if last.flags.contains(CellFlags::WIDE) {
                *last = Cell::BLANK;
            }
        }
        self.dirty = true;
    }

    /// Text content with trailing blanks trimmed
    pub fn text(&self) -> String {
        let text: String = self
            .cells
            .iter()
            .filter(|cell| !cell.is_wide_spacer())
            .map(|cell| cell.c)
            .collect();
        text.trim_end_matches(' ').to_string()
    }
}
