//! Terminal grid - the visible screen area plus its history
//!
//! The grid owns the visible rows and the scrollback ring. Damage is
//! tracked per row: any operation that touches a row marks it dirty, and
//! `mark_clean` is the only thing that clears the flags.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use super::cell::Cell;
use super::color::Color;
use super::row::Row;
use super::scrollback::Scrollback;

/// Inclusive row bounds constraining scroll operations (DECSTBM)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrollRegion {
    pub top: usize,
    pub bottom: usize,
}

impl ScrollRegion {
    /// Region covering a whole screen of `rows` rows
    pub fn full(rows: usize) -> Self {
        Self {
            top: 0,
            bottom: rows.saturating_sub(1),
        }
    }

    pub fn contains(&self, row: usize) -> bool {
        (self.top..=self.bottom).contains(&row)
    }

    pub fn height(&self) -> usize {
        self.bottom + 1 - self.top
    }
}

/// The terminal grid (visible screen area)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grid {
    /// Visible rows (row 0 is top)
    rows: Vec<Row>,
    /// Number of columns
    cols: usize,
    /// Rows scrolled off the top
    scrollback: Scrollback,
}

impl Grid {
    /// Create a blank grid; `scrollback_lines` of 0 disables history
    pub fn new(rows: usize, cols: usize, scrollback_lines: usize) -> Self {
        Self {
            rows: (0..rows).map(|_| Row::new(cols)).collect(),
            cols,
            scrollback: Scrollback::new(scrollback_lines),
        }
    }

    /// Number of visible rows
    pub fn rows(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns
    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get_cell(&self, row: usize, col: usize) -> Option<&Cell> {
        self.rows.get(row)?.get(col)
    }

    /// Write one cell; returns false when out of bounds
    pub fn set_cell(&mut self, row: usize, col: usize, cell: Cell) -> bool {
        self.rows
            .get_mut(row)
            .map_or(false, |line| line.set(col, cell))
    }

    /// Borrow a whole row of cells
    pub fn get_row(&self, row: usize) -> Option<&[Cell]> {
        self.rows.get(row).map(Row::cells)
    }

    pub fn row(&self, row: usize) -> Option<&Row> {
        self.rows.get(row)
    }

    pub fn row_mut(&mut self, row: usize) -> Option<&mut Row> {
        self.rows.get_mut(row)
    }

    /// Text of a visible row with trailing blanks trimmed
    pub fn row_text(&self, row: usize) -> String {
        self.rows.get(row).map(Row::text).unwrap_or_default()
    }

    pub fn scrollback(&self) -> &Scrollback {
        &self.scrollback
    }

    pub fn clear_history(&mut self) {
        self.scrollback.clear();
    }

    fn clamp_region(&self, region: ScrollRegion) -> Option<ScrollRegion> {
        let last = self.rows.len().checked_sub(1)?;
        let bottom = region.bottom.min(last);
        (region.top <= bottom).then_some(ScrollRegion {
            top: region.top,
            bottom,
        })
    }

    /// Scroll the region up by `n`. Rows leaving a region anchored at
    /// the top of the screen go to scrollback; new rows are blank with
    /// default attributes.
    pub fn scroll_up(&mut self, region: ScrollRegion, n: usize) {
        self.shift_up(region, n, region.top == 0);
    }

    /// Scroll the region down by `n`, exposing blank rows at its top
    pub fn scroll_down(&mut self, region: ScrollRegion, n: usize) {
        let Some(region) = self.clamp_region(region) else {
            return;
        };
        let n = n.min(region.height());
        if n == 0 {
            return;
        }
        let span = &mut self.rows[region.top..=region.bottom];
        span.rotate_right(n);
        for row in &mut span[..n] {
            row.fill(Cell::BLANK);
        }
        for row in span.iter_mut() {
            row.mark_dirty();
        }
    }

    /// Signed scroll: positive moves content up, negative moves it down
    pub fn scroll(&mut self, region: ScrollRegion, n: isize) {
        if n >= 0 {
            self.scroll_up(region, n as usize);
        } else {
            self.scroll_down(region, n.unsigned_abs());
        }
    }

    fn shift_up(&mut self, region: ScrollRegion, n: usize, save: bool) {
        let Some(region) = self.clamp_region(region) else {
            return;
        };
        let n = n.min(region.height());
        if n == 0 {
            return;
        }
        let cols = self.cols;
        let span = &mut self.rows[region.top..=region.bottom];
        span.rotate_left(n);
        let exposed = span.len() - n;
        for row in &mut span[exposed..] {
            if save {
                let blank = match self.scrollback.push(std::mem::replace(row, Row::new(0))) {
                    // Reuse the storage of whatever fell out of history
                    Some(mut recycled) if recycled.len() == cols => {
                        recycled.fill(Cell::BLANK);
                        recycled
                    },
                    _ => Row::new(cols),
                };
                *row = blank;
            } else {
                row.fill(Cell::BLANK);
            }
        }
        for row in span.iter_mut() {
            row.mark_dirty();
        }
    }

    /// Insert `n` blank rows at `row`, pushing rows below it down
    /// within `region` (IL). No-op outside the region.
    pub fn insert_lines(&mut self, row: usize, n: usize, region: ScrollRegion) {
        if region.contains(row) {
            self.scroll_down(
                ScrollRegion {
                    top: row,
                    bottom: region.bottom,
                },
                n,
            );
        }
    }

    /// Delete `n` rows at `row`, pulling rows below it up within
    /// `region` (DL). Deleted rows never enter scrollback.
    pub fn delete_lines(&mut self, row: usize, n: usize, region: ScrollRegion) {
        if region.contains(row) {
            self.shift_up(
                ScrollRegion {
                    top: row,
                    bottom: region.bottom,
                },
                n,
                false,
            );
        }
    }

    /// Erase whole rows in `range`, keeping `bg` as background
    pub fn erase_rows(&mut self, range: Range<usize>, bg: Color) {
        let end = range.end.min(self.rows.len());
        let start = range.start.min(end);
        for row in &mut self.rows[start..end] {
            let cols = row.len();
            row.erase(0..cols, bg);
            row.set_wrapped(false);
        }
    }

    /// Resize with truncate/pad semantics.
    ///
    /// When shrinking, trailing blank rows below `cursor_row` are dropped
    /// first; every other excess row moves from the top into scrollback.
    /// Returns how many rows the content moved up, so the caller can shift
    /// the cursor.
    pub fn resize(&mut self, rows: usize, cols: usize, cursor_row: usize) -> usize {
        if cols != self.cols {
            for row in &mut self.rows {
                row.resize(cols);
            }
            self.cols = cols;
        }

        let mut shifted = 0;
        if rows < self.rows.len() {
            let mut excess = self.rows.len() - rows;
            while excess > 0
                && self.rows.len() > cursor_row + 1
                && self.rows.last().is_some_and(Row::is_blank)
            {
                self.rows.pop();
                excess -= 1;
            }

            shifted = self.rows.len().saturating_sub(rows);
            for row in self.rows.drain(..shifted) {
                self.scrollback.push(row);
            }
        } else {
            while self.rows.len() < rows {
                self.rows.push(Row::new(cols));
            }
        }

        self.mark_all_dirty();
        shifted
    }

    /// Indices of rows changed since the last `mark_clean`
    pub fn dirty_rows(&self) -> impl Iterator<Item = usize> + '_ {
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, row)| row.is_dirty())
            .map(|(i, _)| i)
    }

    /// Copy dirty row indices into `buf`; returns how many were written.
    /// Indices that do not fit in a `u16` are skipped.
    pub fn dirty_rows_into(&self, buf: &mut [u16]) -> usize {
        let indices = self.dirty_rows().filter_map(|row| u16::try_from(row).ok());
        let mut count = 0;
        for (slot, row) in buf.iter_mut().zip(indices) {
            *slot = row;
            count += 1;
        }
        count
    }

    pub fn is_dirty(&self) -> bool {
        self.rows.iter().any(Row::is_dirty)
    }

    pub fn mark_clean(&mut self) {
        for row in &mut self.rows {
            row.mark_clean();
        }
    }

    pub fn mark_all_dirty(&mut self) {
        for row in &mut self.rows {
            row.mark_dirty();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_with_rows(lines: &[&str], cols: usize, history: usize) -> Grid {
        let mut grid = Grid::new(lines.len(), cols, history);
        for (r, line) in lines.iter().enumerate() {
            for (c, ch) in line.chars().enumerate() {
                grid.set_cell(r, c, Cell::new(ch));
            }
        }
        grid
    }

    fn texts(grid: &Grid) -> Vec<String> {
        (0..grid.rows()).map(|r| grid.row_text(r)).collect()
    }

    #[test]
    fn test_new_grid() {
        let grid = Grid::new(24, 80, 100);
        assert_eq!(grid.rows(), 24);
        assert_eq!(grid.cols(), 80);
        assert_eq!(grid.get_row(0).map(<[Cell]>::len), Some(80));
        assert!(grid.get_cell(24, 0).is_none());
        assert!(grid.get_cell(0, 80).is_none());
    }

    #[test]
    fn test_scroll_up_full_screen_saves_history() {
        let mut grid = grid_with_rows(&["A", "B", "C"], 4, 10);
        grid.scroll_up(ScrollRegion::full(3), 1);
        assert_eq!(texts(&grid), vec!["B", "C", ""]);
        assert_eq!(grid.scrollback().len(), 1);
        assert_eq!(grid.scrollback().get(0).map(Row::text), Some("A".to_string()));
    }

    #[test]
    fn test_scroll_up_inner_region_keeps_history_empty() {
        let mut grid = grid_with_rows(&["A", "B", "C", "D"], 4, 10);
        grid.scroll_up(ScrollRegion { top: 1, bottom: 2 }, 1);
        assert_eq!(texts(&grid), vec!["A", "C", "", "D"]);
        assert!(grid.scrollback().is_empty());
    }

    #[test]
    fn test_scroll_down() {
        let mut grid = grid_with_rows(&["A", "B", "C"], 4, 10);
        grid.scroll_down(ScrollRegion::full(3), 2);
        assert_eq!(texts(&grid), vec!["", "", "A"]);
        grid.scroll(ScrollRegion::full(3), 1);
        assert_eq!(texts(&grid), vec!["", "A", ""]);
    }

    #[test]
    fn test_scroll_exposes_default_cells() {
        let mut grid = Grid::new(2, 2, 0);
        let styled = Cell {
            bg: Color::RED,
            ..Cell::new('x')
        };
        grid.set_cell(0, 0, styled);
        grid.set_cell(1, 0, styled);
        grid.scroll_up(ScrollRegion::full(2), 1);
        assert_eq!(grid.get_cell(1, 0), Some(&Cell::BLANK));
    }

    #[test]
    fn test_history_bounded() {
        let mut grid = Grid::new(2, 2, 3);
        for _ in 0..10 {
            grid.scroll_up(ScrollRegion::full(2), 1);
        }
        assert_eq!(grid.scrollback().len(), 3);
    }

    #[test]
    fn test_insert_and_delete_lines() {
        let mut grid = grid_with_rows(&["A", "B", "C", "D"], 4, 10);
        let region = ScrollRegion::full(4);
        grid.insert_lines(1, 1, region);
        assert_eq!(texts(&grid), vec!["A", "", "B", "C"]);
        grid.delete_lines(0, 2, region);
        assert_eq!(texts(&grid), vec!["B", "C", "", ""]);
        assert!(grid.scrollback().is_empty());
    }

    #[test]
    fn test_dirty_tracking() {
        let mut grid = Grid::new(4, 4, 0);
        assert_eq!(grid.dirty_rows().count(), 4);
        grid.mark_clean();
        assert_eq!(grid.dirty_rows().count(), 0);
        grid.set_cell(2, 1, Cell::new('x'));
        assert_eq!(grid.dirty_rows().collect::<Vec<_>>(), vec![2]);

        let mut buf = [0u16; 1];
        assert_eq!(grid.dirty_rows_into(&mut buf), 1);
        assert_eq!(buf[0], 2);
    }

    #[test]
    fn test_scroll_marks_region_dirty() {
        let mut grid = Grid::new(6, 4, 0);
        grid.mark_clean();
        grid.scroll_up(ScrollRegion { top: 2, bottom: 4 }, 1);
        assert_eq!(grid.dirty_rows().collect::<Vec<_>>(), vec![2, 3, 4]);
    }

    #[test]
    fn test_resize_shrink_keeps_cursor_row() {
        let mut grid = grid_with_rows(&["0", "1", "2", "3", "4", ""], 4, 10);
        // Cursor on row 4: the blank row below goes first, then rows 0-1
        let shifted = grid.resize(3, 2, 4);
        assert_eq!(shifted, 2);
        assert_eq!(texts(&grid), vec!["2", "3", "4"]);
        assert_eq!(grid.scrollback().len(), 2);
        assert_eq!(grid.cols(), 2);
    }

    #[test]
    fn test_resize_shrink_never_drops_content_below_cursor() {
        let lines: Vec<String> = (0..6).map(|i| format!("r{}", i)).collect();
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        let mut grid = grid_with_rows(&refs, 4, 10);
        // Cursor at home with a full screen below it
        let shifted = grid.resize(2, 4, 0);
        assert_eq!(shifted, 4);
        assert_eq!(texts(&grid), vec!["r4", "r5"]);
        let history: Vec<String> = grid.scrollback().iter().map(Row::text).collect();
        assert_eq!(history, vec!["r0", "r1", "r2", "r3"]);
    }

    #[test]
    fn test_resize_shrink_drops_only_trailing_blank_rows() {
        let mut grid = grid_with_rows(&["a", "", "b", "", ""], 4, 10);
        // Rows 3-4 are blank and go; row 1 is blank but not trailing
        assert_eq!(grid.resize(3, 4, 0), 0);
        assert_eq!(texts(&grid), vec!["a", "", "b"]);
        assert_eq!(grid.scrollback().len(), 0);
    }

    #[test]
    fn test_dirty_rows_into_skips_indices_past_u16() {
        let mut grid = Grid::new(usize::from(u16::MAX) + 3, 1, 0);
        grid.mark_clean();
        grid.set_cell(1, 0, Cell::new('a'));
        grid.set_cell(usize::from(u16::MAX) + 1, 0, Cell::new('b'));
        let mut buf = [0u16; 4];
        assert_eq!(grid.dirty_rows_into(&mut buf), 1);
        assert_eq!(buf[0], 1);
    }

    #[test]
    fn test_resize_grow_pads() {
        let mut grid = grid_with_rows(&["ab"], 2, 10);
        grid.mark_clean();
        assert_eq!(grid.resize(3, 5, 0), 0);
        assert_eq!(grid.rows(), 3);
        assert_eq!(grid.get_row(0).map(<[Cell]>::len), Some(5));
        assert_eq!(grid.row_text(0), "ab");
        assert_eq!(grid.dirty_rows().count(), 3);
    }
}
