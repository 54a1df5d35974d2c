//! Deterministic snapshot generation
//!
//! Snapshots capture the visible terminal state in a serializable format
//! for golden tests and debugging. Feeding the same byte stream always
//! produces an identical snapshot, however the stream was chunked.

use serde::{Deserialize, Serialize};

use super::cell::Cell;
use super::color::{Palette, Rgb};
use super::cursor::Cursor;
use super::grid::ScrollRegion;
use super::modes::Modes;

/// Visible state of a terminal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub rows: usize,
    pub cols: usize,
    /// Text of each visible row, trailing blanks trimmed
    pub lines: Vec<String>,
    /// Cells carrying non-default colors or attributes
    pub styled: Vec<CellSnapshot>,
    pub cursor: Cursor,
    pub scroll_region: ScrollRegion,
    pub modes: Modes,
    pub title: String,
    /// Lines held in the primary screen's history
    pub scrollback_lines: usize,
}

/// A styled cell with its colors resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellSnapshot {
    pub row: usize,
    pub col: usize,
    pub c: char,
    pub fg: Rgb,
    pub bg: Rgb,
    /// Raw attribute bits
    pub flags: u8,
}

impl CellSnapshot {
    pub fn new(row: usize, col: usize, cell: &Cell, palette: &Palette) -> Self {
        Self {
            row,
            col,
            c: cell.c,
            fg: palette.resolve(cell.fg, true),
            bg: palette.resolve(cell.bg, false),
            flags: cell.flags.bits(),
        }
    }
}

impl Snapshot {
    /// Convert snapshot to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parse snapshot from JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Screen text with trailing empty lines removed
    pub fn to_text(&self) -> String {
        let last = self
            .lines
            .iter()
            .rposition(|line| !line.is_empty())
            .map_or(0, |i| i + 1);
        let mut text = self.lines[..last].join("\n");
        text.push('\n');
        text
    }

    /// Compare visible content only (text and styling)
    pub fn content_equals(&self, other: &Snapshot) -> bool {
        self.rows == other.rows
            && self.cols == other.cols
            && self.lines == other.lines
            && self.styled == other.styled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CellFlags, Color};

    fn sample() -> Snapshot {
        Snapshot {
            rows: 3,
            cols: 4,
            lines: vec!["ab".into(), "".into(), "".into()],
            styled: vec![],
            cursor: Cursor::default(),
            scroll_region: ScrollRegion::full(3),
            modes: Modes::default(),
            title: String::new(),
            scrollback_lines: 0,
        }
    }

    #[test]
    fn test_to_text() {
        assert_eq!(sample().to_text(), "ab\n");
        let mut empty = sample();
        empty.lines = vec![String::new(); 3];
        assert_eq!(empty.to_text(), "\n");
    }

    #[test]
    fn test_cell_snapshot_resolves_colors() {
        let cell = Cell {
            c: 'x',
            fg: Color::RED,
            bg: Color::Default,
            flags: CellFlags::BOLD | CellFlags::INVERSE,
        };
        let snapshot = CellSnapshot::new(1, 2, &cell, &Palette::default());
        assert_eq!(snapshot.fg, Rgb::new(205, 0, 0));
        assert_eq!(snapshot.bg, Rgb::new(0, 0, 0));
        assert_eq!(snapshot.flags, 0x11);
    }

    #[test]
    fn test_json_roundtrip() {
        let snapshot = sample();
        let json = snapshot.to_json().expect("serialize");
        let restored = Snapshot::from_json(&json).expect("deserialize");
        assert_eq!(snapshot, restored);
        assert!(snapshot.content_equals(&restored));
    }
}
