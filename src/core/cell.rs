//! Terminal Cell
//!
//! Represents a single cell in the terminal grid, containing a character
//! and its associated styling attributes. Cells are plain `Copy` values so
//! rows can be read and written without allocation.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use super::color::Color;

bitflags! {
    /// Text attributes; the bit values are part of the boundary record
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct CellFlags: u8 {
        const BOLD          = 0b0000_0001;
        const ITALIC        = 0b0000_0010;
        const UNDERLINE     = 0b0000_0100;
        const BLINK         = 0b0000_1000;
        const INVERSE       = 0b0001_0000;
        const STRIKETHROUGH = 0b0010_0000;
        /// First half of a double-width character
        const WIDE          = 0b0100_0000;
        /// Placeholder right of a wide character
        const WIDE_SPACER   = 0b1000_0000;
    }
}

/// A single cell in the terminal grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    /// The character in this cell (space when blank)
    pub c: char,
    /// Foreground color
    pub fg: Color,
    /// Background color
    pub bg: Color,
    /// Text style attributes
    pub flags: CellFlags,
}

impl Default for Cell {
    fn default() -> Self {
        Self::BLANK
    }
}

impl Cell {
    /// Blank cell with default colors
    pub const BLANK: Cell = Cell {
        c: ' ',
        fg: Color::Default,
        bg: Color::Default,
        flags: CellFlags::empty(),
    };

    /// Create a new cell with a single character and default style
    pub fn new(c: char) -> Self {
        Self { c, ..Self::BLANK }
    }

    /// Blank cell keeping only a background color (erase semantics)
    pub fn erased(bg: Color) -> Self {
        Self { bg, ..Self::BLANK }
    }

    /// Check if this cell holds nothing visible
    pub fn is_blank(&self) -> bool {
        self.c == ' ' && self.bg == Color::Default && !self.flags.intersects(CellFlags::INVERSE)
    }

    /// The second half of a double-width character
    pub fn is_wide_spacer(&self) -> bool {
        self.flags.contains(CellFlags::WIDE_SPACER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_default() {
        let cell = Cell::default();
        assert!(cell.is_blank());
        assert_eq!(cell.fg, Color::Default);
        assert_eq!(cell.bg, Color::Default);
    }

    #[test]
    fn test_erased_keeps_background() {
        let cell = Cell::erased(Color::BLUE);
        assert_eq!(cell.c, ' ');
        assert_eq!(cell.bg, Color::BLUE);
        assert!(!cell.is_blank());
    }

    #[test]
    fn test_flag_bits() {
        assert_eq!(CellFlags::BOLD.bits(), 0x01);
        assert_eq!(CellFlags::STRIKETHROUGH.bits(), 0x20);
        let flags = CellFlags::BOLD | CellFlags::UNDERLINE;
        assert_eq!(flags.bits(), 0x05);
    }
}
