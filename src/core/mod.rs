//! Terminal Core Module
//!
//! Platform-independent screen state. This module contains:
//! - Cells, colors and the palette that resolves them to RGB
//! - Rows with damage flags, the grid and its scrollback ring
//! - Cursor, pen and mode flags
//! - Deterministic snapshot generation
//!
//! Nothing here is synchronized; a single owner drives all mutation.

mod cell;
mod color;
mod cursor;
mod grid;
mod modes;
mod row;
mod scrollback;
mod snapshot;

pub use cell::{Cell, CellFlags};
pub use color::{Color, Palette, Rgb};
pub use cursor::{Cursor, Pen, SavedCursor};
pub use grid::{Grid, ScrollRegion};
pub use modes::Modes;
pub use row::Row;
pub use scrollback::{Scrollback, DEFAULT_SCROLLBACK_LINES};
pub use snapshot::{CellSnapshot, Snapshot};
