//! Scrollback buffer implementation
//!
//! The scrollback buffer stores rows that have scrolled off the top of the
//! visible screen. It's a ring buffer with a configurable maximum size;
//! once full, the oldest row is dropped for each new one.

use serde::{Deserialize, Serialize};

use super::row::Row;

/// Default number of history rows kept
pub const DEFAULT_SCROLLBACK_LINES: usize = 10_000;

/// Ring buffer for scrollback rows
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scrollback {
    /// Storage; grows up to `capacity`, then wraps
    rows: Vec<Row>,
    /// Index of the oldest row
    head: usize,
    /// Maximum number of rows to store
    capacity: usize,
}

impl Default for Scrollback {
    fn default() -> Self {
        Self::new(DEFAULT_SCROLLBACK_LINES)
    }
}

impl Scrollback {
    /// Create a new scrollback buffer; capacity 0 keeps no history
    pub fn new(capacity: usize) -> Self {
        Self {
            // Don't pre-allocate too much
            rows: Vec::with_capacity(capacity.min(1024)),
            head: 0,
            capacity,
        }
    }

    /// Number of rows held
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append a row. Returns the row that fell out (the oldest one, or
    /// `row` itself when history is disabled) so its storage can be reused.
    pub fn push(&mut self, row: Row) -> Option<Row> {
        if self.capacity == 0 {
            return Some(row);
        }
        if self.rows.len() < self.capacity {
            self.rows.push(row);
            return None;
        }
        let evicted = std::mem::replace(&mut self.rows[self.head], row);
        self.head = (self.head + 1) % self.capacity;
        Some(evicted)
    }

    /// Get a row by index (0 = oldest)
    pub fn get(&self, index: usize) -> Option<&Row> {
        if index >= self.rows.len() {
            return None;
        }
        self.rows.get((self.head + index) % self.rows.len())
    }

    /// Get a row counting back from the newest (0 = most recent)
    pub fn get_from_end(&self, index: usize) -> Option<&Row> {
        let len = self.rows.len();
        if index >= len {
            return None;
        }
        self.get(len - 1 - index)
    }

    pub fn clear(&mut self) {
        self.rows.clear();
        self.head = 0;
    }

    /// Iterate from oldest to newest
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Row> + '_ {
        let (newer, older) = self.rows.split_at(self.head);
        older.iter().chain(newer.iter())
    }

    /// Change capacity, keeping the most recent rows
    pub fn set_capacity(&mut self, capacity: usize) {
        let keep = self.rows.len().min(capacity);
        let mut rows: Vec<Row> = Vec::with_capacity(keep);
        let skip = self.rows.len() - keep;
        let head = self.head;
        let mut old = std::mem::take(&mut self.rows);
        old.rotate_left(head);
        rows.extend(old.into_iter().skip(skip));
        self.rows = rows;
        self.head = 0;
        self.capacity = capacity;
    }
}
