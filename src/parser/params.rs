//! CSI parameter accumulation
//!
//! Parameters are collected byte by byte while the parser sits in a CSI
//! state, so a sequence split across reads builds up the same list as one
//! delivered whole. Storage is inline; a dispatched `CsiAction` carries its
//! parameters without touching the heap.

use std::fmt;

/// Maximum number of parameters we'll track
pub const MAX_PARAMS: usize = 32;

/// Maximum number of values (parameters plus sub-parameters)
const MAX_VALUES: usize = 64;

/// CSI parameters
///
/// Each parameter is a group: a leading value followed by any
/// colon-separated sub-parameters (`38:2::255:0:0`). A value of 0 means
/// "default/unspecified".
#[derive(Clone, Copy)]
pub struct Params {
    values: [u16; MAX_VALUES],
    value_count: usize,
    /// Exclusive end index into `values` for each group
    ends: [u8; MAX_PARAMS],
    count: usize,
    current: u16,
    in_group: bool,
    trailing: bool,
    group_start: usize,
}

impl Params {
    /// Create empty params
    pub fn new() -> Self {
        Self {
            values: [0; MAX_VALUES],
            value_count: 0,
            ends: [0; MAX_PARAMS],
            count: 0,
            current: 0,
            in_group: false,
            trailing: false,
            group_start: 0,
        }
    }

    /// Parse a complete parameter string such as `1;2:3`
    pub fn parse(bytes: &[u8]) -> Self {
        let mut params = Self::new();
        for &byte in bytes {
            match byte {
                b'0'..=b'9' => params.push_digit(byte - b'0'),
                b';' => params.separator(),
                b':' => params.subseparator(),
                _ => {},
            }
        }
        params.finish();
        params
    }

    /// Create params from plain values (no sub-parameters)
    pub fn from_slice(values: &[u16]) -> Self {
        let mut params = Self::new();
        for &value in values {
            params.open();
            params.current = value;
            params.commit();
            params.close_group();
        }
        params
    }

    pub(crate) fn clear(&mut self) {
        *self = Self::new();
    }

    pub(crate) fn push_digit(&mut self, digit: u8) {
        self.open();
        self.current = self
            .current
            .saturating_mul(10)
            .saturating_add(digit as u16);
    }

    /// `;` ends the current parameter
    pub(crate) fn separator(&mut self) {
        self.open();
        self.commit();
        self.close_group();
        self.trailing = true;
    }

    /// `:` ends the current value but stays within the parameter
    pub(crate) fn subseparator(&mut self) {
        self.open();
        self.commit();
    }

    /// Close out whatever is in progress; called once at dispatch
    pub(crate) fn finish(&mut self) {
        if self.in_group || self.trailing {
            self.open();
            self.commit();
            self.close_group();
        }
        self.trailing = false;
    }

    fn open(&mut self) {
        if !self.in_group {
            self.in_group = true;
            self.trailing = false;
            self.group_start = self.value_count;
            self.current = 0;
        }
    }

    fn commit(&mut self) {
        if self.value_count < MAX_VALUES && self.count < MAX_PARAMS {
            self.values[self.value_count] = self.current;
            self.value_count += 1;
        }
        self.current = 0;
    }

    fn close_group(&mut self) {
        if self.count < MAX_PARAMS && self.value_count > self.group_start {
            self.ends[self.count] = self.value_count as u8;
            self.count += 1;
        }
        self.in_group = false;
    }

    fn group(&self, index: usize) -> &[u16] {
        if index >= self.count {
            return &[];
        }
        let start = if index == 0 {
            0
        } else {
            self.ends[index - 1] as usize
        };
        &self.values[start..self.ends[index] as usize]
    }

    /// Get parameter at index, returning None if not present or zero
    pub fn get(&self, index: usize) -> Option<u16> {
        Some(self.raw(index)).filter(|&v| v != 0)
    }

    /// Get parameter at index with default value for missing/zero
    pub fn get_or(&self, index: usize, default: u16) -> u16 {
        self.get(index).unwrap_or(default)
    }

    /// Get raw value at index (0 if not present)
    pub fn raw(&self, index: usize) -> u16 {
        self.group(index).first().copied().unwrap_or(0)
    }

    /// Get number of parameters
    pub fn len(&self) -> usize {
        self.count
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Sub-parameters following the value at `index`
    pub fn subparams(&self, index: usize) -> &[u16] {
        self.group(index).get(1..).unwrap_or(&[])
    }

    /// Iterate over parameter values
    pub fn iter(&self) -> impl Iterator<Item = u16> + '_ {
        (0..self.count).map(move |i| self.raw(i))
    }

    /// Iterate over whole groups (value followed by its sub-parameters)
    pub fn groups(&self) -> impl Iterator<Item = &[u16]> + '_ {
        (0..self.count).map(move |i| self.group(i))
    }
}

impl Default for Params {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Params {
    fn eq(&self, other: &Self) -> bool {
        self.count == other.count && self.groups().eq(other.groups())
    }
}

impl Eq for Params {}

impl fmt::Debug for Params {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.groups()).finish()
    }
}
