//! Streaming UTF-8 decoding for the parser
//!
//! Bytes of a multi-byte character can arrive in separate reads; the
//! decoder holds the partial sequence until it completes.

/// Replacement for malformed input
pub const REPLACEMENT_CHAR: char = '\u{FFFD}';

/// UTF-8 decoder state
#[derive(Debug, Clone, Copy, Default)]
pub struct Utf8Decoder {
    /// Code point bits accumulated so far
    codepoint: u32,
    /// Continuation bytes still expected
    remaining: u8,
    /// Total length of the sequence in progress
    width: u8,
}

/// Result of feeding a byte to the decoder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Utf8Result {
    /// Need more bytes
    Pending,
    /// Successfully decoded a character
    Char(char),
    /// Invalid sequence
    Invalid,
}

/// Whether `byte` continues a multi-byte sequence
pub fn is_continuation(byte: u8) -> bool {
    byte & 0b1100_0000 == 0b1000_0000
}

impl Utf8Decoder {
    /// Create a new decoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop any partial sequence
    pub fn reset(&mut self) {
        self.codepoint = 0;
        self.remaining = 0;
        self.width = 0;
    }

    /// Check if decoder is in the middle of a sequence
    pub fn is_pending(&self) -> bool {
        self.remaining > 0
    }

    /// Feed a byte to the decoder
    ///
    /// A non-continuation byte arriving mid-sequence is reported as
    /// `Invalid`; callers that want to keep that byte should check
    /// [`is_continuation`] first and reset.
    pub fn feed(&mut self, byte: u8) -> Utf8Result {
        if self.remaining == 0 {
            return match byte {
                0x00..=0x7F => Utf8Result::Char(byte as char),
                0xC2..=0xDF => self.start(byte & 0x1F, 2),
                0xE0..=0xEF => self.start(byte & 0x0F, 3),
                0xF0..=0xF4 => self.start(byte & 0x07, 4),
                // 0x80-0xC1 and 0xF5-0xFF never start a valid sequence
                _ => Utf8Result::Invalid,
            };
        }

        if !is_continuation(byte) {
            self.reset();
            return Utf8Result::Invalid;
        }

        self.codepoint = (self.codepoint << 6) | (byte & 0x3F) as u32;
        self.remaining -= 1;
        if self.remaining > 0 {
            return Utf8Result::Pending;
        }

        let cp = self.codepoint;
        let min = match self.width {
            2 => 0x80,
            3 => 0x800,
            _ => 0x10000,
        };
        self.reset();
        if cp < min {
            return Utf8Result::Invalid;
        }
        // Rejects surrogates and anything past U+10FFFF
        char::from_u32(cp)
            .map(Utf8Result::Char)
            .unwrap_or(Utf8Result::Invalid)
    }

    fn start(&mut self, bits: u8, width: u8) -> Utf8Result {
        self.codepoint = bits as u32;
        self.remaining = width - 1;
        self.width = width;
        Utf8Result::Pending
    }
}
