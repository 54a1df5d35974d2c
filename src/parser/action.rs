//! Parser output
//!
//! Each variant is one complete control function, already split into its
//! parameters; applying it is the terminal's job.

use super::params::Params;

/// Maximum number of intermediate bytes kept for a sequence
pub const MAX_INTERMEDIATES: usize = 4;

/// One decoded unit of the byte stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Graphic character to place at the cursor
    Print(char),

    /// Execute a C0 control byte (0x00-0x1F other than ESC, CAN, SUB)
    Execute(u8),

    /// Two- or three-byte escape
    Esc(EscAction),

    /// ESC [ ... final
    Csi(CsiAction),

    /// ESC ] ... ST/BEL
    Osc(OscAction),
}

/// Bytes 0x20..=0x2F before the final byte of an escape or control sequence
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct Intermediates {
    bytes: [u8; MAX_INTERMEDIATES],
    len: usize,
}

impl Intermediates {
    /// Append a byte; returns false once full
    pub(crate) fn push(&mut self, byte: u8) -> bool {
        if self.len == MAX_INTERMEDIATES {
            return false;
        }
        self.bytes[self.len] = byte;
        self.len += 1;
        true
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl std::fmt::Debug for Intermediates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", String::from_utf8_lossy(self.as_slice()))
    }
}

/// Character set slots addressable by ESC ( ) * +
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharsetSlot {
    G0,
    G1,
    G2,
    G3,
}

/// Escapes the terminal acts on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EscAction {
    /// DECSC
    SaveCursor,
    /// DECRC
    RestoreCursor,
    /// ESC D - Index (IND)
    Index,
    /// ESC M - Reverse Index (RI)
    ReverseIndex,
    /// ESC E - Next Line (NEL)
    NextLine,
    /// HTS
    HorizontalTabSet,
    /// RIS
    FullReset,
    /// DECKPAM
    ApplicationKeypad,
    /// DECKPNM
    NormalKeypad,
    /// ESC ( C and friends
    DesignateCharset { slot: CharsetSlot, charset: u8 },
    /// DECALN, fill with E
    DecAlignmentTest,
    /// Unknown ESC sequence
    Unknown {
        intermediates: Intermediates,
        final_byte: u8,
    },
}

impl EscAction {
    pub(crate) fn from_bytes(intermediates: Intermediates, final_byte: u8) -> Self {
        match (intermediates.as_slice(), final_byte) {
            ([], b'7') => EscAction::SaveCursor,
            ([], b'8') => EscAction::RestoreCursor,
            ([], b'D') => EscAction::Index,
            ([], b'M') => EscAction::ReverseIndex,
            ([], b'E') => EscAction::NextLine,
            ([], b'H') => EscAction::HorizontalTabSet,
            ([], b'c') => EscAction::FullReset,
            ([], b'=') => EscAction::ApplicationKeypad,
            ([], b'>') => EscAction::NormalKeypad,
            ([b'#'], b'8') => EscAction::DecAlignmentTest,
            ([slot @ (b'(' | b')' | b'*' | b'+')], charset) => EscAction::DesignateCharset {
                slot: match slot {
                    b'(' => CharsetSlot::G0,
                    b')' => CharsetSlot::G1,
                    b'*' => CharsetSlot::G2,
                    _ => CharsetSlot::G3,
                },
                charset,
            },
            _ => EscAction::Unknown {
                intermediates,
                final_byte,
            },
        }
    }
}

/// CSI sequence actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsiAction {
    /// Numeric parameters with colon subparameters
    pub params: Params,
    /// Bytes 0x20..=0x2F before the final byte
    pub intermediates: Intermediates,
    /// Dispatch byte, 0x40..=0x7E
    pub final_byte: u8,
    /// Private marker byte (`?`, `>`, `<`, `=`), if any
    pub marker: Option<u8>,
}

impl CsiAction {
    /// Parameter at `index`, with `default` for missing or zero
    pub fn param(&self, index: usize, default: u16) -> u16 {
        self.params.get_or(index, default)
    }

    /// Check if this is a specific plain CSI sequence
    pub fn is(&self, final_byte: u8) -> bool {
        self.final_byte == final_byte && self.intermediates.is_empty() && self.marker.is_none()
    }

    /// Check if this is a specific DEC private (`?`) CSI sequence
    pub fn is_private(&self, final_byte: u8) -> bool {
        self.final_byte == final_byte
            && self.intermediates.is_empty()
            && self.marker == Some(b'?')
    }
}

/// OSC sequence actions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OscAction {
    /// OSC 0
    SetIconAndTitle(String),
    /// OSC 1 - Set icon name
    SetIconName(String),
    /// OSC 2
    SetTitle(String),
    /// OSC 7 - Working directory, usually a `file://host/path` URI
    SetWorkingDirectory(String),
    /// Any other numbered command
    Unknown { command: u16, data: String },
}

impl OscAction {
    /// Build from a raw `cmd;payload` string; `None` if the command
    /// number is missing or malformed
    pub(crate) fn from_bytes(data: &[u8]) -> Option<Self> {
        let (command, payload) = match data.iter().position(|&b| b == b';') {
            Some(split) => (&data[..split], &data[split + 1..]),
            None => (data, &[][..]),
        };
        if command.is_empty() || !command.iter().all(u8::is_ascii_digit) {
            return None;
        }
        let command = command.iter().fold(0u16, |acc, &b| {
            acc.saturating_mul(10).saturating_add((b - b'0') as u16)
        });
        let payload = String::from_utf8_lossy(payload).into_owned();

        Some(match command {
            0 => OscAction::SetIconAndTitle(payload),
            1 => OscAction::SetIconName(payload),
            2 => OscAction::SetTitle(payload),
            7 => OscAction::SetWorkingDirectory(payload),
            _ => OscAction::Unknown {
                command,
                data: payload,
            },
        })
    }
}
