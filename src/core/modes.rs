//! SM/RM and DECSET/DECRST state
//!
//! Boolean modes toggled by SM/RM and DECSET/DECRST. Modes with side
//! effects on the screen (alternate screen, origin, cursor visibility) are
//! applied by the terminal; this struct only records them.

use serde::{Deserialize, Serialize};

/// Mode switches recorded from the byte stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modes {
    /// IRM (4) - characters shift right instead of overwriting
    pub insert_mode: bool,
    /// LNM (20) - LF also does CR
    pub linefeed_mode: bool,
    /// DECCKM (?1) - cursor keys send application sequences
    pub application_cursor_keys: bool,
    /// DECKPAM / DECKPNM
    pub application_keypad: bool,
    /// DECOM (?6) - cursor addressing relative to the scroll region
    pub origin_mode: bool,
    /// DECAWM (?7) - wrap at end of line
    pub auto_wrap: bool,
    /// DECTCEM (?25)
    pub cursor_visible: bool,
    /// ?47 / ?1047 / ?1049
    pub alternate_screen: bool,
    /// ?2004
    pub bracketed_paste: bool,
}

impl Default for Modes {
    fn default() -> Self {
        Self {
            insert_mode: false,
            linefeed_mode: false,
            application_cursor_keys: false,
            application_keypad: false,
            origin_mode: false,
            auto_wrap: true,
            cursor_visible: true,
            alternate_screen: false,
            bracketed_paste: false,
        }
    }
}

impl Modes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Back to power-on state (RIS / DECSTR)
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Record a DEC private mode. Returns false for modes not tracked here.
    pub fn set_dec_mode(&mut self, mode: u16, value: bool) -> bool {
        match mode {
            1 => self.application_cursor_keys = value,
            6 => self.origin_mode = value,
            7 => self.auto_wrap = value,
            25 => self.cursor_visible = value,
            47 | 1047 | 1049 => self.alternate_screen = value,
            2004 => self.bracketed_paste = value,
            _ => {
                tracing::debug!("Unknown DEC private mode: {}", mode);
                return false;
            },
        }
        true
    }

    /// Query a DEC private mode (`None` if not tracked)
    pub fn get_dec_mode(&self, mode: u16) -> Option<bool> {
        match mode {
            1 => Some(self.application_cursor_keys),
            6 => Some(self.origin_mode),
            7 => Some(self.auto_wrap),
            25 => Some(self.cursor_visible),
            47 | 1047 | 1049 => Some(self.alternate_screen),
            2004 => Some(self.bracketed_paste),
            _ => None,
        }
    }

    /// Record an ANSI mode (SM/RM). Returns false for unknown modes.
    pub fn set_ansi_mode(&mut self, mode: u16, value: bool) -> bool {
        match mode {
            4 => self.insert_mode = value,
            20 => self.linefeed_mode = value,
            _ => {
                tracing::debug!("Unknown ANSI mode: {}", mode);
                return false;
            },
        }
        true
    }
}
