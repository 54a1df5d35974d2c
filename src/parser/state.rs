//! Parser state machine
//!
//! Byte-at-a-time transition function over a small set of states. All
//! sequence state lives in the parser, so the stream may be cut anywhere:
//! feeding a buffer whole or in pieces produces the same actions.

use super::action::{Action, CsiAction, EscAction, Intermediates, OscAction};
use super::params::Params;
use super::utf8::{is_continuation, Utf8Decoder, Utf8Result, REPLACEMENT_CHAR};

/// Maximum length for OSC data; longer payloads are truncated
pub const MAX_OSC_LEN: usize = 65536;

const BEL: u8 = 0x07;
const CAN: u8 = 0x18;
const SUB: u8 = 0x1A;
const ESC: u8 = 0x1B;
const DEL: u8 = 0x7F;

/// Parser state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParserState {
    /// Normal text processing
    #[default]
    Ground,
    /// After ESC
    Escape,
    /// ESC followed by intermediate bytes
    EscapeIntermediate,
    /// After ESC [
    CsiEntry,
    /// Collecting CSI parameters
    CsiParam,
    /// Collecting CSI intermediate bytes
    CsiIntermediate,
    /// Malformed CSI, consumed up to its final byte
    CsiIgnore,
    /// After ESC ], collecting the command string
    OscString,
    /// DCS, APC, PM or SOS body, discarded up to its terminator
    StringIgnore,
}

/// The terminal parser
#[derive(Debug, Clone, Default)]
pub struct Parser {
    state: ParserState,
    utf8: Utf8Decoder,
    params: Params,
    intermediates: Intermediates,
    marker: Option<u8>,
    osc_data: Vec<u8>,
    /// ESC seen inside a string state; `\` completes ST
    string_esc: bool,
}

impl Parser {
    /// Create a new parser
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state
    pub fn state(&self) -> ParserState {
        self.state
    }

    /// Reset to ground, dropping any partial sequence
    pub fn reset(&mut self) {
        self.state = ParserState::Ground;
        self.utf8.reset();
        self.clear_sequence();
        self.osc_data.clear();
        self.string_esc = false;
    }

    /// Parse a chunk of bytes, invoking `callback` for each action
    pub fn parse<F: FnMut(Action)>(&mut self, data: &[u8], mut callback: F) {
        for &byte in data {
            self.advance(byte, &mut callback);
        }
    }

    /// Parse a chunk and collect the actions
    pub fn parse_collect(&mut self, data: &[u8]) -> Vec<Action> {
        let mut actions = Vec::new();
        self.parse(data, |action| actions.push(action));
        actions
    }

    fn advance<F: FnMut(Action)>(&mut self, byte: u8, callback: &mut F) {
        match self.state {
            ParserState::OscString | ParserState::StringIgnore => {
                return self.string_byte(byte, callback);
            },
            _ => {},
        }

        match byte {
            CAN | SUB => {
                self.utf8.reset();
                self.state = ParserState::Ground;
                return;
            },
            ESC => {
                self.utf8.reset();
                self.enter_escape();
                return;
            },
            0x00..=0x1F => {
                // Executes in place; an escape or CSI in progress continues
                self.utf8.reset();
                callback(Action::Execute(byte));
                return;
            },
            DEL => return,
            _ => {},
        }

        match self.state {
            ParserState::Ground => self.ground(byte, callback),
            ParserState::Escape => self.escape(byte, callback),
            ParserState::EscapeIntermediate => self.escape_intermediate(byte, callback),
            ParserState::CsiEntry | ParserState::CsiParam => self.csi_param(byte, callback),
            ParserState::CsiIntermediate => self.csi_intermediate(byte, callback),
            ParserState::CsiIgnore => {
                if (0x40..=0x7E).contains(&byte) {
                    self.state = ParserState::Ground;
                }
            },
            ParserState::OscString | ParserState::StringIgnore => {},
        }
    }

    fn ground<F: FnMut(Action)>(&mut self, byte: u8, callback: &mut F) {
        if self.utf8.is_pending() && !is_continuation(byte) {
            self.utf8.reset();
            callback(Action::Print(REPLACEMENT_CHAR));
        }
        match self.utf8.feed(byte) {
            Utf8Result::Pending => {},
            Utf8Result::Char(c) => callback(Action::Print(c)),
            Utf8Result::Invalid => callback(Action::Print(REPLACEMENT_CHAR)),
        }
    }

    fn enter_escape(&mut self) {
        self.clear_sequence();
        self.state = ParserState::Escape;
    }

    fn clear_sequence(&mut self) {
        self.params.clear();
        self.intermediates = Intermediates::default();
        self.marker = None;
    }

    fn escape<F: FnMut(Action)>(&mut self, byte: u8, callback: &mut F) {
        match byte {
            b'[' => {
                self.clear_sequence();
                self.state = ParserState::CsiEntry;
            },
            b']' => {
                self.osc_data.clear();
                self.string_esc = false;
                self.state = ParserState::OscString;
            },
            b'P' | b'X' | b'^' | b'_' => {
                self.string_esc = false;
                self.state = ParserState::StringIgnore;
            },
            0x20..=0x2F => {
                self.intermediates.push(byte);
                self.state = ParserState::EscapeIntermediate;
            },
            0x30..=0x7E => {
                self.state = ParserState::Ground;
                // ESC \ on its own is a stray string terminator
                if byte != b'\\' {
                    callback(Action::Esc(EscAction::from_bytes(Intermediates::default(), byte)));
                }
            },
            _ => self.state = ParserState::Ground,
        }
    }

    fn escape_intermediate<F: FnMut(Action)>(&mut self, byte: u8, callback: &mut F) {
        match byte {
            0x20..=0x2F => {
                self.intermediates.push(byte);
            },
            0x30..=0x7E => {
                self.state = ParserState::Ground;
                callback(Action::Esc(EscAction::from_bytes(self.intermediates, byte)));
            },
            _ => self.state = ParserState::Ground,
        }
    }

    fn csi_param<F: FnMut(Action)>(&mut self, byte: u8, callback: &mut F) {
        match byte {
            b'0'..=b'9' => {
                self.params.push_digit(byte - b'0');
                self.state = ParserState::CsiParam;
            },
            b';' => {
                self.params.separator();
                self.state = ParserState::CsiParam;
            },
            b':' => {
                self.params.subseparator();
                self.state = ParserState::CsiParam;
            },
            0x3C..=0x3F if self.state == ParserState::CsiEntry => {
                self.marker = Some(byte);
                self.state = ParserState::CsiParam;
            },
            0x20..=0x2F => {
                self.intermediates.push(byte);
                self.state = ParserState::CsiIntermediate;
            },
            0x40..=0x7E => self.dispatch_csi(byte, callback),
            _ => self.state = ParserState::CsiIgnore,
        }
    }

    fn csi_intermediate<F: FnMut(Action)>(&mut self, byte: u8, callback: &mut F) {
        match byte {
            0x20..=0x2F => {
                if !self.intermediates.push(byte) {
                    self.state = ParserState::CsiIgnore;
                }
            },
            0x40..=0x7E => self.dispatch_csi(byte, callback),
            _ => self.state = ParserState::CsiIgnore,
        }
    }

    fn dispatch_csi<F: FnMut(Action)>(&mut self, final_byte: u8, callback: &mut F) {
        self.params.finish();
        self.state = ParserState::Ground;
        callback(Action::Csi(CsiAction {
            params: self.params,
            intermediates: self.intermediates,
            final_byte,
            marker: self.marker,
        }));
    }

    /// OSC and ignored strings: only BEL, ST, CAN and SUB end them
    fn string_byte<F: FnMut(Action)>(&mut self, byte: u8, callback: &mut F) {
        if self.string_esc {
            self.string_esc = false;
            if byte == b'\\' {
                self.finish_string(callback);
                return;
            }
            // Any other byte after ESC abandons the string and starts a new escape
            self.osc_data.clear();
            self.enter_escape();
            return self.advance(byte, callback);
        }

        match byte {
            BEL => self.finish_string(callback),
            ESC => self.string_esc = true,
            CAN | SUB => {
                self.osc_data.clear();
                self.state = ParserState::Ground;
            },
            0x00..=0x1F | DEL => {},
            _ => {
                if self.state == ParserState::OscString && self.osc_data.len() < MAX_OSC_LEN {
                    self.osc_data.push(byte);
                }
            },
        }
    }

    fn finish_string<F: FnMut(Action)>(&mut self, callback: &mut F) {
        let was_osc = self.state == ParserState::OscString;
        self.state = ParserState::Ground;
        if was_osc {
            match OscAction::from_bytes(&self.osc_data) {
                Some(osc) => callback(Action::Osc(osc)),
                None => tracing::debug!("Malformed OSC dropped ({} bytes)", self.osc_data.len()),
            }
        }
        self.osc_data.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::CharsetSlot;

    fn parse(input: &[u8]) -> Vec<Action> {
        Parser::new().parse_collect(input)
    }

    fn csi(actions: &[Action]) -> &CsiAction {
        match actions {
            [Action::Csi(csi)] => csi,
            other => panic!("expected a single CSI, got {:?}", other),
        }
    }

    #[test]
    fn test_print() {
        assert_eq!(parse(b"Hi"), vec![Action::Print('H'), Action::Print('i')]);
    }

    #[test]
    fn test_control() {
        assert_eq!(parse(b"\r\n\x08\x00"), vec![
            Action::Execute(b'\r'),
            Action::Execute(b'\n'),
            Action::Execute(0x08),
            Action::Execute(0x00),
        ]);
    }

    #[test]
    fn test_csi_cursor() {
        let actions = parse(b"\x1b[10;20H");
        let csi = csi(&actions);
        assert!(csi.is(b'H'));
        assert_eq!(csi.param(0, 1), 10);
        assert_eq!(csi.param(1, 1), 20);
    }

    #[test]
    fn test_csi_private() {
        let actions = parse(b"\x1b[?1049h");
        let csi = csi(&actions);
        assert!(csi.is_private(b'h'));
        assert_eq!(csi.param(0, 0), 1049);
    }

    #[test]
    fn test_csi_intermediate() {
        let actions = parse(b"\x1b[2 q");
        let csi = csi(&actions);
        assert_eq!(csi.intermediates.as_slice(), b" ");
        assert_eq!(csi.final_byte, b'q');
    }

    #[test]
    fn test_control_inside_csi_executes_in_place() {
        assert_eq!(parse(b"\x1b[1\n0A").len(), 2);
        let actions = parse(b"\x1b[1\n0A");
        assert_eq!(actions[0], Action::Execute(b'\n'));
        match &actions[1] {
            Action::Csi(csi) => assert_eq!(csi.param(0, 1), 10),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_malformed_csi_is_ignored() {
        // Private marker in the middle of the parameters
        assert_eq!(parse(b"\x1b[1?2hX"), vec![Action::Print('X')]);
    }

    #[test]
    fn test_can_aborts_sequence() {
        assert_eq!(parse(b"\x1b[31\x18m"), vec![Action::Print('m')]);
    }

    #[test]
    fn test_esc_sequences() {
        assert_eq!(parse(b"\x1b7\x1b8\x1bM"), vec![
            Action::Esc(EscAction::SaveCursor),
            Action::Esc(EscAction::RestoreCursor),
            Action::Esc(EscAction::ReverseIndex),
        ]);
        assert_eq!(parse(b"\x1b(0"), vec![Action::Esc(EscAction::DesignateCharset {
            slot: CharsetSlot::G0,
            charset: b'0'
        })]);
    }

    #[test]
    fn test_osc_bel_and_st() {
        assert_eq!(parse(b"\x1b]0;bell\x07"), vec![Action::Osc(
            OscAction::SetIconAndTitle("bell".to_string())
        )]);
        assert_eq!(parse(b"\x1b]2;st\x1b\\"), vec![Action::Osc(OscAction::SetTitle(
            "st".to_string()
        ))]);
    }

    #[test]
    fn test_osc_utf8_title() {
        assert_eq!(parse("\x1b]2;héllo\x07".as_bytes()), vec![Action::Osc(
            OscAction::SetTitle("héllo".to_string())
        )]);
    }

    #[test]
    fn test_osc_abandoned_by_escape() {
        let actions = parse(b"\x1b]2;lost\x1b[AZ");
        assert_eq!(actions.len(), 2);
        assert!(matches!(&actions[0], Action::Csi(csi) if csi.is(b'A')));
        assert_eq!(actions[1], Action::Print('Z'));
    }

    #[test]
    fn test_dcs_is_discarded() {
        assert_eq!(parse(b"\x1bP1$r0m\x1b\\ok"), vec![
            Action::Print('o'),
            Action::Print('k')
        ]);
    }

    #[test]
    fn test_utf8_split_across_chunks() {
        let mut parser = Parser::new();
        assert!(parser.parse_collect(&[0xE4, 0xB8]).is_empty());
        assert_eq!(parser.parse_collect(&[0xAD]), vec![Action::Print('中')]);
    }

    #[test]
    fn test_invalid_utf8_resyncs() {
        assert_eq!(parse(&[0xE4, b'A']), vec![
            Action::Print(REPLACEMENT_CHAR),
            Action::Print('A')
        ]);
    }

    #[test]
    fn test_streaming_every_split() {
        let input: &[u8] = b"ab\x1b[1;31mred\x1b]2;t\x07\x1b(0q\r\n";
        let whole = parse(input);
        for split in 0..=input.len() {
            let mut parser = Parser::new();
            let mut actions = parser.parse_collect(&input[..split]);
            actions.extend(parser.parse_collect(&input[split..]));
            assert_eq!(actions, whole, "split at {}", split);
        }
    }

    #[test]
    fn test_state_tracking_and_reset() {
        let mut parser = Parser::new();
        parser.parse_collect(b"\x1b[12");
        assert_eq!(parser.state(), ParserState::CsiParam);
        parser.reset();
        assert_eq!(parser.state(), ParserState::Ground);
        assert_eq!(parser.parse_collect(b"m"), vec![Action::Print('m')]);
    }
}
