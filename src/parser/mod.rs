//! Terminal escape sequence parser
//!
//! A stateful parser that converts bytes into terminal actions.
//! Based on the VT500-series parser model from <https://vt100.net/emu/dec_ansi_parser>

mod action;
mod params;
mod state;
mod utf8;

pub use action::{
    Action, CharsetSlot, CsiAction, EscAction, Intermediates, OscAction, MAX_INTERMEDIATES,
};
pub use params::{Params, MAX_PARAMS};
pub use state::{Parser, ParserState, MAX_OSC_LEN};
pub use utf8::{Utf8Decoder, Utf8Result, REPLACEMENT_CHAR};
