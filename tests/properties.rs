//! Property-based invariant tests for the terminal core.
//!
//! Verifies:
//! 1. Split-feed equivalence: any split of a byte stream gives the same state
//! 2. Printable round-trip: short printable text lands verbatim in the row
//! 3. Damage idempotence: nothing is dirty after `mark_clean` until a mutation
//! 3b. Damage completeness: every row that changed after `mark_clean` is dirty
//! 4. The cursor stays inside the grid for any input and any resize
//! 5. History never grows past its capacity

use proptest::prelude::*;
use termgrid::core::Cell;
use termgrid::{Config, Terminal};

// ── Strategy helpers ──────────────────────────────────────────────────

/// Byte streams weighted toward control sequences so that splits land
/// inside escapes, parameters and multi-byte characters
fn arb_stream() -> impl Strategy<Value = Vec<u8>> {
    let fixed: &[&[u8]] = &[
        b"\x1b[",
        b"\x1b[1;31m",
        b"\x1b[38:2:1:2:3m",
        b"\x1b[2J",
        b"\x1b[5;10r",
        b"\x1b[?1049h",
        b"\x1b[?1049l",
        b"\x1b]0;title\x07",
        b"\x1b]2;other\x1b\\",
        b"\x1bP1$r\x1b\\",
        b"\x1b(0lqk\x1b(B",
        "\u{e9}\u{4e2d}\u{2713}".as_bytes(),
        b"\r\n",
        b"\x08\t\x0b",
        b"\x1b[3;3H",
        b"\x1b[L\x1b[2M\x1b[4@",
        b"\x18",
    ];
    let fixed: Vec<Vec<u8>> = fixed.iter().map(|bytes| bytes.to_vec()).collect();

    let fragment = prop_oneof![
        "[ -~]{1,12}".prop_map(String::into_bytes),
        prop::sample::select(fixed),
        any::<u8>().prop_map(|b| vec![b]),
    ];
    prop::collection::vec(fragment, 0..40).prop_map(|parts| parts.concat())
}

/// Every visible row's cells, for before/after comparison
fn screen_cells(term: &Terminal) -> Vec<Vec<Cell>> {
    (0..term.rows())
        .map(|row| term.get_row(row).map(<[Cell]>::to_vec).unwrap_or_default())
        .collect()
}

fn terminal(rows: usize, cols: usize) -> Terminal {
    let config = Config {
        scrollback_lines: 50,
        ..Config::default()
    };
    Terminal::with_config(rows, cols, &config)
}

proptest! {
    #[test]
    fn split_feed_is_equivalent(stream in arb_stream(), split in any::<prop::sample::Index>()) {
        let mut whole = terminal(8, 20);
        whole.feed(&stream);

        let k = split.index(stream.len() + 1);
        let mut parts = terminal(8, 20);
        parts.feed(&stream[..k]);
        parts.feed(&stream[k..]);

        prop_assert_eq!(whole.snapshot(), parts.snapshot());
        prop_assert_eq!(whole.take_events(), parts.take_events());
    }

    #[test]
    fn byte_at_a_time_is_equivalent(stream in arb_stream()) {
        let mut whole = terminal(6, 16);
        whole.feed(&stream);

        let mut single = terminal(6, 16);
        for byte in &stream {
            single.feed(std::slice::from_ref(byte));
        }

        prop_assert_eq!(whole.snapshot(), single.snapshot());
    }

    #[test]
    fn printable_text_round_trips(text in "[ -~]{0,79}") {
        let mut term = terminal(24, 80);
        term.feed(text.as_bytes());

        let row = term.get_row(0).expect("row 0");
        for (col, cell) in row.iter().enumerate() {
            let expected = text.as_bytes().get(col).map_or(' ', |&b| b as char);
            prop_assert_eq!(cell.c, expected);
        }
        prop_assert_eq!(term.cursor().col, text.len());
    }

    #[test]
    fn mark_clean_leaves_nothing_dirty(stream in arb_stream()) {
        let mut term = terminal(8, 20);
        term.feed(&stream);
        term.mark_clean();
        prop_assert_eq!(term.dirty_rows().count(), 0);

        term.feed(b"");
        let mut buf = [0u16; 8];
        prop_assert_eq!(term.dirty_rows_into(&mut buf), 0);
    }

    #[test]
    fn changed_rows_are_reported_dirty(before in arb_stream(), after in arb_stream()) {
        let mut term = terminal(8, 20);
        term.feed(&before);
        term.mark_clean();
        let old = screen_cells(&term);

        term.feed(&after);
        let new = screen_cells(&term);
        let dirty: Vec<usize> = term.dirty_rows().collect();
        for (row, (was, is)) in old.iter().zip(&new).enumerate() {
            if was != is {
                prop_assert!(dirty.contains(&row), "row {} changed but is not dirty", row);
            }
        }

        let mut buf = [0u16; 8];
        let n = term.dirty_rows_into(&mut buf);
        let reported: Vec<usize> = buf[..n].iter().map(|&r| usize::from(r)).collect();
        prop_assert_eq!(reported, dirty);
    }

    #[test]
    fn cursor_stays_in_bounds(
        stream in arb_stream(),
        rows in 1usize..40,
        cols in 1usize..120,
    ) {
        let mut term = terminal(24, 80);
        term.feed(&stream);
        term.resize(rows, cols);
        prop_assert!(term.cursor().row < rows);
        prop_assert!(term.cursor().col < cols);
        prop_assert_eq!(term.dirty_rows().count(), rows);

        term.feed(&stream);
        prop_assert!(term.cursor().row < term.rows());
        prop_assert!(term.cursor().col < term.cols());
    }

    #[test]
    fn history_is_bounded(lines in 0usize..300) {
        let mut term = terminal(4, 10);
        for i in 0..lines {
            term.feed(format!("{}\r\n", i).as_bytes());
        }
        prop_assert!(term.scrollback().len() <= 50);
        prop_assert_eq!(term.scrollback().len(), lines.saturating_sub(3).min(50));
    }
}
