//! Terminal control sequence stripping.
//!
//! Device output is run through a `vte` parser; printable characters and
//! line structure survive, everything else (CSI, OSC, DCS, stray C0
//! controls) is dropped.

use std::borrow::Cow;

use vte::{Params, Parser, Perform};

/// Strip terminal control sequences from `text`.
///
/// `\n`, `\r` and `\t` are kept. `ESC E` (next line) becomes a newline.
pub fn strip_ansi(text: &str) -> Cow<'_, str> {
    if !needs_stripping(text) {
        return Cow::Borrowed(text);
    }

    let mut collector = Collector {
        out: String::with_capacity(text.len()),
    };
    let mut parser = Parser::new();
    parser.advance(&mut collector, text.as_bytes());

    Cow::Owned(collector.out)
}

fn needs_stripping(text: &str) -> bool {
    text.bytes()
        .any(|b| b == 0x1b || (b < 0x20 && !matches!(b, b'\n' | b'\r' | b'\t')) || b == 0x7f)
}

struct Collector {
    out: String,
}

impl Perform for Collector {
    fn print(&mut self, c: char) {
        self.out.push(c);
    }

    fn execute(&mut self, byte: u8) {
        if matches!(byte, b'\n' | b'\r' | b'\t') {
            self.out.push(byte as char);
        }
    }

    fn esc_dispatch(&mut self, intermediates: &[u8], _ignore: bool, byte: u8) {
        if intermediates.is_empty() && byte == b'E' {
            self.out.push('\n');
        }
    }

    fn csi_dispatch(
        &mut self,
        _params: &Params,
        _intermediates: &[u8],
        _ignore: bool,
        _action: char,
    ) {
    }
}
