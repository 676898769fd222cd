//! Telnet command stream handling (RFC 854).
//!
//! Splits incoming bytes into data and commands. Option negotiation is
//! refused across the board, except NAWS which is answered with the
//! terminal size given at connect time.

use std::borrow::Cow;

use bytes::{BufMut, BytesMut};
use memchr::memchr;

pub const IAC: u8 = 255;
pub const DONT: u8 = 254;
pub const DO: u8 = 253;
pub const WONT: u8 = 252;
pub const WILL: u8 = 251;
pub const SB: u8 = 250;
pub const NOP: u8 = 241;
pub const SE: u8 = 240;

/// Negotiate About Window Size (RFC 1073).
pub const NAWS: u8 = 31;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Data,
    Iac,
    Option(u8),
    Sub,
    SubIac,
}

/// Incremental telnet decoder. State carries over between reads, so a
/// command split across two TCP segments is handled.
#[derive(Debug)]
pub struct TelnetCodec {
    state: State,
    window: (u16, u16),
    replies: BytesMut,
}

impl TelnetCodec {
    /// Codec that reports `width` x `height` if the server asks for NAWS.
    pub fn new(width: u32, height: u32) -> Self {
        let clamp = |v: u32| u16::try_from(v).unwrap_or(u16::MAX);
        Self {
            state: State::Data,
            window: (clamp(width), clamp(height)),
            replies: BytesMut::new(),
        }
    }

    /// Feed received bytes; returns the data bytes with commands removed.
    ///
    /// Negotiation answers are queued; collect them with
    /// [`take_replies`](Self::take_replies).
    pub fn decode(&mut self, input: &[u8]) -> BytesMut {
        let mut data = BytesMut::with_capacity(input.len());
        let mut rest = input;

        while !rest.is_empty() {
            if self.state == State::Data {
                match memchr(IAC, rest) {
                    Some(pos) => {
                        data.extend_from_slice(&rest[..pos]);
                        self.state = State::Iac;
                        rest = &rest[pos + 1..];
                    }
                    None => {
                        data.extend_from_slice(rest);
                        break;
                    }
                }
                continue;
            }

            let byte = rest[0];
            rest = &rest[1..];
            self.state = match self.state {
                State::Iac => match byte {
                    IAC => {
                        data.put_u8(IAC);
                        State::Data
                    }
                    DO | DONT | WILL | WONT => State::Option(byte),
                    SB => State::Sub,
                    _ => State::Data,
                },
                State::Option(verb) => {
                    self.answer(verb, byte);
                    State::Data
                }
                State::Sub => {
                    if byte == IAC {
                        State::SubIac
                    } else {
                        State::Sub
                    }
                }
                State::SubIac => match byte {
                    SE => State::Data,
                    _ => State::Sub,
                },
                State::Data => {
                    data.put_u8(byte);
                    State::Data
                }
            };
        }

        data
    }

    /// Take queued negotiation answers.
    pub fn take_replies(&mut self) -> Option<BytesMut> {
        if self.replies.is_empty() {
            None
        } else {
            Some(self.replies.split())
        }
    }

    fn answer(&mut self, verb: u8, option: u8) {
        match (verb, option) {
            (DO, NAWS) => {
                self.replies.extend_from_slice(&[IAC, WILL, NAWS]);
                self.replies.extend_from_slice(&[IAC, SB, NAWS]);
                let (width, height) = self.window;
                for byte in width.to_be_bytes().into_iter().chain(height.to_be_bytes()) {
                    self.replies.put_u8(byte);
                    if byte == IAC {
                        self.replies.put_u8(IAC);
                    }
                }
                self.replies.extend_from_slice(&[IAC, SE]);
            }
            (DO | DONT, _) => self.replies.extend_from_slice(&[IAC, WONT, option]),
            _ => self.replies.extend_from_slice(&[IAC, DONT, option]),
        }
    }
}

/// Double any literal 0xFF in outgoing data.
pub fn escape_iac(data: &[u8]) -> Cow<'_, [u8]> {
    if memchr(IAC, data).is_none() {
        return Cow::Borrowed(data);
    }
    let mut out = Vec::with_capacity(data.len() + 8);
    for &b in data {
        out.push(b);
        if b == IAC {
            out.push(IAC);
        }
    }
    Cow::Owned(out)
}

/// IAC NOP, sent three times in a row by the liveness probe.
pub const NOP_PROBE: [u8; 2] = [IAC, NOP];
