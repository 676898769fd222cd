//! Text codec for channel I/O.
//!
//! Writes are encoded with the configured [`Encoding`]; reads are decoded
//! through a [`Decoder`] that never fails. Undecodable bytes become U+FFFD.

use std::borrow::Cow;

use serde::Deserialize;

/// Character encoding used in both directions on a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    /// UTF-8. Multi-byte characters split across reads are reassembled.
    #[default]
    Utf8,
    /// 7-bit ASCII. Characters outside the range are written as `?`.
    Ascii,
    /// ISO-8859-1. Every byte maps to one character.
    Latin1,
}

impl Encoding {
    /// Encode `text` for the wire.
    pub fn encode<'a>(&self, text: &'a str) -> Cow<'a, [u8]> {
        match self {
            Encoding::Utf8 => Cow::Borrowed(text.as_bytes()),
            Encoding::Ascii if text.is_ascii() => Cow::Borrowed(text.as_bytes()),
            Encoding::Ascii => Cow::Owned(
                text.chars()
                    .map(|c| if c.is_ascii() { c as u8 } else { b'?' })
                    .collect(),
            ),
            Encoding::Latin1 if text.is_ascii() => Cow::Borrowed(text.as_bytes()),
            Encoding::Latin1 => Cow::Owned(
                text.chars()
                    .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
                    .collect(),
            ),
        }
    }

    /// A fresh streaming decoder for this encoding.
    pub fn decoder(&self) -> Decoder {
        Decoder {
            encoding: *self,
            pending: Vec::new(),
        }
    }
}

/// Incremental, lossy decoder.
///
/// Holds back an incomplete UTF-8 sequence at the end of a chunk until the
/// next chunk arrives.
#[derive(Debug, Clone)]
pub struct Decoder {
    encoding: Encoding,
    pending: Vec<u8>,
}

impl Decoder {
    /// Decode the next chunk of bytes.
    pub fn decode(&mut self, bytes: &[u8]) -> String {
        match self.encoding {
            Encoding::Utf8 => self.decode_utf8(bytes),
            Encoding::Ascii => bytes
                .iter()
                .map(|&b| if b.is_ascii() { b as char } else { char::REPLACEMENT_CHARACTER })
                .collect(),
            Encoding::Latin1 => bytes.iter().map(|&b| b as char).collect(),
        }
    }

    /// Flush whatever is held back, replacing it with U+FFFD.
    pub fn finish(&mut self) -> String {
        let rest = std::mem::take(&mut self.pending);
        String::from_utf8_lossy(&rest).into_owned()
    }

    fn decode_utf8(&mut self, bytes: &[u8]) -> String {
        let joined;
        let input: &[u8] = if self.pending.is_empty() {
            bytes
        } else {
            let mut buf = std::mem::take(&mut self.pending);
            buf.extend_from_slice(bytes);
            joined = buf;
            &joined
        };

        let mut out = String::with_capacity(input.len());
        let mut rest = input;
        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    out.push_str(valid);
                    break;
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    out.push_str(&String::from_utf8_lossy(valid));
                    match e.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        None => {
                            // Truncated sequence at the end of the chunk.
                            self.pending.extend_from_slice(after);
                            break;
                        }
                    }
                }
            }
        }
        out
    }
}
