//! Pattern read: poll the channel until a regex matches or a deadline passes.

use std::time::Duration;

use log::debug;
use regex::{Regex, RegexBuilder};
use tokio::time::{Instant, sleep};

use super::Channel;
use super::buffer::OutputBuffer;
use crate::error::{ChannelError, Result};

/// Sleep between polls while waiting for a pattern.
pub const EXPECT_LOOP_SLEEP: Duration = Duration::from_millis(10);

/// Regex flags applied to a pattern read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExpectFlags {
    /// Match letters case-insensitively.
    pub case_insensitive: bool,
    /// `^` and `$` match at line boundaries.
    pub multi_line: bool,
    /// `.` also matches `\n`.
    pub dot_matches_new_line: bool,
}

impl ExpectFlags {
    /// No flags.
    pub const NONE: ExpectFlags = ExpectFlags {
        case_insensitive: false,
        multi_line: false,
        dot_matches_new_line: false,
    };

    /// Enable case-insensitive matching.
    pub fn ignore_case(mut self) -> Self {
        self.case_insensitive = true;
        self
    }

    /// Enable multi-line mode.
    pub fn multi_line(mut self) -> Self {
        self.multi_line = true;
        self
    }

    /// Let `.` match newlines.
    pub fn dot_all(mut self) -> Self {
        self.dot_matches_new_line = true;
        self
    }

    /// Compile `pattern` with these flags.
    pub fn compile(&self, pattern: &str) -> std::result::Result<Regex, regex::Error> {
        RegexBuilder::new(pattern)
            .case_insensitive(self.case_insensitive)
            .multi_line(self.multi_line)
            .dot_matches_new_line(self.dot_matches_new_line)
            .build()
    }
}

/// Read from `channel` until `pattern` matches the accumulated output.
///
/// Each iteration does one non-blocking [`Channel::read_buffer`] poll and
/// searches everything read so far. Returns as soon as the pattern
/// matches, without draining anything further. On timeout the error carries
/// the pattern and the partial output.
pub async fn read_until_pattern<C>(
    channel: &mut C,
    pattern: &str,
    timeout: Duration,
    flags: ExpectFlags,
) -> Result<String>
where
    C: Channel + ?Sized,
{
    let regex = flags.compile(pattern).map_err(ChannelError::from)?;
    debug!("Pattern is: {}", pattern);

    let deadline = Instant::now() + timeout;
    let mut output = OutputBuffer::new();

    loop {
        let data = channel.read_buffer().await?;
        output.push_str(&data);

        if output.is_match(&regex) {
            break;
        }

        if Instant::now() > deadline {
            return Err(ChannelError::PatternTimeout {
                pattern: pattern.to_string(),
                output: output.into_stripped(),
            }
            .into());
        }

        sleep(EXPECT_LOOP_SLEEP).await;
    }

    let output = output.into_stripped();
    debug!("Pattern found: {} {:?}", pattern, output);
    Ok(output)
}
