//! In-memory channel driven by a timed script, for tests.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::Instant;

use super::{Channel, ChannelOptions, Protocol};
use crate::error::{ChannelError, Result};

/// Releases each scripted chunk once its offset has elapsed, one chunk per
/// poll. Writes are echoed back immediately.
pub(crate) struct ScriptedChannel {
    options: ChannelOptions,
    start: Instant,
    script: VecDeque<(Duration, String)>,
    closed_at: Option<Duration>,
    connected: bool,
}

impl ScriptedChannel {
    pub(crate) fn new() -> Self {
        Self {
            options: ChannelOptions::new("mock"),
            start: Instant::now(),
            script: VecDeque::new(),
            closed_at: None,
            connected: true,
        }
    }

    pub(crate) fn at(mut self, offset: Duration, data: &str) -> Self {
        self.script.push_back((offset, data.to_string()));
        self
    }

    pub(crate) fn closed_at(mut self, offset: Duration) -> Self {
        self.closed_at = Some(offset);
        self
    }

    pub(crate) fn pending(&self) -> usize {
        self.script.len()
    }
}

impl Channel for ScriptedChannel {
    fn protocol(&self) -> Protocol {
        Protocol::Telnet
    }

    fn device_type(&self) -> &str {
        &self.options.device_type
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn establish_connection(&mut self, _width: u32, _height: u32) -> Result<()> {
        self.connected = true;
        Ok(())
    }

    async fn login(&mut self) -> Result<()> {
        Ok(())
    }

    async fn write_channel(&mut self, data: &str) -> Result<()> {
        if self.connected {
            let now = self.start.elapsed();
            self.script.push_back((now, data.to_string()));
            self.options.io.on_write(data.as_bytes(), data);
        }
        Ok(())
    }

    async fn read_buffer(&mut self) -> Result<String> {
        if !self.connected {
            return Ok(String::new());
        }
        let elapsed = self.start.elapsed();
        if let Some((offset, _)) = self.script.front() {
            if *offset <= elapsed {
                let (_, data) = self.script.pop_front().unwrap_or_default();
                self.options.io.on_read(&data);
                return Ok(data);
            }
        }
        if self.closed_at.is_some_and(|at| at <= elapsed) && self.script.is_empty() {
            return Err(ChannelError::StreamClosed.into());
        }
        Ok(String::new())
    }

    async fn close(&mut self) {
        self.connected = false;
    }

    async fn is_alive(&mut self) -> bool {
        self.connected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_then_read_round_trip() {
        let mut channel = ScriptedChannel::new();
        channel.write_channel("show clock\n").await.unwrap();
        assert_eq!(channel.read_channel().await.unwrap(), "show clock\n");
    }

    #[tokio::test]
    async fn test_read_channel_keeps_data_read_before_close() {
        let mut channel = ScriptedChannel::new()
            .at(Duration::ZERO, "bye\n")
            .closed_at(Duration::ZERO);

        let data = tokio_test::assert_ok!(channel.read_channel().await);
        assert_eq!(data, "bye\n");
        let err = tokio_test::assert_err!(channel.read_channel().await);
        assert!(err.is_stream_closed());
    }
}
