//! The channel contract shared by every transport.
//!
//! A [`Channel`] is one interactive session over one transport. Backends
//! implement the raw primitives (`write_channel`, `read_buffer`, ...); the
//! pattern read and timing read are provided on top of those.

pub mod ansi;
mod buffer;
pub mod encoding;
pub mod expect;
pub mod instrument;
pub mod timing;

#[cfg(test)]
pub(crate) mod mock;

pub use ansi::strip_ansi;
pub use buffer::OutputBuffer;
pub use encoding::{Decoder, Encoding};
pub use expect::ExpectFlags;
pub use instrument::{IoLog, SessionLog};
pub use timing::TimingRead;

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;

/// Default terminal width requested on connect.
pub const DEFAULT_WIDTH: u32 = 511;

/// Default terminal height requested on connect.
pub const DEFAULT_HEIGHT: u32 = 1000;

/// Transport underneath a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Telnet,
    Ssh,
    Serial,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Protocol::Telnet => "telnet",
            Protocol::Ssh => "ssh",
            Protocol::Serial => "serial",
        })
    }
}

/// Settings common to every backend.
#[derive(Debug, Clone)]
pub struct ChannelOptions {
    /// Device type label used in error messages (e.g. `cisco_ios`).
    pub device_type: String,

    /// Codec for reads and writes.
    pub encoding: Encoding,

    /// Logging and session recording.
    pub io: IoLog,
}

impl ChannelOptions {
    /// Options for a device of the given type.
    pub fn new(device_type: impl Into<String>) -> Self {
        Self {
            device_type: device_type.into(),
            encoding: Encoding::default(),
            io: IoLog::default(),
        }
    }

    /// Set the text encoding.
    pub fn encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Replace the logging handle.
    pub fn io_log(mut self, io: IoLog) -> Self {
        self.io = io;
        self
    }

    /// Attach a session log.
    pub fn session_log(mut self, session_log: Arc<dyn SessionLog>) -> Self {
        self.io = self.io.with_session_log(session_log);
        self
    }
}

impl Default for ChannelOptions {
    fn default() -> Self {
        Self::new("generic")
    }
}

/// Uniform read/write/expect contract over a transport.
///
/// A channel is created disconnected. [`establish_connection`](Self::establish_connection)
/// connects it, [`close`](Self::close) returns it to the disconnected state
/// and may be called any number of times. All methods take `&mut self`: one
/// caller drives one channel at a time.
///
/// # Example
///
/// ```rust,no_run
/// use std::time::Duration;
/// use ferrissh_channel::channel::{DEFAULT_HEIGHT, DEFAULT_WIDTH};
/// use ferrissh_channel::{Channel, ChannelOptions, ExpectFlags, SshChannel, SshConfig};
///
/// # async fn example() -> Result<(), ferrissh_channel::Error> {
/// let config = SshConfig::new("192.168.1.1", "admin").password("secret");
/// let mut channel = SshChannel::new(config, ChannelOptions::new("cisco_ios"));
///
/// channel.establish_connection(DEFAULT_WIDTH, DEFAULT_HEIGHT).await?;
/// channel.write_channel("show version\n").await?;
/// let output = channel
///     .read_channel_expect(r"#\s*$", Duration::from_secs(10), ExpectFlags::NONE)
///     .await?;
/// println!("{}", output);
///
/// channel.close().await;
/// # Ok(())
/// # }
/// ```
pub trait Channel: Send {
    /// Transport this channel runs over.
    fn protocol(&self) -> Protocol;

    /// Device type label from the channel options.
    fn device_type(&self) -> &str;

    /// Whether the connection handle is present.
    fn is_connected(&self) -> bool;

    /// Open the transport, negotiate terminal size where the transport has
    /// one, and authenticate.
    ///
    /// On failure everything opened so far is closed before the error is
    /// returned.
    fn establish_connection(
        &mut self,
        width: u32,
        height: u32,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Authenticate over an already open transport.
    ///
    /// Only meaningful for telnet; SSH authenticates while connecting.
    fn login(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Encode and write `data` verbatim. No newline is added.
    ///
    /// Does nothing when the channel is not connected.
    fn write_channel(&mut self, data: &str) -> impl Future<Output = Result<()>> + Send;

    /// One non-blocking poll of the transport.
    ///
    /// Returns whatever is available right now, or an empty string. Returns
    /// [`ChannelError::StreamClosed`](crate::error::ChannelError::StreamClosed)
    /// if the remote end has closed the stream.
    fn read_buffer(&mut self) -> impl Future<Output = Result<String>> + Send;

    /// Drain everything that is available right now, with control sequences
    /// stripped.
    ///
    /// Polls [`read_buffer`](Self::read_buffer) until it comes back empty.
    /// If the stream closes after some data was drained, the data is returned
    /// and the close is reported by the next read.
    fn read_channel(&mut self) -> impl Future<Output = Result<String>> + Send {
        async move {
            let mut output = String::new();
            loop {
                match self.read_buffer().await {
                    Ok(data) if data.is_empty() => break,
                    Ok(data) => output.push_str(&data),
                    Err(e) if output.is_empty() => return Err(e),
                    Err(_) => break,
                }
            }
            Ok(strip_ansi(&output).into_owned())
        }
    }

    /// Read until `pattern` matches or `timeout` elapses.
    ///
    /// See [`expect::read_until_pattern`].
    fn read_channel_expect(
        &mut self,
        pattern: &str,
        timeout: Duration,
        flags: ExpectFlags,
    ) -> impl Future<Output = Result<String>> + Send {
        async move { expect::read_until_pattern(self, pattern, timeout, flags).await }
    }

    /// Read until the device goes quiet, using the default delays.
    ///
    /// See [`timing::read_until_quiet`].
    fn read_channel_timing(
        &mut self,
        delay_factor: f64,
        timeout: Duration,
    ) -> impl Future<Output = Result<String>> + Send {
        self.read_channel_timing_with(TimingRead::default(), delay_factor, timeout)
    }

    /// Read until the device goes quiet, using custom delays.
    fn read_channel_timing_with(
        &mut self,
        profile: TimingRead,
        delay_factor: f64,
        timeout: Duration,
    ) -> impl Future<Output = Result<String>> + Send {
        async move { timing::read_until_quiet(self, profile, delay_factor, timeout).await }
    }

    /// Release the connection. Never fails; the channel ends up disconnected.
    fn close(&mut self) -> impl Future<Output = ()> + Send;

    /// Best-effort liveness probe. `false` when disconnected or broken.
    fn is_alive(&mut self) -> impl Future<Output = bool> + Send;
}
