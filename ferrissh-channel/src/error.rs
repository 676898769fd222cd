//! Error types for ferrissh-channel.

use std::io;
use std::time::Duration;

use thiserror::Error;

/// Main error type for channel operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Connection establishment and authentication errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Read/write errors on an established channel
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl Error {
    /// The connection attempt failed or timed out (DNS, TCP, session race).
    pub fn is_connection_timeout(&self) -> bool {
        matches!(self, Error::Transport(TransportError::ConnectionTimeout { .. }))
    }

    /// Credentials or keys were rejected.
    pub fn is_authentication(&self) -> bool {
        matches!(self, Error::Transport(TransportError::Authentication { .. }))
    }

    /// A pattern read hit its deadline. The channel is still usable.
    pub fn is_pattern_timeout(&self) -> bool {
        matches!(self, Error::Channel(ChannelError::PatternTimeout { .. }))
    }

    /// The remote end closed the stream.
    pub fn is_stream_closed(&self) -> bool {
        matches!(self, Error::Channel(ChannelError::StreamClosed))
    }
}

/// Why a connection attempt failed, before it is folded into
/// [`TransportError::ConnectionTimeout`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectFailure {
    /// The hostname did not resolve.
    Dns,
    /// TCP connect failed or the handshake did not finish in time.
    Tcp,
    /// The session went away in the middle of the handshake or authentication.
    SessionRace,
}

/// Transport layer errors (connect, handshake, authentication).
#[derive(Error, Debug)]
pub enum TransportError {
    /// Could not reach the device.
    #[error("{message}")]
    ConnectionTimeout {
        cause: ConnectFailure,
        message: String,
    },

    /// The device rejected our credentials.
    #[error("{message}")]
    Authentication { message: String },

    /// SSH protocol error that we do not classify further
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    /// SSH key error
    #[error("SSH key error: {0}")]
    Key(String),

    /// Host is not in any loaded known_hosts data and strict checking is on
    #[error("Unknown host key for {host}:{port} (strict host key checking is enabled)")]
    HostKeyUnknown { host: String, port: u16 },

    /// Host key differs from the recorded one
    #[error("Host key for {host}:{port} has changed (known_hosts line {line})")]
    HostKeyChanged { host: String, port: u16, line: usize },

    /// Could not read known_hosts data
    #[error("known_hosts error: {0}")]
    KnownHosts(String),

    /// Serial port could not be opened or queried
    #[error("Serial port error: {0}")]
    Serial(#[from] tokio_serial::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Channel layer errors (reads, writes, pattern matching).
#[derive(Error, Debug)]
pub enum ChannelError {
    /// Pattern not seen before the deadline.
    #[error(
        "Timed-out reading channel, pattern not found in output: {pattern}\n\
         Data retrieved before timeout:\n\n{output}"
    )]
    PatternTimeout { pattern: String, output: String },

    /// Output never went quiet before the overall timeout.
    #[error(
        "Timed-out after {timeout:?} waiting for the channel to go quiet ({} bytes read)",
        output.len()
    )]
    TimingTimeout { timeout: Duration, output: String },

    /// The remote end closed the stream.
    #[error("Channel stream closed by remote device")]
    StreamClosed,

    /// A write did not complete within the blocking timeout.
    #[error("Write did not complete within {0:?}")]
    WriteTimeout(Duration),

    /// Failed to request pty or shell
    #[error("Failed to request interactive shell")]
    ShellRequestFailed,

    /// SSH protocol error on the channel
    #[error("Channel SSH error: {0}")]
    Ssh(russh::Error),

    /// Invalid regex pattern
    #[error("Invalid regex pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// I/O error on the underlying stream
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required field is missing or has an unusable value.
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },
}

/// Result type alias using ferrissh-channel's Error.
pub type Result<T> = std::result::Result<T, Error>;
