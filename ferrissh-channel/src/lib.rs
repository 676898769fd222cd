//! # Ferrissh Channel
//!
//! Uniform async read/write/expect channels for network device automation.
//!
//! One [`Channel`] contract over three transports: SSH (via russh), telnet
//! and serial lines. Higher layers drive devices through that contract and
//! never touch the transport directly.
//!
//! ## Features
//!
//! - Pattern reads with regex flags and a timeout carrying the partial output
//! - Timing reads that return once the device goes quiet
//! - Telnet option negotiation with window size reporting
//! - SSH host key policies (system/alternate known_hosts, strict or
//!   accept-and-remember)
//! - Logging through the `log` facade and an optional session log sink
//! - Connection failures classified as DNS, TCP or session race
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use ferrissh_channel::channel::{DEFAULT_HEIGHT, DEFAULT_WIDTH};
//! use ferrissh_channel::{Channel, ChannelOptions, ExpectFlags, TelnetChannel, TelnetConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), ferrissh_channel::Error> {
//!     let config = TelnetConfig::new("192.168.1.1", "admin", "secret");
//!     let mut channel = TelnetChannel::new(config, ChannelOptions::new("cisco_ios_telnet"));
//!
//!     channel.establish_connection(DEFAULT_WIDTH, DEFAULT_HEIGHT).await?;
//!     channel.write_channel("show ip interface brief\n").await?;
//!
//!     let output = channel
//!         .read_channel_expect(r"#\s*$", Duration::from_secs(10), ExpectFlags::NONE)
//!         .await?;
//!     println!("{}", output);
//!
//!     channel.close().await;
//!     Ok(())
//! }
//! ```

pub mod channel;
pub mod error;
pub mod login;
pub mod transport;

// Re-export main types for convenience
pub use channel::{
    Channel, ChannelOptions, Encoding, ExpectFlags, IoLog, Protocol, SessionLog, TimingRead,
    strip_ansi,
};
pub use error::{ChannelError, ConfigError, ConnectFailure, Error, Result, TransportError};
pub use login::{Login, LoginParams, PromptLogin};
pub use transport::{
    AnyChannel, AuthMethod, ChannelConfig, HostKeyPolicy, SerialChannel, SerialConfig,
    SshChannel, SshConfig, TelnetChannel, TelnetConfig,
};
