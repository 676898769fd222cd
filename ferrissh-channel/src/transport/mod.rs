//! Transport backends.
//!
//! Each backend implements [`Channel`] over one kind of connection.
//! [`AnyChannel`] picks one at runtime from a [`ChannelConfig`].

pub mod config;
pub(crate) mod connect;
mod serial;
mod ssh;
pub mod telnet;

pub use config::{
    AuthMethod, ChannelConfig, DataBits, FlowControl, HostKeyPolicy, Parity, SerialConfig,
    SshConfig, StopBits, TelnetConfig,
};
pub use serial::SerialChannel;
pub use ssh::SshChannel;
pub use telnet::TelnetChannel;

use crate::channel::{Channel, ChannelOptions, Protocol};
use crate::error::Result;

/// A channel over whichever transport the configuration names.
#[derive(Debug)]
pub enum AnyChannel {
    Telnet(TelnetChannel),
    Ssh(SshChannel),
    Serial(SerialChannel),
}

impl AnyChannel {
    /// Build the backend matching `config`. Nothing is opened yet.
    pub fn new(config: ChannelConfig, options: ChannelOptions) -> Self {
        match config {
            ChannelConfig::Telnet(config) => {
                AnyChannel::Telnet(TelnetChannel::new(config, options))
            }
            ChannelConfig::Ssh(config) => AnyChannel::Ssh(SshChannel::new(config, options)),
            ChannelConfig::Serial(config) => {
                AnyChannel::Serial(SerialChannel::new(config, options))
            }
        }
    }
}

impl From<TelnetChannel> for AnyChannel {
    fn from(channel: TelnetChannel) -> Self {
        AnyChannel::Telnet(channel)
    }
}

impl From<SshChannel> for AnyChannel {
    fn from(channel: SshChannel) -> Self {
        AnyChannel::Ssh(channel)
    }
}

impl From<SerialChannel> for AnyChannel {
    fn from(channel: SerialChannel) -> Self {
        AnyChannel::Serial(channel)
    }
}

macro_rules! dispatch {
    ($self:ident, $channel:ident => $body:expr) => {
        match $self {
            AnyChannel::Telnet($channel) => $body,
            AnyChannel::Ssh($channel) => $body,
            AnyChannel::Serial($channel) => $body,
        }
    };
}

impl Channel for AnyChannel {
    fn protocol(&self) -> Protocol {
        dispatch!(self, c => c.protocol())
    }

    fn device_type(&self) -> &str {
        dispatch!(self, c => c.device_type())
    }

    fn is_connected(&self) -> bool {
        dispatch!(self, c => c.is_connected())
    }

    async fn establish_connection(&mut self, width: u32, height: u32) -> Result<()> {
        dispatch!(self, c => c.establish_connection(width, height).await)
    }

    async fn login(&mut self) -> Result<()> {
        dispatch!(self, c => c.login().await)
    }

    async fn write_channel(&mut self, data: &str) -> Result<()> {
        dispatch!(self, c => c.write_channel(data).await)
    }

    async fn read_buffer(&mut self) -> Result<String> {
        dispatch!(self, c => c.read_buffer().await)
    }

    async fn close(&mut self) {
        dispatch!(self, c => c.close().await)
    }

    async fn is_alive(&mut self) -> bool {
        dispatch!(self, c => c.is_alive().await)
    }
}
