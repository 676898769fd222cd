//! Connection configuration for each transport.
//!
//! Every record derives `Deserialize` so callers can load it from their own
//! config files. Durations are given in (fractional) seconds.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use serde::Deserialize;

/// Host key verification flags for SSH.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HostKeyPolicy {
    /// Consult the user's `~/.ssh/known_hosts`.
    pub system_host_keys: bool,

    /// Consult `alt_key_file` (skipped if the file does not exist).
    pub alt_host_keys: bool,

    /// Alternate known_hosts file.
    pub alt_key_file: Option<PathBuf>,

    /// Reject hosts that are not in any loaded known_hosts data.
    ///
    /// When off, unknown hosts are accepted and remembered for the
    /// lifetime of the channel.
    pub ssh_strict: bool,
}

/// SSH connection configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SshConfig {
    /// Target host (hostname or IP address).
    pub host: String,

    /// SSH port (default: 22).
    pub port: u16,

    /// Username for authentication.
    pub username: String,

    /// Password authentication.
    #[serde(deserialize_with = "serde_helpers::opt_secret")]
    pub password: Option<SecretString>,

    /// Private key authentication.
    pub key_file: Option<PathBuf>,

    /// Passphrase for an encrypted `key_file`.
    #[serde(deserialize_with = "serde_helpers::opt_secret")]
    pub passphrase: Option<SecretString>,

    /// Bound on TCP connect plus SSH handshake.
    #[serde(with = "serde_helpers::secs")]
    pub conn_timeout: Duration,

    /// Bound on every write to the interactive shell (default: 20s).
    #[serde(with = "serde_helpers::secs")]
    pub blocking_timeout: Duration,

    /// Transport keepalive interval. Zero disables keepalives.
    #[serde(with = "serde_helpers::secs")]
    pub keepalive: Duration,

    /// Host key verification.
    pub host_keys: HostKeyPolicy,

    /// Terminal type requested for the pty.
    pub terminal_type: String,
}

impl SshConfig {
    /// Configuration for `username@host:22` with defaults everywhere else.
    pub fn new(host: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            username: username.into(),
            ..Self::default()
        }
    }

    /// Set the SSH port.
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Use password authentication.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(SecretString::from(password.into()));
        self
    }

    /// Use private key authentication.
    pub fn key_file(mut self, path: impl Into<PathBuf>, passphrase: Option<String>) -> Self {
        self.key_file = Some(path.into());
        self.passphrase = passphrase.map(SecretString::from);
        self
    }

    /// Set the connect timeout.
    pub fn conn_timeout(mut self, timeout: Duration) -> Self {
        self.conn_timeout = timeout;
        self
    }

    /// Set the write timeout on the interactive shell.
    pub fn blocking_timeout(mut self, timeout: Duration) -> Self {
        self.blocking_timeout = timeout;
        self
    }

    /// Set the keepalive interval (zero disables).
    pub fn keepalive(mut self, interval: Duration) -> Self {
        self.keepalive = interval;
        self
    }

    /// Set the host key policy.
    pub fn host_keys(mut self, policy: HostKeyPolicy) -> Self {
        self.host_keys = policy;
        self
    }

    /// Get the socket address for connection.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The authentication method implied by the configured credentials.
    ///
    /// A key file wins over a password. With neither, the "none" method is
    /// used (devices being provisioned often accept it).
    pub fn auth_method(&self) -> AuthMethod {
        if let Some(path) = &self.key_file {
            AuthMethod::PrivateKey {
                path: path.clone(),
                passphrase: self.passphrase.clone(),
            }
        } else if let Some(password) = &self.password {
            AuthMethod::Password(password.clone())
        } else {
            AuthMethod::None
        }
    }
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 22,
            username: String::new(),
            password: None,
            key_file: None,
            passphrase: None,
            conn_timeout: Duration::from_secs(10),
            blocking_timeout: Duration::from_secs(20),
            keepalive: Duration::ZERO,
            host_keys: HostKeyPolicy::default(),
            terminal_type: "vt100".to_string(),
        }
    }
}

/// Authentication method for SSH connections.
#[derive(Debug, Clone)]
pub enum AuthMethod {
    /// "none" authentication.
    None,

    /// Password authentication.
    Password(SecretString),

    /// Private key authentication.
    PrivateKey {
        /// Path to the private key file.
        path: PathBuf,
        /// Optional passphrase for encrypted keys.
        passphrase: Option<SecretString>,
    },
}

/// Telnet connection configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TelnetConfig {
    /// Target host (hostname or IP address).
    pub host: String,

    /// Telnet port (default: 23).
    pub port: u16,

    /// Username sent at the username prompt.
    pub username: String,

    /// Password sent at the password prompt.
    #[serde(deserialize_with = "serde_helpers::secret")]
    pub password: SecretString,

    /// Bound on the TCP connect and on the whole login dialog.
    #[serde(with = "serde_helpers::secs")]
    pub timeout: Duration,

    /// Regex identifying the username prompt.
    pub username_pattern: String,

    /// Regex identifying the password prompt.
    pub password_pattern: String,

    /// Character ending the device prompt (e.g. `#`).
    pub pri_prompt_terminator: String,

    /// Alternate prompt terminator (e.g. `>`).
    pub alt_prompt_terminator: String,
}

impl TelnetConfig {
    /// Configuration for `host:23` with defaults everywhere else.
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            username: username.into(),
            password: SecretString::from(password.into()),
            ..Self::default()
        }
    }

    /// Set the telnet port.
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the connect/login timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the prompt terminators.
    pub fn prompt_terminators(
        mut self,
        primary: impl Into<String>,
        alternate: impl Into<String>,
    ) -> Self {
        self.pri_prompt_terminator = primary.into();
        self.alt_prompt_terminator = alternate.into();
        self
    }

    /// Get the socket address for connection.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for TelnetConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 23,
            username: String::new(),
            password: SecretString::from(String::new()),
            timeout: Duration::from_secs(20),
            username_pattern: r"(?:user:|username|login|user name)".to_string(),
            password_pattern: r"assword".to_string(),
            pri_prompt_terminator: "#".to_string(),
            alt_prompt_terminator: ">".to_string(),
        }
    }
}

/// Number of data bits per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum DataBits {
    Five,
    Six,
    Seven,
    #[default]
    Eight,
}

/// Parity checking mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    #[default]
    None,
    Odd,
    Even,
}

/// Number of stop bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum StopBits {
    #[default]
    One,
    Two,
}

/// Flow control mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowControl {
    #[default]
    None,
    Software,
    Hardware,
}

/// Serial line configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Device path (`/dev/ttyUSB0`, `COM3`).
    pub port: String,

    /// Line speed.
    pub baud_rate: u32,

    pub data_bits: DataBits,

    pub parity: Parity,

    pub stop_bits: StopBits,

    pub flow_control: FlowControl,

    /// Driver-level read/write timeout.
    #[serde(with = "serde_helpers::secs")]
    pub timeout: Duration,
}

impl SerialConfig {
    /// 8N1 at `baud_rate` on `port`.
    pub fn new(port: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            port: port.into(),
            baud_rate,
            ..Self::default()
        }
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: String::new(),
            baud_rate: 9600,
            data_bits: DataBits::default(),
            parity: Parity::default(),
            stop_bits: StopBits::default(),
            flow_control: FlowControl::default(),
            timeout: Duration::from_secs(1),
        }
    }
}

/// Configuration for any backend, tagged by protocol.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "protocol", rename_all = "lowercase")]
pub enum ChannelConfig {
    Telnet(TelnetConfig),
    Ssh(SshConfig),
    Serial(SerialConfig),
}

mod serde_helpers {
    use std::time::Duration;

    use secrecy::SecretString;
    use serde::{Deserialize, Deserializer, de};

    pub mod secs {
        use super::*;

        pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
            let secs = f64::deserialize(d)?;
            Duration::try_from_secs_f64(secs).map_err(de::Error::custom)
        }
    }

    pub fn secret<'de, D: Deserializer<'de>>(d: D) -> Result<SecretString, D::Error> {
        String::deserialize(d).map(SecretString::from)
    }

    pub fn opt_secret<'de, D: Deserializer<'de>>(d: D) -> Result<Option<SecretString>, D::Error> {
        Ok(Option::<String>::deserialize(d)?.map(SecretString::from))
    }
}
