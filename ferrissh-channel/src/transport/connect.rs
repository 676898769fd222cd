//! TCP connection setup and failure messages shared by telnet and SSH.

use std::net::SocketAddr;
use std::time::Duration;

use log::debug;
use tokio::net::{TcpStream, lookup_host};

use crate::error::{ConnectFailure, Result, TransportError};

/// Who we are connecting to, for error messages.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Target<'a> {
    pub device_type: &'a str,
    pub host: &'a str,
    pub port: u16,
}

impl Target<'_> {
    /// Connection-timeout error for `cause`.
    pub(crate) fn connect_error(&self, cause: ConnectFailure, detail: &str) -> crate::Error {
        let Target {
            device_type,
            host,
            port,
        } = *self;
        let message = match cause {
            ConnectFailure::Dns => format!(
                "DNS failure--the hostname you provided was not resolvable in DNS: {host}:{port}"
            ),
            ConnectFailure::Tcp => format!(
                "TCP connection to device failed.\n\n\
                 Common causes of this problem are:\n\
                 1. Incorrect hostname or IP address.\n\
                 2. Wrong TCP port.\n\
                 3. Intermediate firewall blocking access.\n\n\
                 Device settings: {device_type} {host}:{port}\n\n{detail}"
            ),
            ConnectFailure::SessionRace => format!(
                "SSH session went away during connection setup to {device_type} {host}:{port}: \
                 try increasing 'conn_timeout' to 10 seconds or larger."
            ),
        };
        TransportError::ConnectionTimeout { cause, message }.into()
    }

    /// Authentication error carrying the underlying reason.
    pub(crate) fn auth_error(&self, detail: &str) -> crate::Error {
        let Target {
            device_type,
            host,
            port,
        } = *self;
        TransportError::Authentication {
            message: format!(
                "Authentication to device failed.\n\n\
                 Common causes of this problem are:\n\
                 1. Invalid username and password\n\
                 2. Incorrect SSH-key file\n\
                 3. Connecting to the wrong device\n\n\
                 Device settings: {device_type} {host}:{port}\n\n{detail}"
            ),
        }
        .into()
    }
}

/// Resolve and connect, bounded by `timeout`.
///
/// Resolution failures are reported as [`ConnectFailure::Dns`], everything
/// after that as [`ConnectFailure::Tcp`].
pub(crate) async fn connect_tcp(target: Target<'_>, timeout: Duration) -> Result<TcpStream> {
    let addrs: Vec<SocketAddr> = match lookup_host((target.host, target.port)).await {
        Ok(addrs) => addrs.collect(),
        Err(e) => {
            debug!("resolving {}:{} failed: {}", target.host, target.port, e);
            return Err(target.connect_error(ConnectFailure::Dns, &e.to_string()));
        }
    };
    if addrs.is_empty() {
        return Err(target.connect_error(ConnectFailure::Dns, "no addresses"));
    }

    let stream = match tokio::time::timeout(timeout, TcpStream::connect(addrs.as_slice())).await {
        Ok(Ok(stream)) => stream,
        Ok(Err(e)) => return Err(target.connect_error(ConnectFailure::Tcp, &e.to_string())),
        Err(_) => {
            let detail = format!("connect timed out after {timeout:?}");
            return Err(target.connect_error(ConnectFailure::Tcp, &detail));
        }
    };

    if let Err(e) = stream.set_nodelay(true) {
        debug!("set_nodelay failed: {}", e);
    }
    Ok(stream)
}
