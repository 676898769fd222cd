//! Telnet channel.
//!
//! A plain TCP socket with the telnet command stream filtered out. Login
//! is handed to a [`Login`] collaborator once the socket is open.

mod protocol;

pub use protocol::TelnetCodec;

use std::io;
use std::sync::Arc;

use log::{debug, error};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

use self::protocol::{NOP_PROBE, escape_iac};
use super::config::TelnetConfig;
use super::connect::{Target, connect_tcp};
use crate::channel::{Channel, ChannelOptions, Decoder, Protocol};
use crate::error::{ChannelError, Result};
use crate::login::{Login, LoginParams, PromptLogin};

/// Largest single read from the socket.
const MAX_BUFFER: usize = 65535;

/// An open telnet connection.
struct TelnetConnection {
    stream: TcpStream,
    codec: TelnetCodec,
    decoder: Decoder,
    read_buf: Box<[u8]>,
}

/// Channel over telnet.
pub struct TelnetChannel<L: Login = PromptLogin> {
    config: TelnetConfig,
    options: ChannelOptions,
    login_handler: Arc<L>,
    addl_patterns: Vec<(String, String)>,
    conn: Option<TelnetConnection>,
}

impl TelnetChannel<PromptLogin> {
    /// Create a disconnected channel using [`PromptLogin`].
    pub fn new(config: TelnetConfig, options: ChannelOptions) -> Self {
        Self::with_login(config, options, PromptLogin::default())
    }
}

impl<L: Login> TelnetChannel<L> {
    /// Create a disconnected channel with a custom login collaborator.
    pub fn with_login(config: TelnetConfig, options: ChannelOptions, login: L) -> Self {
        Self {
            config,
            options,
            login_handler: Arc::new(login),
            addl_patterns: Vec::new(),
            conn: None,
        }
    }

    /// Answer `pattern` with `response` if it shows up during login.
    pub fn with_login_pattern(
        mut self,
        pattern: impl Into<String>,
        response: impl Into<String>,
    ) -> Self {
        self.addl_patterns.push((pattern.into(), response.into()));
        self
    }

    /// Get the configuration.
    pub fn config(&self) -> &TelnetConfig {
        &self.config
    }

    fn target(&self) -> Target<'_> {
        Target {
            device_type: &self.options.device_type,
            host: &self.config.host,
            port: self.config.port,
        }
    }
}

impl<L: Login> std::fmt::Debug for TelnetChannel<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelnetChannel")
            .field("target", &self.config.socket_addr())
            .field("device_type", &self.options.device_type)
            .field("connected", &self.conn.is_some())
            .finish()
    }
}

impl<L: Login> Channel for TelnetChannel<L> {
    fn protocol(&self) -> Protocol {
        Protocol::Telnet
    }

    fn device_type(&self) -> &str {
        &self.options.device_type
    }

    fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    async fn establish_connection(&mut self, width: u32, height: u32) -> Result<()> {
        self.close().await;

        let stream = connect_tcp(self.target(), self.config.timeout).await?;
        debug!("telnet connected to {}", self.config.socket_addr());

        self.conn = Some(TelnetConnection {
            stream,
            codec: TelnetCodec::new(width, height),
            decoder: self.options.encoding.decoder(),
            read_buf: vec![0u8; MAX_BUFFER].into_boxed_slice(),
        });

        if let Err(e) = self.login().await {
            self.close().await;
            return Err(e);
        }
        Ok(())
    }

    async fn login(&mut self) -> Result<()> {
        let handler = self.login_handler.clone();
        let mut params = LoginParams::from_config(&self.config);
        params.addl_patterns = self.addl_patterns.clone();
        handler.login(self, &params).await
    }

    async fn write_channel(&mut self, data: &str) -> Result<()> {
        let Some(conn) = self.conn.as_mut() else {
            return Ok(());
        };
        let encoded = self.options.encoding.encode(data);
        conn.stream
            .write_all(&escape_iac(&encoded))
            .await
            .map_err(ChannelError::Io)?;
        self.options.io.on_write(&encoded, data);
        Ok(())
    }

    async fn read_buffer(&mut self) -> Result<String> {
        let Some(conn) = self.conn.as_mut() else {
            return Ok(String::new());
        };

        // Segments holding only telnet commands yield no text; keep going
        // until there is some or the socket is drained.
        loop {
            let n = match conn.stream.try_read(&mut conn.read_buf[..]) {
                Ok(0) => {
                    let tail = conn.decoder.finish();
                    if tail.is_empty() {
                        return Err(ChannelError::StreamClosed.into());
                    }
                    self.options.io.on_read(&tail);
                    return Ok(tail);
                }
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(String::new()),
                Err(e) => return Err(ChannelError::Io(e).into()),
            };

            let data = conn.codec.decode(&conn.read_buf[..n]);
            if let Some(replies) = conn.codec.take_replies() {
                conn.stream
                    .write_all(&replies)
                    .await
                    .map_err(ChannelError::Io)?;
            }

            let text = conn.decoder.decode(&data);
            if !text.is_empty() {
                self.options.io.on_read(&text);
                return Ok(text);
            }
        }
    }

    async fn close(&mut self) {
        if let Some(mut conn) = self.conn.take() {
            // Races with the remote end closing first are expected here.
            if let Err(e) = conn.stream.shutdown().await {
                debug!("telnet close: {}", e);
            }
        }
    }

    async fn is_alive(&mut self) -> bool {
        let Some(conn) = self.conn.as_mut() else {
            error!("Connection is not initialised, is_alive returns false");
            return false;
        };

        debug!("Sending IAC + NOP");
        for _ in 0..3 {
            if let Err(e) = conn.stream.write_all(&NOP_PROBE).await {
                debug!("telnet liveness probe failed: {}", e);
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    use super::protocol::{DO, IAC, NAWS, NOP, WILL};
    use super::*;
    use crate::channel::ExpectFlags;

    /// Accepts one client and runs a canned login dialog, then echoes.
    async fn login_server() -> (u16, JoinHandle<Vec<u8>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let handle = tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut received = Vec::new();

            sock.write_all(&[IAC, DO, NAWS]).await.unwrap();
            sock.write_all(b"\r\nUser Access Verification\r\n\r\nUsername: ").await.unwrap();
            read_line(&mut sock, &mut received).await;
            sock.write_all(b"Password: ").await.unwrap();
            read_line(&mut sock, &mut received).await;
            sock.write_all(b"\r\nrouter#").await.unwrap();

            let mut buf = [0u8; 1024];
            loop {
                match sock.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        received.extend_from_slice(&buf[..n]);
                        if sock.write_all(&buf[..n]).await.is_err() {
                            break;
                        }
                    }
                }
            }
            received
        });

        (port, handle)
    }

    async fn read_line(sock: &mut TcpStream, received: &mut Vec<u8>) {
        let mut byte = [0u8; 1];
        loop {
            match sock.read(&mut byte).await {
                Ok(1) => {
                    received.push(byte[0]);
                    if byte[0] == b'\n' {
                        return;
                    }
                }
                _ => return,
            }
        }
    }

    fn channel(port: u16) -> TelnetChannel {
        let config = TelnetConfig::new("127.0.0.1", "admin", "s3cret")
            .port(port)
            .timeout(Duration::from_secs(5));
        TelnetChannel::new(config, ChannelOptions::new("cisco_ios_telnet"))
    }

    #[tokio::test]
    async fn test_login_and_echo() {
        let (port, server) = login_server().await;
        let mut channel = channel(port);

        channel.establish_connection(511, 1000).await.unwrap();
        assert!(channel.is_connected());

        channel.write_channel("show clock\n").await.unwrap();
        let output = channel
            .read_channel_expect("show clock", Duration::from_secs(5), ExpectFlags::NONE)
            .await
            .unwrap();
        assert!(output.contains("show clock"));

        channel.close().await;
        let received = server.await.unwrap();
        let text = String::from_utf8_lossy(&received);
        assert!(text.contains("admin\r\n"));
        assert!(text.contains("s3cret\r\n"));
        assert!(received.windows(3).any(|w| w == [IAC, WILL, NAWS]));
    }

    #[tokio::test]
    async fn test_write_then_read_round_trip() {
        let (port, _server) = login_server().await;
        let mut channel = channel(port);
        channel.establish_connection(80, 24).await.unwrap();

        channel.write_channel("terminal length 0\n").await.unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        let output = channel.read_channel().await.unwrap();

        assert_eq!(output, "terminal length 0\n");
        channel.close().await;
    }

    #[tokio::test]
    async fn test_never_opened() {
        let mut channel = channel(23);
        assert!(!channel.is_alive().await);
        assert_eq!(channel.read_buffer().await.unwrap(), "");
        channel.write_channel("ignored").await.unwrap();

        channel.close().await;
        channel.close().await;
        assert!(!channel.is_connected());
    }

    #[tokio::test]
    async fn test_is_alive_and_torn_down_socket() {
        let (port, _server) = login_server().await;
        let mut channel = channel(port);
        channel.establish_connection(80, 24).await.unwrap();
        assert!(channel.is_alive().await);

        // Break the write path underneath the channel.
        if let Some(conn) = channel.conn.as_mut() {
            conn.stream.shutdown().await.unwrap();
        }
        assert!(!channel.is_alive().await);

        channel.close().await;
        channel.close().await;
        assert!(!channel.is_connected());
        assert!(!channel.is_alive().await);
    }

    #[tokio::test]
    async fn test_remote_close_is_stream_closed() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            sock.write_all(b"router>").await.unwrap();
            tokio::time::sleep(Duration::from_millis(200)).await;
        });

        let mut channel = channel(port);
        channel.establish_connection(80, 24).await.unwrap();

        let err = channel
            .read_channel_expect("never", Duration::from_secs(5), ExpectFlags::NONE)
            .await
            .unwrap_err();
        assert!(err.is_stream_closed());
    }

    /// Shows a prompt, waits for one line, then runs `after` on the socket.
    async fn prompt_server<F, Fut>(after: F) -> u16
    where
        F: FnOnce(TcpStream) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            sock.write_all(b"router#").await.unwrap();
            read_line(&mut sock, &mut Vec::new()).await;
            after(sock).await;
        });
        port
    }

    #[tokio::test]
    async fn test_command_only_segment_does_not_end_read() {
        let port = prompt_server(|mut sock| async move {
            sock.write_all(&[IAC, NOP]).await.unwrap();
            tokio::time::sleep(Duration::from_millis(50)).await;
            sock.write_all(b"uptime is 3 weeks").await.unwrap();
            tokio::time::sleep(Duration::from_secs(1)).await;
        })
        .await;

        let mut channel = channel(port);
        channel.establish_connection(80, 24).await.unwrap();
        channel.write_channel("\n").await.unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;

        assert_eq!(channel.read_channel().await.unwrap(), "uptime is 3 weeks");
        channel.close().await;
    }

    #[tokio::test]
    async fn test_truncated_utf8_flushed_at_close() {
        let port = prompt_server(|mut sock| async move {
            sock.write_all(&[b'a', 0xc3]).await.unwrap();
        })
        .await;

        let mut channel = channel(port);
        channel.establish_connection(80, 24).await.unwrap();
        channel.write_channel("\n").await.unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;

        let mut output = String::new();
        let err = loop {
            match channel.read_buffer().await {
                Ok(text) if text.is_empty() => tokio::time::sleep(Duration::from_millis(10)).await,
                Ok(text) => output.push_str(&text),
                Err(e) => break e,
            }
        };
        assert_eq!(output, "a\u{fffd}");
        assert!(err.is_stream_closed());
    }

    #[tokio::test]
    async fn test_connection_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let mut channel = channel(port);
        let err = channel.establish_connection(80, 24).await.unwrap_err();
        assert!(err.is_connection_timeout());
        assert!(err.to_string().contains(&format!("127.0.0.1:{port}")));
        assert!(!channel.is_connected());
    }

    #[tokio::test]
    async fn test_login_failure_closes_channel() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut sink = Vec::new();
            for _ in 0..2 {
                sock.write_all(b"Username: ").await.unwrap();
                read_line(&mut sock, &mut sink).await;
                sock.write_all(b"Password: ").await.unwrap();
                read_line(&mut sock, &mut sink).await;
                sock.write_all(b"% Login invalid\r\n\r\n").await.unwrap();
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        });

        let mut channel = channel(port);
        let err = channel.establish_connection(80, 24).await.unwrap_err();
        assert!(err.is_authentication());
        assert!(!channel.is_connected());
    }
}
