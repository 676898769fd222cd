//! Serial console channel using tokio-serial.

use std::io;

use log::debug;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_serial::{SerialPort, SerialPortBuilderExt, SerialStream};

use super::config::{DataBits, FlowControl, Parity, SerialConfig, StopBits};
use crate::channel::{Channel, ChannelOptions, Decoder, Protocol};
use crate::error::{ChannelError, Result, TransportError};

/// Largest single read from the port.
const MAX_BUFFER: usize = 65535;

struct SerialConnection {
    stream: SerialStream,
    decoder: Decoder,
}

/// Channel over a serial line.
///
/// There is no terminal size and no authentication on the line itself; a
/// console login prompt is the caller's business.
pub struct SerialChannel {
    config: SerialConfig,
    options: ChannelOptions,
    conn: Option<SerialConnection>,
}

impl SerialChannel {
    /// Create a closed channel.
    pub fn new(config: SerialConfig, options: ChannelOptions) -> Self {
        Self {
            config,
            options,
            conn: None,
        }
    }

    /// Get the configuration.
    pub fn config(&self) -> &SerialConfig {
        &self.config
    }

    fn open(&self) -> Result<SerialStream> {
        let stream = tokio_serial::new(self.config.port.as_str(), self.config.baud_rate)
            .data_bits(self.config.data_bits.into())
            .parity(self.config.parity.into())
            .stop_bits(self.config.stop_bits.into())
            .flow_control(self.config.flow_control.into())
            .timeout(self.config.timeout)
            .open_native_async()
            .map_err(TransportError::Serial)?;
        Ok(stream)
    }
}

impl std::fmt::Debug for SerialChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialChannel")
            .field("port", &self.config.port)
            .field("baud_rate", &self.config.baud_rate)
            .field("open", &self.conn.is_some())
            .finish()
    }
}

impl Channel for SerialChannel {
    fn protocol(&self) -> Protocol {
        Protocol::Serial
    }

    fn device_type(&self) -> &str {
        &self.options.device_type
    }

    fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    async fn establish_connection(&mut self, _width: u32, _height: u32) -> Result<()> {
        self.close().await;
        let stream = self.open()?;
        debug!(
            "serial port {} open at {} baud",
            self.config.port, self.config.baud_rate
        );
        self.conn = Some(SerialConnection {
            stream,
            decoder: self.options.encoding.decoder(),
        });
        Ok(())
    }

    async fn login(&mut self) -> Result<()> {
        Ok(())
    }

    async fn write_channel(&mut self, data: &str) -> Result<()> {
        let Some(conn) = self.conn.as_mut() else {
            return Ok(());
        };
        let encoded = self.options.encoding.encode(data);
        conn.stream.write_all(&encoded).await.map_err(ChannelError::Io)?;
        conn.stream.flush().await.map_err(ChannelError::Io)?;
        self.options.io.on_write(&encoded, data);
        Ok(())
    }

    async fn read_buffer(&mut self) -> Result<String> {
        let Some(conn) = self.conn.as_mut() else {
            return Ok(String::new());
        };

        let waiting = conn
            .stream
            .bytes_to_read()
            .map_err(|e| ChannelError::Io(io::Error::from(e)))?;
        if waiting == 0 {
            return Ok(String::new());
        }

        let mut buf = vec![0u8; (waiting as usize).min(MAX_BUFFER)];
        let n = conn.stream.read(&mut buf).await.map_err(ChannelError::Io)?;
        let text = if n == 0 {
            let tail = conn.decoder.finish();
            if tail.is_empty() {
                return Err(ChannelError::StreamClosed.into());
            }
            tail
        } else {
            conn.decoder.decode(&buf[..n])
        };
        self.options.io.on_read(&text);
        Ok(text)
    }

    async fn close(&mut self) {
        if let Some(mut conn) = self.conn.take() {
            if let Err(e) = conn.stream.flush().await {
                debug!("serial close: {}", e);
            }
        }
    }

    async fn is_alive(&mut self) -> bool {
        self.conn
            .as_ref()
            .is_some_and(|conn| conn.stream.bytes_to_read().is_ok())
    }
}

impl From<DataBits> for tokio_serial::DataBits {
    fn from(bits: DataBits) -> Self {
        match bits {
            DataBits::Five => tokio_serial::DataBits::Five,
            DataBits::Six => tokio_serial::DataBits::Six,
            DataBits::Seven => tokio_serial::DataBits::Seven,
            DataBits::Eight => tokio_serial::DataBits::Eight,
        }
    }
}

impl From<Parity> for tokio_serial::Parity {
    fn from(parity: Parity) -> Self {
        match parity {
            Parity::None => tokio_serial::Parity::None,
            Parity::Odd => tokio_serial::Parity::Odd,
            Parity::Even => tokio_serial::Parity::Even,
        }
    }
}

impl From<StopBits> for tokio_serial::StopBits {
    fn from(bits: StopBits) -> Self {
        match bits {
            StopBits::One => tokio_serial::StopBits::One,
            StopBits::Two => tokio_serial::StopBits::Two,
        }
    }
}

impl From<FlowControl> for tokio_serial::FlowControl {
    fn from(flow: FlowControl) -> Self {
        match flow {
            FlowControl::None => tokio_serial::FlowControl::None,
            FlowControl::Software => tokio_serial::FlowControl::Software,
            FlowControl::Hardware => tokio_serial::FlowControl::Hardware,
        }
    }
}
