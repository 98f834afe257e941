//! Trait abstraction for the DSM output port to enable testing

use async_trait::async_trait;
use std::io;

/// Byte sink the DSM writer task talks to
#[async_trait]
pub trait SerialPortIO: Send {
    /// Write a whole frame to the port
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()>;

    /// Wait until the frame has left the output buffer
    async fn flush(&mut self) -> io::Result<()>;
}

/// [`SerialPortIO`] over an opened `tokio_serial::SerialStream`
pub struct TokioSerialPort {
    port: tokio_serial::SerialStream,
}

impl TokioSerialPort {
    pub fn new(port: tokio_serial::SerialStream) -> Self {
        Self { port }
    }
}

#[async_trait]
impl SerialPortIO for TokioSerialPort {
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        use tokio::io::AsyncWriteExt;
        self.port.write_all(data).await
    }

    async fn flush(&mut self) -> io::Result<()> {
        use tokio::io::AsyncWriteExt;
        self.port.flush().await
    }
}
