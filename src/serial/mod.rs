//! # Serial Communication Module
//!
//! Handles the DSM serial link to the flight controller.
//!
//! This module handles:
//! - Opening the serial port at 115,200 baud 8N1
//! - Handing frames from the receive loop to an async writer task
//! - Reporting the in-flight frame back through a busy flag

pub mod port_trait;
pub mod writer;

use crate::dsm::protocol::DSM_BAUD_RATE;
use crate::error::{Result, RxError};
use tracing::{debug, info, warn};

pub use port_trait::{SerialPortIO, TokioSerialPort};
pub use writer::{spawn_writer, SerialOutput};

/// DSM Serial Port Handler
///
/// Owns the opened port until it is handed to the writer task.
pub struct DsmSerial {
    /// Serial port handle
    port: tokio_serial::SerialStream,
    /// Device path (e.g., /dev/ttyAMA0)
    device_path: String,
}

impl std::fmt::Debug for DsmSerial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DsmSerial")
            .field("device_path", &self.device_path)
            .finish_non_exhaustive()
    }
}

impl DsmSerial {
    /// Open the DSM output port, trying each path in order
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Arguments
    ///
    /// * `paths` - Device paths to try (e.g., &["/dev/ttyAMA0"])
    ///
    /// # Returns
    ///
    /// * `Result<DsmSerial>` - Opened serial port or error
    ///
    /// # Errors
    ///
    /// Returns `SerialPortNotFound` if none of the paths can be opened
    pub fn open_with_paths(paths: &[&str]) -> Result<Self> {
        for path in paths {
            debug!("Trying to open serial port: {}", path);

            match Self::open_port(path) {
                Ok(port) => {
                    info!("Opened DSM output at {} ({} baud)", path, DSM_BAUD_RATE);
                    return Ok(Self {
                        port,
                        device_path: path.to_string(),
                    });
                }
                Err(e) => {
                    warn!("Failed to open {}: {}", path, e);
                    continue;
                }
            }
        }

        Err(RxError::SerialPortNotFound(paths.join(", ")))
    }

    /// Open a specific serial port with DSM settings
    fn open_port(path: &str) -> Result<tokio_serial::SerialStream> {
        use tokio_serial::SerialPortBuilderExt;

        let port = tokio_serial::new(path, DSM_BAUD_RATE)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| RxError::Serial(format!("Failed to open {}: {}", path, e)))?;

        Ok(port)
    }

    /// Get the device path of the opened serial port
    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    /// Wrap the port for the writer task
    pub fn into_port(self) -> TokioSerialPort {
        TokioSerialPort::new(self.port)
    }
}
