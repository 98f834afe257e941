//! # Error Types
//!
//! Custom error types for the FlySky receiver using `thiserror`.
//!
//! Transient link conditions (CRC failures, identity mismatches, missed
//! packets) are never errors; they are absorbed by the receiver state
//! machine. Everything here is either a setup failure or fatal.

use thiserror::Error;

/// Main error type for the receiver
#[derive(Debug, Error)]
pub enum RxError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serial port errors (DSM output)
    #[error("Serial error: {0}")]
    Serial(String),

    /// None of the candidate serial devices could be opened
    #[error("No serial device found (tried: {0})")]
    SerialPortNotFound(String),

    /// SPI transfer to the radio chip failed
    #[error("Radio transport error: {0}")]
    Transport(String),

    /// GPIO access failed
    #[error("GPIO error: {0}")]
    Gpio(String),

    /// The chip never reported calibration completion
    #[error("A7105 calibration did not complete after {polls} polls")]
    CalibrationTimeout { polls: u32 },

    /// Register read-back does not match what was written
    #[error("A7105 not responding: wrote ID 0x{expected:08X}, read back 0x{actual:08X}")]
    ChipNotResponding { expected: u32, actual: u32 },

    /// Identity store asked to program more than one page
    #[error("Storage length {len} exceeds page size {capacity}")]
    StorageLength { len: usize, capacity: usize },
}

/// Result type alias for the receiver
pub type Result<T> = std::result::Result<T, RxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calibration_timeout_message() {
        let err = RxError::CalibrationTimeout { polls: 10 };
        assert_eq!(err.to_string(), "A7105 calibration did not complete after 10 polls");
    }

    #[test]
    fn test_chip_not_responding_message_is_hex() {
        let err = RxError::ChipNotResponding { expected: 0x5475C52A, actual: 0 };
        assert!(err.to_string().contains("0x5475C52A"));
        assert!(err.to_string().contains("0x00000000"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: RxError = io.into();
        assert!(matches!(err, RxError::Io(_)));
    }
}
