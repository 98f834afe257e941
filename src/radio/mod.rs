//! # Radio Module
//!
//! Driver for the AMICCOM A7105 2.4GHz transceiver.
//!
//! This module handles:
//! - Register, strobe and FIFO access over 3-wire SPI
//! - Soft reset, register image loading and calibration
//! - Channel tuning and receive arming
//! - CRC status and packet read-out

pub mod driver;
pub mod regs;
pub mod transport;

pub use driver::{ChipMode, SpinLimit, A7105};
pub use transport::{ChipTransport, SpiChipTransport};
