//! # A7105 Radio Driver
//!
//! Chip-level operations on top of a [`ChipTransport`].
//!
//! The chip has no readable mode register, so the driver mirrors the mode
//! implied by the last strobe in [`ChipMode`]. Call-order violations trip
//! `debug_assert!`s in development builds and change nothing at runtime.

use tracing::{debug, info, warn};

use super::regs::*;
use super::transport::ChipTransport;
use crate::error::{Result, RxError};
use crate::protocol::frame::{InboundFrame, INBOUND_FRAME_LEN};

/// Mode the chip is in after the last operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChipMode {
    /// Power-on or just soft-reset
    Idle,
    Standby,
    Calibrating,
    Receiving,
}

/// Upper bound on busy-wait polls; `None` spins until the hardware answers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpinLimit(pub Option<u32>);

impl SpinLimit {
    pub const UNBOUNDED: SpinLimit = SpinLimit(None);

    /// Poll `done` until it returns true or the limit runs out
    ///
    /// Returns the number of polls spent, or `None` when the limit was hit.
    pub fn spin<F>(self, mut done: F) -> Result<Option<u32>>
    where
        F: FnMut() -> Result<bool>,
    {
        let mut polls: u32 = 0;
        loop {
            if done()? {
                return Ok(Some(polls));
            }
            polls = polls.saturating_add(1);
            if let Some(max) = self.0 {
                if polls >= max {
                    return Ok(None);
                }
            }
            std::hint::spin_loop();
        }
    }
}

/// A7105 driver
pub struct A7105<T> {
    transport: T,
    mode: ChipMode,
    calibration_limit: SpinLimit,
}

impl<T: ChipTransport> A7105<T> {
    /// Wrap a transport; the chip is assumed freshly powered
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            mode: ChipMode::Idle,
            calibration_limit: SpinLimit::UNBOUNDED,
        }
    }

    /// Bound the calibration busy-wait
    pub fn with_calibration_limit(mut self, limit: SpinLimit) -> Self {
        self.calibration_limit = limit;
        self
    }

    /// Current mirrored chip mode
    pub fn mode(&self) -> ChipMode {
        self.mode
    }

    /// Give back the transport
    pub fn release(self) -> T {
        self.transport
    }

    /// Issue the soft-reset sequence
    ///
    /// Every register returns to its reset value; [`A7105::configure`] must
    /// run before the first receive.
    pub fn reset(&mut self) -> Result<()> {
        self.write_reg(Reg::Mode, 0x00)?;
        self.mode = ChipMode::Idle;
        debug!("A7105 soft reset");
        Ok(())
    }

    /// Write a register image and calibrate
    ///
    /// Entries equal to [`REG_KEEP_DEFAULT`] are skipped. Calibration failure
    /// is fatal: a chip that never finishes is defective hardware.
    pub fn configure(&mut self, registers: &[u8]) -> Result<()> {
        debug_assert!(
            self.mode != ChipMode::Receiving,
            "configure() while receiving"
        );

        for (addr, &value) in registers.iter().enumerate().take(READ_FLAG as usize) {
            if value != REG_KEEP_DEFAULT {
                self.write_raw(addr as u8, value)?;
            }
        }

        self.strobe(Strobe::Standby)?;
        self.mode = ChipMode::Calibrating;
        self.write_reg(Reg::Calc, CALC_START)?;

        let limit = self.calibration_limit;
        let polls = limit.spin(|| Ok(self.read_reg(Reg::Calc)? == 0))?;
        let polls = match polls {
            Some(polls) => polls,
            None => {
                let max = limit.0.unwrap_or(u32::MAX);
                return Err(RxError::CalibrationTimeout { polls: max });
            }
        };

        let if_calib = self.read_reg(Reg::IfCalibI)?;
        if if_calib & IF_CALIB_FAILED != 0 {
            warn!("A7105 IF calibration flagged failure (0x{:02X})", if_calib);
        }

        self.write_reg(Reg::VcoCurrentCal, VCO_CURRENT_TRIM)?;
        self.write_reg(Reg::VcoSingleBandCalI, VCO_BAND_TRIM)?;
        self.strobe(Strobe::Standby)?;
        self.mode = ChipMode::Standby;

        debug!("A7105 calibrated after {} polls", polls);
        Ok(())
    }

    /// Reset, load the FlySky register image and check the chip answers
    pub fn init_flysky(&mut self) -> Result<()> {
        self.reset()?;
        self.set_identity(FLYSKY_LINK_ID)?;
        self.configure(&FLYSKY_REGISTERS)?;

        let actual = self.get_identity()?;
        if actual != FLYSKY_LINK_ID {
            return Err(RxError::ChipNotResponding { expected: FLYSKY_LINK_ID, actual });
        }

        info!("A7105 initialised (link ID 0x{:08X})", FLYSKY_LINK_ID);
        Ok(())
    }

    /// Program the 32-bit network identifier, MSB first
    pub fn set_identity(&mut self, id: u32) -> Result<()> {
        self.write_burst(Reg::IdData, &id.to_be_bytes())
    }

    /// Read the 32-bit network identifier, MSB first
    pub fn get_identity(&mut self) -> Result<u32> {
        let mut data = [0u8; 4];
        self.read_burst(Reg::IdData, &mut data)?;
        Ok(u32::from_be_bytes(data))
    }

    /// Retune and arm the receiver
    ///
    /// The read pointer must be reset before arming or the FIFO serves stale
    /// bytes from the previous packet.
    pub fn tune(&mut self, channel: u8) -> Result<()> {
        debug_assert!(
            self.mode != ChipMode::Idle && self.mode != ChipMode::Calibrating,
            "tune() before configure()"
        );
        self.strobe(Strobe::Standby)?;
        self.strobe(Strobe::ResetReadPointer)?;
        self.write_reg(Reg::Channel, channel)?;
        self.strobe(Strobe::Rx)?;
        self.mode = ChipMode::Receiving;
        Ok(())
    }

    /// Re-arm on the current channel after a CRC failure
    pub fn rearm(&mut self) -> Result<()> {
        debug_assert_eq!(self.mode, ChipMode::Receiving, "rearm() outside receive");
        self.strobe(Strobe::ResetReadPointer)?;
        self.strobe(Strobe::Rx)
    }

    /// True when the received packet failed its CRC
    pub fn crc_failed(&mut self) -> Result<bool> {
        Ok(self.read_reg(Reg::Mode)? & MODE_CRC_ERROR != 0)
    }

    /// Burst the received packet out of the FIFO
    ///
    /// Only valid once the ready pin reported a packet and
    /// [`A7105::crc_failed`] returned false.
    pub fn read_frame(&mut self) -> Result<InboundFrame> {
        debug_assert_eq!(self.mode, ChipMode::Receiving, "read_frame() outside receive");
        let mut raw = [0u8; INBOUND_FRAME_LEN];
        self.read_fifo(&mut raw)?;
        Ok(InboundFrame::from_bytes(raw))
    }

    fn read_fifo(&mut self, data: &mut [u8]) -> Result<()> {
        let len = data.len().min(FIFO_SIZE);
        self.read_burst(Reg::FifoData, &mut data[..len])
    }

    /// Send a strobe command
    pub fn strobe(&mut self, strobe: Strobe) -> Result<()> {
        self.transaction(|t| t.exchange(strobe.command()).map(|_| ()))
    }

    fn write_reg(&mut self, reg: Reg, value: u8) -> Result<()> {
        self.write_raw(reg.addr(), value)
    }

    fn write_raw(&mut self, addr: u8, value: u8) -> Result<()> {
        self.transaction(|t| {
            t.exchange(addr)?;
            t.exchange(value)?;
            Ok(())
        })
    }

    fn read_reg(&mut self, reg: Reg) -> Result<u8> {
        let mut value = [0u8; 1];
        self.read_burst(reg, &mut value)?;
        Ok(value[0])
    }

    fn write_burst(&mut self, reg: Reg, data: &[u8]) -> Result<()> {
        self.transaction(|t| {
            t.exchange(reg.addr())?;
            for &byte in data {
                t.exchange(byte)?;
            }
            Ok(())
        })
    }

    fn read_burst(&mut self, reg: Reg, data: &mut [u8]) -> Result<()> {
        self.transport.select()?;
        let result = Self::shift_in(&mut self.transport, reg, data);
        // Release and turn the line around even when a transfer failed
        let deselect = self.transport.deselect();
        let direction = self.transport.set_data_input(false);
        result.and(deselect).and(direction)
    }

    fn shift_in(transport: &mut T, reg: Reg, data: &mut [u8]) -> Result<()> {
        transport.exchange(reg.addr() | READ_FLAG)?;
        transport.set_data_input(true)?;
        for byte in data.iter_mut() {
            *byte = transport.exchange(0xFF)?;
        }
        Ok(())
    }

    fn transaction<F>(&mut self, body: F) -> Result<()>
    where
        F: FnOnce(&mut T) -> Result<()>,
    {
        self.transport.select()?;
        let result = body(&mut self.transport);
        let deselect = self.transport.deselect();
        result.and(deselect)
    }
}
