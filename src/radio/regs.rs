//! # A7105 Registers and Strobes
//!
//! Register map subset, strobe commands and the FlySky register image.

/// Read flag OR'ed into the register address byte
pub const READ_FLAG: u8 = 0x40;

/// Register addresses used by the driver
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reg {
    /// Mode register; writing 0x00 soft-resets, reading returns status
    Mode = 0x00,
    ModeControl = 0x01,
    /// Calibration control, self-clearing
    Calc = 0x02,
    FifoData = 0x05,
    /// 4-byte ID (network address) burst register
    IdData = 0x06,
    /// PLL I, the RF channel number
    Channel = 0x0F,
    IfCalibI = 0x22,
    VcoCurrentCal = 0x24,
    VcoSingleBandCalI = 0x25,
}

impl Reg {
    pub const fn addr(self) -> u8 {
        self as u8
    }
}

/// Strobe commands (single byte, bit 7 set)
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strobe {
    Sleep = 0x80,
    Idle = 0x90,
    Standby = 0xA0,
    Pll = 0xB0,
    Rx = 0xC0,
    Tx = 0xD0,
    ResetWritePointer = 0xE0,
    ResetReadPointer = 0xF0,
}

impl Strobe {
    pub const fn command(self) -> u8 {
        self as u8
    }
}

/// MODE register: CRC error flag
pub const MODE_CRC_ERROR: u8 = 1 << 5;

/// CALC register: start IF filter bank calibration
pub const CALC_START: u8 = 0x01;

/// IF_CALIB_I: calibration failed flag
pub const IF_CALIB_FAILED: u8 = 1 << 4;

/// Post-calibration VCO current trim
pub const VCO_CURRENT_TRIM: u8 = 0x13;

/// Post-calibration VCO single band trim
pub const VCO_BAND_TRIM: u8 = 0x09;

/// Table entry meaning "leave the register at its reset value"
pub const REG_KEEP_DEFAULT: u8 = 0xFF;

/// Number of registers covered by [`FLYSKY_REGISTERS`]
pub const REGISTER_COUNT: usize = 0x33;

/// Chip network address shared by every FlySky transmitter
pub const FLYSKY_LINK_ID: u32 = 0x5475_C52A;

/// FIFO burst reads are capped at the FIFO depth
pub const FIFO_SIZE: usize = 64;

/// Register image for the FlySky link, indexed by register address
pub const FLYSKY_REGISTERS: [u8; REGISTER_COUNT] = [
    0xff, 0x42, 0x00, 0x14, 0x00, 0xff, 0xff, 0x00, 0x00, 0x00, 0x00, 0x01, 0x21, 0x05, 0x00, 0x50,
    0x9e, 0x4b, 0x00, 0x02, 0x16, 0x2b, 0x12, 0x00, 0x62, 0x80, 0x80, 0x00, 0x0a, 0x32, 0xc3, 0x0f,
    0x13, 0xc3, 0x00, 0xff, 0x00, 0x00, 0x3b, 0x00, 0x17, 0x47, 0x80, 0x03, 0x01, 0x45, 0x18, 0x00,
    0x01, 0x0f, 0xff,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_image_skips_mode_fifo_and_id() {
        assert_eq!(FLYSKY_REGISTERS[Reg::Mode.addr() as usize], REG_KEEP_DEFAULT);
        assert_eq!(FLYSKY_REGISTERS[Reg::FifoData.addr() as usize], REG_KEEP_DEFAULT);
        assert_eq!(FLYSKY_REGISTERS[Reg::IdData.addr() as usize], REG_KEEP_DEFAULT);
    }

    #[test]
    fn test_strobes_have_high_bit() {
        for strobe in [
            Strobe::Sleep,
            Strobe::Idle,
            Strobe::Standby,
            Strobe::Pll,
            Strobe::Rx,
            Strobe::Tx,
            Strobe::ResetWritePointer,
            Strobe::ResetReadPointer,
        ] {
            assert_ne!(strobe.command() & 0x80, 0);
        }
    }

    #[test]
    fn test_register_addresses_fit_below_read_flag() {
        assert!((Reg::VcoSingleBandCalI.addr()) < READ_FLAG);
        assert!(REGISTER_COUNT <= READ_FLAG as usize);
    }
}
