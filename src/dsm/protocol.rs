//! # DSM Serial Protocol Constants and Types
//!
//! Core definitions for the Spektrum-style serial frames flight controllers
//! accept on a "DSM/Spektrum satellite" input.

use crate::clock::{ms, Ticks};

/// Serial baud rate (8N1)
pub const DSM_BAUD_RATE: u32 = 115_200;

/// Channels carried per frame
pub const DSM_CHANNELS_PER_FRAME: usize = 7;

/// Frame length: 2 header bytes + 2 bytes per channel
pub const DSM_FRAME_LEN: usize = 2 + 2 * DSM_CHANNELS_PER_FRAME;

/// Frame preamble (fade count, system byte)
pub const DSM_HEADER: [u8; 2] = [0x00, 0xB2];

/// Output cadence
pub const DSM_FRAME_PERIOD: Ticks = ms(11);

/// Output ticks served from one accepted uplink packet before failsafe
pub const FRESHNESS_BUDGET: u8 = 40;

/// Raw sample that maps to output zero
pub const INPUT_BASELINE: u32 = 1000;

/// Raw sample span above the baseline (1000..2000 µs)
pub const INPUT_SPAN: u32 = 1000;

/// Channel value width
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// 1024 steps, channel index in bits 10..
    TenBit,
    /// 2048 steps, channel index in bits 11..
    ElevenBit,
}

impl Resolution {
    /// Resolution selected by the `dsm-11bit` cargo feature
    #[cfg(not(feature = "dsm-11bit"))]
    pub const BUILD: Resolution = Resolution::TenBit;

    /// Resolution selected by the `dsm-11bit` cargo feature
    #[cfg(feature = "dsm-11bit")]
    pub const BUILD: Resolution = Resolution::ElevenBit;

    pub const fn bits(self) -> u32 {
        match self {
            Resolution::TenBit => 10,
            Resolution::ElevenBit => 11,
        }
    }

    /// Largest channel value
    pub const fn max_value(self) -> u16 {
        ((1u32 << self.bits()) - 1) as u16
    }
}

/// One encoded output frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputFrame {
    bytes: [u8; DSM_FRAME_LEN],
}

impl OutputFrame {
    pub fn from_bytes(bytes: [u8; DSM_FRAME_LEN]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; DSM_FRAME_LEN] {
        &self.bytes
    }

    pub fn into_bytes(self) -> [u8; DSM_FRAME_LEN] {
        self.bytes
    }

    /// Big-endian slot word of channel slot `slot`
    pub fn slot(&self, slot: usize) -> u16 {
        u16::from_be_bytes([self.bytes[2 + 2 * slot], self.bytes[3 + 2 * slot]])
    }

    /// Split a slot word into (channel index, value)
    pub fn channel(&self, slot: usize, resolution: Resolution) -> (u8, u16) {
        let word = self.slot(slot);
        let index = (word >> resolution.bits()) as u8;
        (index, word & resolution.max_value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_constants() {
        assert_eq!(DSM_FRAME_LEN, 16);
        assert_eq!(DSM_HEADER, [0x00, 0xB2]);
        assert_eq!(DSM_BAUD_RATE, 115_200);
        assert_eq!(DSM_FRAME_PERIOD, 110);
    }

    #[test]
    fn test_resolution_ranges() {
        assert_eq!(Resolution::TenBit.max_value(), 1023);
        assert_eq!(Resolution::ElevenBit.max_value(), 2047);
        assert_eq!(Resolution::TenBit.bits(), 10);
        assert_eq!(Resolution::ElevenBit.bits(), 11);
    }

    #[test]
    fn test_channel_split() {
        let mut bytes = [0u8; DSM_FRAME_LEN];
        bytes[2..4].copy_from_slice(&((3u16 << 10) | 512).to_be_bytes());
        let frame = OutputFrame::from_bytes(bytes);
        assert_eq!(frame.channel(0, Resolution::TenBit), (3, 512));
    }

    #[test]
    fn test_budget_is_nonzero() {
        assert!(FRESHNESS_BUDGET > 0);
    }
}
