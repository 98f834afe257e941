//! # DSM Frame Encoder
//!
//! Rescales raw FlySky samples into tagged DSM channel words.

use super::protocol::*;
use crate::protocol::frame::ChannelSamples;

/// Encode channel samples into a complete DSM frame
///
/// # Arguments
///
/// * `samples` - Raw uplink samples (nominally 1000-2000)
/// * `resolution` - Output channel width
///
/// # Returns
///
/// * `OutputFrame` - 16 bytes: header + 7 big-endian `(index << bits) | value` words
///
/// # Examples
///
/// ```
/// use flysky_rx::dsm::encoder::encode_frame;
/// use flysky_rx::dsm::protocol::Resolution;
///
/// let frame = encode_frame(&[1500; 7], Resolution::TenBit);
/// assert_eq!(frame.as_bytes()[..2], [0x00, 0xB2]);
/// ```
pub fn encode_frame(samples: &ChannelSamples, resolution: Resolution) -> OutputFrame {
    let mut bytes = [0u8; DSM_FRAME_LEN];
    bytes[..2].copy_from_slice(&DSM_HEADER);

    for (ch, &sample) in samples.iter().enumerate().take(DSM_CHANNELS_PER_FRAME) {
        let word = pack_channel(ch as u8, rescale(sample, resolution), resolution);
        bytes[2 + 2 * ch..4 + 2 * ch].copy_from_slice(&word.to_be_bytes());
    }

    OutputFrame::from_bytes(bytes)
}

/// Map a raw sample onto the output range
///
/// Subtracts the baseline (floor 0), then scales with rounding:
/// `(v * max + 500) / 1000`. Samples beyond the nominal span saturate at
/// the resolution maximum.
pub fn rescale(sample: u16, resolution: Resolution) -> u16 {
    let above = (sample as u32).saturating_sub(INPUT_BASELINE);
    let max = resolution.max_value() as u32;
    let scaled = (above * max + INPUT_SPAN / 2) / INPUT_SPAN;
    clamp_channel_value(scaled.min(u16::MAX as u32) as u16, resolution)
}

/// Combine channel index and value into one slot word
pub fn pack_channel(index: u8, value: u16, resolution: Resolution) -> u16 {
    ((index as u16) << resolution.bits()) | clamp_channel_value(value, resolution)
}

/// Clamp a channel value to the resolution's range
pub fn clamp_channel_value(value: u16, resolution: Resolution) -> u16 {
    value.min(resolution.max_value())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rescale_ten_bit_midpoint() {
        // 1500 - 1000 = 500, (500 * 1023 + 500) / 1000 = 512
        assert_eq!(rescale(1500, Resolution::TenBit), 512);
    }

    #[test]
    fn test_pack_channel_three() {
        let word = pack_channel(3, rescale(1500, Resolution::TenBit), Resolution::TenBit);
        assert_eq!(word, (3 << 10) | 512);
    }

    #[test]
    fn test_rescale_endpoints() {
        assert_eq!(rescale(1000, Resolution::TenBit), 0);
        assert_eq!(rescale(2000, Resolution::TenBit), 1023);
        assert_eq!(rescale(1000, Resolution::ElevenBit), 0);
        assert_eq!(rescale(2000, Resolution::ElevenBit), 2047);
    }

    #[test]
    fn test_rescale_below_baseline_is_zero() {
        assert_eq!(rescale(0, Resolution::TenBit), 0);
        assert_eq!(rescale(999, Resolution::TenBit), 0);
        assert_eq!(rescale(1001, Resolution::TenBit), 1);
    }

    #[test]
    fn test_rescale_rounds_not_truncates() {
        // 1 * 2047 = 2047 -> (2047 + 500) / 1000 = 2
        assert_eq!(rescale(1001, Resolution::ElevenBit), 2);
    }

    #[test]
    fn test_rescale_saturates_above_span() {
        assert_eq!(rescale(2100, Resolution::TenBit), 1023);
        assert_eq!(rescale(u16::MAX, Resolution::ElevenBit), 2047);
    }

    #[test]
    fn test_encode_frame_structure() {
        let samples = [1000, 1100, 1200, 1300, 1400, 1500, 2000];
        let frame = encode_frame(&samples, Resolution::TenBit);
        let bytes = frame.as_bytes();

        assert_eq!(bytes.len(), 16);
        assert_eq!(bytes[..2], DSM_HEADER);
        for ch in 0..DSM_CHANNELS_PER_FRAME {
            let (index, value) = frame.channel(ch, Resolution::TenBit);
            assert_eq!(index as usize, ch);
            assert_eq!(value, rescale(samples[ch], Resolution::TenBit));
        }
    }

    #[test]
    fn test_encode_frame_big_endian_slots() {
        let frame = encode_frame(&[1500; 7], Resolution::TenBit);
        let bytes = frame.as_bytes();
        // ch3: (3 << 10) | 512 = 0x0E00
        assert_eq!(bytes[8], 0x0E);
        assert_eq!(bytes[9], 0x00);
    }

    #[test]
    fn test_eleven_bit_tag_position() {
        let frame = encode_frame(&[2000; 7], Resolution::ElevenBit);
        assert_eq!(frame.slot(6), (6 << 11) | 2047);
    }

    #[test]
    fn test_clamp_channel_value() {
        assert_eq!(clamp_channel_value(1023, Resolution::TenBit), 1023);
        assert_eq!(clamp_channel_value(1024, Resolution::TenBit), 1023);
        assert_eq!(clamp_channel_value(2048, Resolution::ElevenBit), 2047);
    }
}
