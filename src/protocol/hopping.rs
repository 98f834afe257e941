//! # Channel Hop Sequencer
//!
//! The transmitter hops through one row of a fixed 16×16 table, picked by
//! its identifier. The receiver derives the same row and offset and must
//! advance exactly once per transmitter hop to stay in lock-step.

/// Number of hops before a row repeats
pub const HOP_SEQUENCE_LEN: usize = 16;

/// Upper bound of the per-plan channel offset
pub const MAX_CHANNEL_OFFSET: u8 = 9;

/// Channel used while binding
pub const BIND_CHANNEL: u8 = 0x00;

/// FlySky hop table
pub const HOP_TABLE: [[u8; HOP_SEQUENCE_LEN]; 16] = [
    [0x0a, 0x5a, 0x14, 0x64, 0x1e, 0x6e, 0x28, 0x78, 0x32, 0x82, 0x3c, 0x8c, 0x46, 0x96, 0x50, 0xa0],
    [0xa0, 0x50, 0x96, 0x46, 0x8c, 0x3c, 0x82, 0x32, 0x78, 0x28, 0x6e, 0x1e, 0x64, 0x14, 0x5a, 0x0a],
    [0x0a, 0x5a, 0x50, 0xa0, 0x14, 0x64, 0x46, 0x96, 0x1e, 0x6e, 0x3c, 0x8c, 0x28, 0x78, 0x32, 0x82],
    [0x82, 0x32, 0x78, 0x28, 0x8c, 0x3c, 0x6e, 0x1e, 0x96, 0x46, 0x64, 0x14, 0xa0, 0x50, 0x5a, 0x0a],
    [0x28, 0x78, 0x0a, 0x5a, 0x50, 0xa0, 0x14, 0x64, 0x1e, 0x6e, 0x3c, 0x8c, 0x32, 0x82, 0x46, 0x96],
    [0x96, 0x46, 0x82, 0x32, 0x8c, 0x3c, 0x6e, 0x1e, 0x64, 0x14, 0xa0, 0x50, 0x5a, 0x0a, 0x78, 0x28],
    [0x50, 0xa0, 0x28, 0x78, 0x0a, 0x5a, 0x1e, 0x6e, 0x3c, 0x8c, 0x32, 0x82, 0x46, 0x96, 0x14, 0x64],
    [0x64, 0x14, 0x96, 0x46, 0x82, 0x32, 0x8c, 0x3c, 0x6e, 0x1e, 0x5a, 0x0a, 0x78, 0x28, 0xa0, 0x50],
    [0x50, 0xa0, 0x46, 0x96, 0x3c, 0x8c, 0x28, 0x78, 0x0a, 0x5a, 0x32, 0x82, 0x1e, 0x6e, 0x14, 0x64],
    [0x64, 0x14, 0x6e, 0x1e, 0x82, 0x32, 0x5a, 0x0a, 0x78, 0x28, 0x8c, 0x3c, 0x96, 0x46, 0xa0, 0x50],
    [0x46, 0x96, 0x3c, 0x8c, 0x50, 0xa0, 0x28, 0x78, 0x0a, 0x5a, 0x1e, 0x6e, 0x32, 0x82, 0x14, 0x64],
    [0x64, 0x14, 0x82, 0x32, 0x6e, 0x1e, 0x5a, 0x0a, 0x78, 0x28, 0xa0, 0x50, 0x8c, 0x3c, 0x96, 0x46],
    [0x46, 0x96, 0x0a, 0x5a, 0x3c, 0x8c, 0x14, 0x64, 0x50, 0xa0, 0x28, 0x78, 0x1e, 0x6e, 0x32, 0x82],
    [0x82, 0x32, 0x6e, 0x1e, 0x78, 0x28, 0xa0, 0x50, 0x64, 0x14, 0x8c, 0x3c, 0x5a, 0x0a, 0x96, 0x46],
    [0x46, 0x96, 0x0a, 0x5a, 0x50, 0xa0, 0x3c, 0x8c, 0x28, 0x78, 0x1e, 0x6e, 0x32, 0x82, 0x14, 0x64],
    [0x64, 0x14, 0x82, 0x32, 0x6e, 0x1e, 0x78, 0x28, 0x8c, 0x3c, 0xa0, 0x50, 0x5a, 0x0a, 0x96, 0x46],
];

/// Hop schedule for one transmitter identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelPlan {
    row: usize,
    offset: u8,
    cursor: usize,
}

impl ChannelPlan {
    pub fn new(id: u32) -> Self {
        Self {
            row: (id % HOP_SEQUENCE_LEN as u32) as usize,
            offset: channel_offset(id),
            cursor: 0,
        }
    }

    pub fn row(&self) -> usize {
        self.row
    }

    pub fn offset(&self) -> u8 {
        self.offset
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Channel at `cursor` without moving
    pub fn channel_at(&self, cursor: usize) -> u8 {
        HOP_TABLE[self.row][cursor % HOP_SEQUENCE_LEN]
            .wrapping_sub(self.offset)
            .wrapping_sub(1)
    }

    /// Channel for the current cursor; moves the cursor one step
    pub fn advance(&mut self) -> u8 {
        let channel = self.channel_at(self.cursor);
        self.cursor = (self.cursor + 1) % HOP_SEQUENCE_LEN;
        channel
    }
}

/// `(id & 0xFF) / 16`, clamped to 9 like every FlySky transmitter does
pub fn channel_offset(id: u32) -> u8 {
    let offset = ((id & 0xFF) / 16) as u8;
    offset.min(MAX_CHANNEL_OFFSET)
}
