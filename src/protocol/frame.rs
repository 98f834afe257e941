//! # FlySky Uplink Frames
//!
//! Typed views over the 21-byte packet and the 5-byte bind identity.
//!
//! ```text
//! byte  0      status / packet type (0xAA on bind packets)
//! bytes 1..5   transmitter identifier
//! bytes 5..19  seven little-endian u16 channel samples
//! bytes 19..21 unused
//! ```

/// FlySky packet width
pub const INBOUND_FRAME_LEN: usize = 21;

/// Channel samples forwarded downstream
pub const INBOUND_CHANNELS: usize = 7;

/// Offset of the first channel sample
const SAMPLES_OFFSET: usize = 5;

/// First identity byte of a validly bound receiver
pub const BIND_SENTINEL: u8 = 0xAA;

/// Identity length (sentinel + 4 identifier bytes)
pub const IDENTITY_LEN: usize = 5;

/// Raw channel samples of one packet
pub type ChannelSamples = [u16; INBOUND_CHANNELS];

/// One packet as read from the chip FIFO
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InboundFrame {
    raw: [u8; INBOUND_FRAME_LEN],
}

impl InboundFrame {
    pub fn from_bytes(raw: [u8; INBOUND_FRAME_LEN]) -> Self {
        Self { raw }
    }

    /// Build a packet the way a transmitter lays it out
    pub fn encode(status: u8, sender: [u8; 4], samples: &ChannelSamples) -> Self {
        let mut raw = [0u8; INBOUND_FRAME_LEN];
        raw[0] = status;
        raw[1..5].copy_from_slice(&sender);
        for (ch, sample) in samples.iter().enumerate() {
            let at = SAMPLES_OFFSET + 2 * ch;
            raw[at..at + 2].copy_from_slice(&sample.to_le_bytes());
        }
        Self { raw }
    }

    pub fn as_bytes(&self) -> &[u8; INBOUND_FRAME_LEN] {
        &self.raw
    }

    pub fn status(&self) -> u8 {
        self.raw[0]
    }

    /// Identifier bytes of the sending transmitter
    pub fn sender(&self) -> [u8; 4] {
        [self.raw[1], self.raw[2], self.raw[3], self.raw[4]]
    }

    /// Raw sample of channel `ch`
    pub fn sample(&self, ch: usize) -> u16 {
        let at = SAMPLES_OFFSET + 2 * ch;
        u16::from_le_bytes([self.raw[at], self.raw[at + 1]])
    }

    pub fn samples(&self) -> ChannelSamples {
        let mut samples = [0u16; INBOUND_CHANNELS];
        for (ch, sample) in samples.iter_mut().enumerate() {
            *sample = self.sample(ch);
        }
        samples
    }

    /// Candidate identity captured while binding
    pub fn bind_identity(&self) -> NetworkIdentity {
        let mut bytes = [0u8; IDENTITY_LEN];
        bytes.copy_from_slice(&self.raw[..IDENTITY_LEN]);
        NetworkIdentity::from_bytes(bytes)
    }
}

/// Persisted bind identity: sentinel byte + 4-byte transmitter identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkIdentity {
    bytes: [u8; IDENTITY_LEN],
}

impl NetworkIdentity {
    pub fn from_bytes(bytes: [u8; IDENTITY_LEN]) -> Self {
        Self { bytes }
    }

    /// Bound identity for a transmitter identifier
    pub fn bound(sender: [u8; 4]) -> Self {
        let mut bytes = [BIND_SENTINEL; IDENTITY_LEN];
        bytes[1..].copy_from_slice(&sender);
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; IDENTITY_LEN] {
        &self.bytes
    }

    /// False for erased or garbage storage; forces a re-bind
    pub fn is_bound(&self) -> bool {
        self.bytes[0] == BIND_SENTINEL
    }

    pub fn sender(&self) -> [u8; 4] {
        [self.bytes[1], self.bytes[2], self.bytes[3], self.bytes[4]]
    }

    /// Identifier as the hop-table seed (byte 1 is least significant)
    pub fn id(&self) -> u32 {
        u32::from_le_bytes(self.sender())
    }

    /// True when `frame` was sent by this transmitter
    pub fn matches(&self, frame: &InboundFrame) -> bool {
        frame.sender() == self.sender()
    }
}
