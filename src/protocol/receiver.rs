//! # Receiver State Machine
//!
//! Bind and tracking lifecycles of the FlySky link.
//!
//! While tracking, two independent triggers move the receiver to the next
//! channel:
//!
//! - an accepted packet from the bound transmitter, and
//! - the hop deadline expiring, which hops blind to follow the
//!   transmitter's hop clock through lost packets.
//!
//! Missing either one desynchronises the receiver for good, so neither is
//! allowed to depend on the other.

use embedded_hal::digital::InputPin;
use tracing::{debug, info, trace, warn};

use super::frame::{ChannelSamples, NetworkIdentity};
use super::hopping::{ChannelPlan, BIND_CHANNEL};
use crate::clock::{elapsed, us, Ticks};
use crate::error::{Result, RxError};
use crate::radio::{ChipMode, ChipTransport, A7105};
use crate::storage::{save_identity, IdentityStore};

/// Hop deadline while the link is healthy or briefly lost
pub const HOP_TIMEOUT_SHORT: Ticks = us(1500);

/// Hop deadline once the link has been lost for a while
pub const HOP_TIMEOUT_LONG: Ticks = us(1600);

/// Consecutive timed-out hops that switch to the long deadline
pub const LOSS_THRESHOLD: u16 = 120;

/// Which hop deadline is active
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutRegime {
    Short,
    Long,
}

impl TimeoutRegime {
    pub fn duration(self) -> Ticks {
        match self {
            TimeoutRegime::Short => HOP_TIMEOUT_SHORT,
            TimeoutRegime::Long => HOP_TIMEOUT_LONG,
        }
    }
}

/// Consecutive-loss counter and the deadline it selects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LossState {
    lost: u16,
    regime: TimeoutRegime,
}

impl LossState {
    /// Boot starts in the long regime
    pub fn new() -> Self {
        Self { lost: 0, regime: TimeoutRegime::Long }
    }

    pub fn lost(&self) -> u16 {
        self.lost
    }

    pub fn regime(&self) -> TimeoutRegime {
        self.regime
    }

    pub fn active_timeout(&self) -> Ticks {
        self.regime.duration()
    }

    /// A packet from the bound transmitter arrived
    pub fn on_accept(&mut self) {
        self.lost = 0;
        self.regime = TimeoutRegime::Short;
    }

    /// The hop deadline expired without a packet
    pub fn on_timeout(&mut self) {
        self.lost = self.lost.saturating_add(1);
        self.regime = if self.lost < LOSS_THRESHOLD {
            TimeoutRegime::Short
        } else {
            TimeoutRegime::Long
        };
    }
}

impl Default for LossState {
    fn default() -> Self {
        Self::new()
    }
}

/// Link counters since boot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkStats {
    pub accepted: u32,
    pub crc_errors: u32,
    /// Foreign packets, at most one per channel visit
    pub mismatches: u32,
    pub timed_hops: u32,
}

/// Receiver lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxState {
    /// Listening on the bind channel for any transmitter
    Bind,
    /// Following a bound transmitter
    Tracking,
    /// Bind finished and persisted; a restart is needed to track
    Bound,
}

/// Result of one receiver poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxEvent {
    /// Nothing for the output side
    None,
    /// Accepted packet from the bound transmitter
    Frame(ChannelSamples),
    /// Bind completed with this identity
    Bound(NetworkIdentity),
}

/// FlySky receiver on top of an A7105 and its data-ready pin
pub struct Receiver<T, G> {
    radio: A7105<T>,
    ready: G,
    state: RxState,
    identity: Option<NetworkIdentity>,
    plan: ChannelPlan,
    loss: LossState,
    last_hop: Ticks,
    stats: LinkStats,
    /// A foreign packet is parked in the FIFO until the next tune
    foreign_pending: bool,
}

impl<T, G> Receiver<T, G>
where
    T: ChipTransport,
    G: InputPin,
{
    /// Start binding: listen on the bind channel until a packet arrives
    ///
    /// `radio` must already be initialised.
    pub fn bind(mut radio: A7105<T>, ready: G, now: Ticks) -> Result<Self> {
        radio.tune(BIND_CHANNEL)?;
        info!("Bind mode, listening on channel {}", BIND_CHANNEL);
        Ok(Self {
            radio,
            ready,
            state: RxState::Bind,
            identity: None,
            plan: ChannelPlan::new(0),
            loss: LossState::new(),
            last_hop: now,
            stats: LinkStats::default(),
            foreign_pending: false,
        })
    }

    /// Start tracking a bound transmitter
    ///
    /// The first hop happens when the initial deadline expires.
    pub fn tracking(radio: A7105<T>, ready: G, identity: NetworkIdentity, now: Ticks) -> Self {
        debug_assert!(identity.is_bound(), "tracking an unbound identity");
        let plan = ChannelPlan::new(identity.id());
        info!(
            "Tracking transmitter 0x{:08X} (hop row {}, offset {})",
            identity.id(),
            plan.row(),
            plan.offset()
        );
        Self {
            radio,
            ready,
            state: RxState::Tracking,
            identity: Some(identity),
            plan,
            loss: LossState::new(),
            last_hop: now,
            stats: LinkStats::default(),
            foreign_pending: false,
        }
    }

    pub fn state(&self) -> RxState {
        self.state
    }

    pub fn identity(&self) -> Option<NetworkIdentity> {
        self.identity
    }

    pub fn loss(&self) -> &LossState {
        &self.loss
    }

    pub fn plan(&self) -> &ChannelPlan {
        &self.plan
    }

    pub fn stats(&self) -> LinkStats {
        self.stats
    }

    /// Run the receive side of one loop iteration
    pub fn poll<S: IdentityStore + ?Sized>(&mut self, now: Ticks, store: &mut S) -> Result<RxEvent> {
        match self.state {
            RxState::Bind => self.poll_bind(store),
            RxState::Tracking => self.poll_tracking(now),
            RxState::Bound => Ok(RxEvent::None),
        }
    }

    fn poll_bind<S: IdentityStore + ?Sized>(&mut self, store: &mut S) -> Result<RxEvent> {
        if !self.packet_ready()? {
            return Ok(RxEvent::None);
        }
        if self.radio.crc_failed()? {
            self.stats.crc_errors = self.stats.crc_errors.wrapping_add(1);
            self.radio.rearm()?;
            return Ok(RxEvent::None);
        }

        let frame = self.radio.read_frame()?;
        let identity = frame.bind_identity();
        save_identity(store, &identity)?;

        self.identity = Some(identity);
        self.state = RxState::Bound;
        info!("Bound to transmitter {:02X?}", identity.sender());
        if !identity.is_bound() {
            warn!("Bind packet status 0x{:02X} is not a bind marker; the next boot will re-bind", frame.status());
        }
        Ok(RxEvent::Bound(identity))
    }

    fn poll_tracking(&mut self, now: Ticks) -> Result<RxEvent> {
        let mut event = RxEvent::None;

        if self.packet_ready()? {
            if self.radio.crc_failed()? {
                self.stats.crc_errors = self.stats.crc_errors.wrapping_add(1);
                self.radio.rearm()?;
            } else {
                let frame = self.radio.read_frame()?;
                match self.identity {
                    Some(identity) if identity.matches(&frame) => {
                        self.last_hop = now;
                        self.hop()?;
                        if self.loss.lost() >= LOSS_THRESHOLD {
                            info!("Link regained after {} lost packets", self.loss.lost());
                        }
                        self.loss.on_accept();
                        self.stats.accepted = self.stats.accepted.wrapping_add(1);
                        event = RxEvent::Frame(frame.samples());
                    }
                    _ => {
                        trace!("Ignoring packet from {:02X?}", frame.sender());
                        self.stats.mismatches = self.stats.mismatches.wrapping_add(1);
                        self.foreign_pending = true;
                    }
                }
            }
        }

        if elapsed(now, self.last_hop) >= self.loss.active_timeout() {
            self.hop()?;
            self.last_hop = now;
            self.loss.on_timeout();
            self.stats.timed_hops = self.stats.timed_hops.wrapping_add(1);
            if self.loss.lost() == LOSS_THRESHOLD {
                warn!("Link lost for {} hops, widening hop deadline", LOSS_THRESHOLD);
            }
        }

        Ok(event)
    }

    fn hop(&mut self) -> Result<()> {
        let channel = self.plan.advance();
        trace!("Hop to channel {}", channel);
        self.foreign_pending = false;
        self.radio.tune(channel)
    }

    fn packet_ready(&mut self) -> Result<bool> {
        // GIO1 (WTR) is also low whenever the chip is not in RX
        if self.radio.mode() != ChipMode::Receiving || self.foreign_pending {
            return Ok(false);
        }
        self.ready
            .is_low()
            .map_err(|e| RxError::Gpio(format!("data ready pin: {:?}", e)))
    }

    /// Give back the radio and ready pin
    pub fn release(self) -> (A7105<T>, G) {
        debug!("Releasing receiver in state {:?}", self.state);
        (self.radio, self.ready)
    }
}
