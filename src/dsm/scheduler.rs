//! # DSM Output Scheduler
//!
//! Emits one frame per cadence tick while the freshness budget lasts and
//! reports failsafe once it runs dry.

use tracing::{debug, info, warn};

use super::encoder::encode_frame;
use super::protocol::*;
use crate::clock::{elapsed, Ticks};
use crate::error::Result;
use crate::protocol::frame::ChannelSamples;

/// Sink for encoded frames with asynchronous completion
///
/// `send` hands the frame over and returns immediately; the transport owns
/// its copy until the completion context clears the busy flag. Calling
/// `send` while `is_busy` is true is a contract violation.
#[cfg_attr(test, mockall::automock)]
pub trait OutputTransport {
    /// True while the previous frame is still on the wire
    fn is_busy(&self) -> bool;

    /// Start transmitting `frame`
    fn send(&mut self, frame: OutputFrame) -> Result<()>;
}

/// What one scheduler poll did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Cadence not due yet
    Idle,
    /// Frame handed to the transport
    Sent,
    /// Due, but the previous frame is still in flight; retried next poll
    Deferred,
    /// Due, but no fresh uplink data
    Failsafe,
}

/// Cadence and freshness bookkeeping for the DSM output
#[derive(Debug)]
pub struct OutputScheduler {
    resolution: Resolution,
    last_tick: Ticks,
    freshness: u8,
    samples: ChannelSamples,
    failsafe: bool,
    frames_sent: u32,
}

impl OutputScheduler {
    /// Start the cadence at `now` with no fresh data
    pub fn new(now: Ticks, resolution: Resolution) -> Self {
        Self {
            resolution,
            last_tick: now,
            freshness: 0,
            samples: [0; DSM_CHANNELS_PER_FRAME],
            failsafe: false,
            frames_sent: 0,
        }
    }

    /// Latch samples from an accepted uplink packet and refill the budget
    pub fn refresh(&mut self, samples: ChannelSamples) {
        self.samples = samples;
        self.freshness = FRESHNESS_BUDGET;
        if self.failsafe {
            self.failsafe = false;
            info!("Uplink data restored, leaving failsafe");
        }
    }

    pub fn freshness(&self) -> u8 {
        self.freshness
    }

    pub fn is_failsafe(&self) -> bool {
        self.failsafe
    }

    pub fn frames_sent(&self) -> u32 {
        self.frames_sent
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Run the output side of one loop iteration
    pub fn poll<O: OutputTransport + ?Sized>(&mut self, now: Ticks, out: &mut O) -> Result<TickOutcome> {
        if elapsed(now, self.last_tick) <= DSM_FRAME_PERIOD {
            return Ok(TickOutcome::Idle);
        }

        if self.freshness == 0 {
            self.last_tick = now;
            if !self.failsafe {
                self.failsafe = true;
                warn!("No fresh uplink data, entering failsafe");
            }
            return Ok(TickOutcome::Failsafe);
        }

        if out.is_busy() {
            debug!("Previous DSM frame still in flight, deferring");
            return Ok(TickOutcome::Deferred);
        }

        self.freshness -= 1;
        self.last_tick = now;
        out.send(encode_frame(&self.samples, self.resolution))?;
        self.frames_sent = self.frames_sent.wrapping_add(1);
        Ok(TickOutcome::Sent)
    }
}
