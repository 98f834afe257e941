//! # Receiver Runtime
//!
//! The cooperative main loop: one receive poll and one output poll per
//! iteration, both driven by the same tick clock.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use embedded_hal::digital::{InputPin, OutputPin};
use tracing::info;

use crate::clock::{elapsed, ms, Clock, Ticks, TICK_US};
use crate::dsm::protocol::Resolution;
use crate::dsm::scheduler::{OutputScheduler, OutputTransport, TickOutcome};
use crate::error::Result;
use crate::indicator::StatusLed;
use crate::protocol::frame::NetworkIdentity;
use crate::protocol::receiver::{Receiver, RxEvent, RxState};
use crate::radio::{ChipTransport, A7105};
use crate::storage::{load_identity, IdentityStore};

/// Interval between link statistics reports
pub const REPORT_PERIOD: Ticks = ms(5000);

/// Pause between loop iterations, well under one tick
pub const IDLE_WAIT: Duration = Duration::from_micros(TICK_US as u64 / 5);

/// How the receiver comes up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootMode {
    Bind,
    Track(NetworkIdentity),
}

/// Pick the boot mode from the stored identity and any bind request
pub fn boot_mode<S: IdentityStore + ?Sized>(store: &mut S, bind_requested: bool) -> Result<BootMode> {
    let identity = load_identity(store)?;
    if bind_requested {
        info!("Bind requested");
        return Ok(BootMode::Bind);
    }
    if !identity.is_bound() {
        info!("No stored transmitter identity");
        return Ok(BootMode::Bind);
    }
    Ok(BootMode::Track(identity))
}

/// Result of one loop iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Running,
    /// Bind finished; the loop has nothing left to do
    Bound(NetworkIdentity),
}

/// Output-side counters since boot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputStats {
    pub deferred: u32,
    pub failsafe_ticks: u32,
}

/// Receiver, output scheduler and indicator sharing one clock
pub struct Firmware<T, G, L, S, O, C> {
    receiver: Receiver<T, G>,
    scheduler: OutputScheduler,
    led: StatusLed<L>,
    store: S,
    output: O,
    clock: C,
    stats: OutputStats,
    last_report: Ticks,
}

impl<T, G, L, S, O, C> Firmware<T, G, L, S, O, C>
where
    T: ChipTransport,
    G: InputPin,
    L: OutputPin,
    S: IdentityStore,
    O: OutputTransport,
    C: Clock,
{
    /// Boot into bind or tracking mode
    ///
    /// `radio` must already be initialised.
    pub fn start(
        radio: A7105<T>,
        ready: G,
        led: L,
        mut store: S,
        output: O,
        clock: C,
        bind_requested: bool,
    ) -> Result<Self> {
        let now = clock.now();
        let receiver = match boot_mode(&mut store, bind_requested)? {
            BootMode::Bind => Receiver::bind(radio, ready, now)?,
            BootMode::Track(identity) => Receiver::tracking(radio, ready, identity, now),
        };

        Ok(Self {
            receiver,
            scheduler: OutputScheduler::new(now, Resolution::BUILD),
            led: StatusLed::new(led, now)?,
            store,
            output,
            clock,
            stats: OutputStats::default(),
            last_report: now,
        })
    }

    pub fn state(&self) -> RxState {
        self.receiver.state()
    }

    pub fn receiver(&self) -> &Receiver<T, G> {
        &self.receiver
    }

    pub fn scheduler(&self) -> &OutputScheduler {
        &self.scheduler
    }

    pub fn led(&self) -> &StatusLed<L> {
        &self.led
    }

    pub fn output_stats(&self) -> OutputStats {
        self.stats
    }

    /// Run one loop iteration
    pub fn step(&mut self) -> Result<Step> {
        let now = self.clock.now();

        match self.receiver.poll(now, &mut self.store)? {
            RxEvent::Frame(samples) => self.scheduler.refresh(samples),
            RxEvent::Bound(identity) => {
                self.led.bound()?;
                return Ok(Step::Bound(identity));
            }
            RxEvent::None => {}
        }

        match self.receiver.state() {
            RxState::Bind => self.led.bind_tick(now)?,
            RxState::Tracking => {
                match self.scheduler.poll(now, &mut self.output)? {
                    TickOutcome::Deferred => self.stats.deferred = self.stats.deferred.wrapping_add(1),
                    TickOutcome::Failsafe => {
                        self.stats.failsafe_ticks = self.stats.failsafe_ticks.wrapping_add(1);
                        self.led.failsafe(now)?;
                    }
                    TickOutcome::Sent | TickOutcome::Idle => {}
                }
                self.led.tick(now)?;
                self.report(now);
            }
            RxState::Bound => {}
        }

        Ok(Step::Running)
    }

    fn report(&mut self, now: Ticks) {
        if elapsed(now, self.last_report) < REPORT_PERIOD {
            return;
        }
        self.last_report = now;
        let link = self.receiver.stats();
        info!(
            "Link: {} accepted, {} CRC errors, {} foreign, {} timed hops, {} lost now | DSM: {} sent, {} deferred, {} failsafe",
            link.accepted,
            link.crc_errors,
            link.mismatches,
            link.timed_hops,
            self.receiver.loss().lost(),
            self.scheduler.frames_sent(),
            self.stats.deferred,
            self.stats.failsafe_ticks
        );
    }

    /// Loop until bind completes or `shutdown` is raised
    ///
    /// Returns the new identity when the loop ended because of a bind.
    pub fn run(&mut self, shutdown: &AtomicBool) -> Result<Option<NetworkIdentity>> {
        while !shutdown.load(Ordering::Relaxed) {
            if let Step::Bound(identity) = self.step()? {
                return Ok(Some(identity));
            }
            std::thread::sleep(IDLE_WAIT);
        }
        info!("Receive loop stopped");
        Ok(None)
    }
}
