//! # Status Indicator
//!
//! Drives the active-low status LED.
//!
//! - Bind: toggles every second, solid once bound
//! - Tracking: dark, except for a short blink on every failsafe report

use embedded_hal::digital::{ErrorType, OutputPin};
use tracing::trace;

use crate::clock::{elapsed, ms, Ticks};
use crate::error::{Result, RxError};

/// Bind blink half-period
pub const BIND_TOGGLE: Ticks = ms(1000);

/// Failsafe blink on time
pub const FAILSAFE_ON: Ticks = ms(100);

/// Failsafe blink off time before the next blink may start
pub const FAILSAFE_OFF: Ticks = ms(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Blink {
    Dark,
    On { since: Ticks },
    Off { since: Ticks },
}

/// Status LED state machine
pub struct StatusLed<P> {
    pin: P,
    lit: bool,
    blink: Blink,
    last_toggle: Ticks,
}

impl<P: OutputPin> StatusLed<P> {
    /// Take the pin and switch the LED off
    pub fn new(pin: P, now: Ticks) -> Result<Self> {
        let mut led = Self { pin, lit: true, blink: Blink::Dark, last_toggle: now };
        led.set(false)?;
        Ok(led)
    }

    pub fn is_lit(&self) -> bool {
        self.lit
    }

    pub fn set(&mut self, lit: bool) -> Result<()> {
        if lit == self.lit {
            return Ok(());
        }
        // Active low
        let result = if lit { self.pin.set_low() } else { self.pin.set_high() };
        result.map_err(|e| RxError::Gpio(format!("status LED: {:?}", e)))?;
        self.lit = lit;
        Ok(())
    }

    /// Bind-mode update
    pub fn bind_tick(&mut self, now: Ticks) -> Result<()> {
        if elapsed(now, self.last_toggle) >= BIND_TOGGLE {
            self.last_toggle = now;
            let lit = !self.lit;
            self.set(lit)?;
        }
        Ok(())
    }

    /// Solid on after bind
    pub fn bound(&mut self) -> Result<()> {
        self.blink = Blink::Dark;
        self.set(true)
    }

    /// Start a failsafe blink unless one is already running
    pub fn failsafe(&mut self, now: Ticks) -> Result<()> {
        if self.blink == Blink::Dark {
            trace!("Failsafe blink");
            self.blink = Blink::On { since: now };
            self.set(true)?;
        }
        Ok(())
    }

    /// Tracking-mode update: advances a running failsafe blink
    pub fn tick(&mut self, now: Ticks) -> Result<()> {
        match self.blink {
            Blink::Dark => {}
            Blink::On { since } if elapsed(now, since) >= FAILSAFE_ON => {
                self.blink = Blink::Off { since: now };
                self.set(false)?;
            }
            Blink::Off { since } if elapsed(now, since) >= FAILSAFE_OFF => {
                self.blink = Blink::Dark;
            }
            _ => {}
        }
        Ok(())
    }

    pub fn release(self) -> P {
        self.pin
    }
}

/// Output line that may not be wired; writes to a missing line are dropped
#[derive(Debug, Default)]
pub struct OptionalPin<P>(pub Option<P>);

impl<P: ErrorType> ErrorType for OptionalPin<P> {
    type Error = P::Error;
}

impl<P: OutputPin> OutputPin for OptionalPin<P> {
    fn set_low(&mut self) -> std::result::Result<(), Self::Error> {
        match self.0.as_mut() {
            Some(pin) => pin.set_low(),
            None => Ok(()),
        }
    }

    fn set_high(&mut self) -> std::result::Result<(), Self::Error> {
        match self.0.as_mut() {
            Some(pin) => pin.set_high(),
            None => Ok(()),
        }
    }
}
