//! # Tick Clock
//!
//! Monotonic 100 µs tick counter used for every protocol deadline.
//!
//! Ticks are a wrapping `u32`; deadlines are always compared through
//! [`elapsed`] so the ~5 day wrap-around is harmless.

use std::time::Instant;

/// Length of one tick in microseconds
pub const TICK_US: u32 = 100;

/// Monotonic tick count
pub type Ticks = u32;

/// Convert microseconds to ticks, rounding to the nearest tick
pub const fn us(us: u32) -> Ticks {
    (us + TICK_US / 2) / TICK_US
}

/// Convert milliseconds to ticks
pub const fn ms(ms: u32) -> Ticks {
    us(1000 * ms)
}

/// Ticks elapsed from `since` to `now`, wrap-around safe
#[inline]
pub fn elapsed(now: Ticks, since: Ticks) -> Ticks {
    now.wrapping_sub(since)
}

/// Source of the current tick count
pub trait Clock {
    /// Current tick count
    fn now(&self) -> Ticks;
}

/// Host clock backed by [`Instant`]
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    start: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self { start: Instant::now() }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Ticks {
        // Truncation is the wrap-around
        (self.start.elapsed().as_micros() / TICK_US as u128) as Ticks
    }
}

#[cfg(test)]
pub mod mocks {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    /// Manually advanced clock shared between a test and the code under test
    #[derive(Clone, Default)]
    pub struct ManualClock {
        now: Rc<Cell<Ticks>>,
    }

    impl ManualClock {
        pub fn new(start: Ticks) -> Self {
            Self { now: Rc::new(Cell::new(start)) }
        }

        pub fn advance(&self, ticks: Ticks) {
            self.now.set(self.now.get().wrapping_add(ticks));
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Ticks {
            self.now.get()
        }
    }
}
