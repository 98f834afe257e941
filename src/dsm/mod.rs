//! # DSM Output Module
//!
//! Implementation of the Spektrum-style serial output consumed by flight
//! controllers.
//!
//! This module handles:
//! - Frame layout and channel packing (7 channels, 10 or 11-bit)
//! - Rescaling of FlySky samples into the DSM range
//! - Output cadence, freshness budget and failsafe reporting

pub mod encoder;
pub mod protocol;
pub mod scheduler;

pub use protocol::{OutputFrame, Resolution};
pub use scheduler::{OutputScheduler, OutputTransport, TickOutcome};
