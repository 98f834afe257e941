//! # FlySky RX Library
//!
//! FlySky AFHDS compatible 2.4GHz receiver built on the AMICCOM A7105.
//!
//! This library binds to a FlySky transmitter, follows its frequency hops
//! and re-emits its channel values as a Spektrum-style DSM serial stream
//! for flight controllers.

pub mod clock;
pub mod config;
pub mod dsm;
pub mod error;
pub mod indicator;
pub mod protocol;
pub mod radio;
pub mod runtime;
pub mod serial;
pub mod storage;

#[cfg(target_os = "linux")]
pub mod board;
