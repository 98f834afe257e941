//! # FlySky Protocol Module
//!
//! Implementation of the FlySky AFHDS uplink as seen by a receiver.
//!
//! This module handles:
//! - Packet layout and the bound transmitter identity
//! - The per-transmitter 16-step hop sequence
//! - Bind, tracking and loss handling

pub mod frame;
pub mod hopping;
pub mod receiver;

pub use frame::{ChannelSamples, InboundFrame, NetworkIdentity};
pub use hopping::ChannelPlan;
pub use receiver::{LinkStats, LossState, Receiver, RxEvent, RxState, TimeoutRegime};
