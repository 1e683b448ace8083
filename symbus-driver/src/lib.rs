//! Symbus driver interface
//!
//! The crate provides the interface between platform port drivers and the
//! Symbus engine. Limited scope facilitates compatibility across versions.
//! Driver crates should depend on this crate. Symbus users should depend on
//! the `symbus` crate instead.
//!
//! The engine consumes three port traits:
//! * [`port::BusPort`] starts an asynchronous full-duplex burst
//! * [`port::FlagOut`] drives the level of our handshake flag line
//! * [`port::FlagIn`] samples the level of the peer handshake flag line
//!
//! and exposes two sink handles that a platform driver consumes:
//! * [`port::EdgeSink`] receives peer flag edge events from the platform
//!   interrupt handler
//! * [`port::CompletionSink`] receives the burst completion from the bus
//!   driver
//!
//! Both sinks are non-blocking and interrupt-safe: the engine reacts with
//! atomic bookkeeping and defers anything that may sleep to its worker task.
//!
//! Burst payloads cross the boundary by value as fixed-capacity vectors
//! ([`burst::Data`]). A burst never exceeds the single-burst limit of the
//! bus controller, so the copies stay small and no buffer lifetimes leak
//! into the driver.
//!
//! The platform glue should query [`port::EdgeSink::trigger`] when
//! registering the edge interrupt: a controller with the hardware ready
//! handshake observes the rising edge itself and only the falling edge must
//! be dispatched to the engine.

#![no_std]

pub mod burst;
pub mod internal;
pub mod port;

pub mod time {
    pub use embassy_time::{Duration, Instant};
}
