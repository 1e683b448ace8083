//! # Symbus
//!
//! This library implements a symmetric, full-duplex transport between two
//! independent CPUs connected by a shared byte-serial synchronous bus plus
//! two unidirectional handshake flag lines, one per side. Either CPU,
//! regardless of its bus role, may initiate a bidirectional transfer of a
//! fixed number of payload bytes; the counterpart always participates
//! simultaneously.
//!
//! The transport guarantees at most one transfer in flight, an ordered
//! handshake, bounded-latency error recovery, and deterministic state
//! transitions. It does NOT guarantee delivery of payload contents: framing,
//! checksums, sequencing, and retransmission belong to the upper protocol.
//!
//! ## Architecture
//!
//! ```text
//!  platform ISR          bus driver
//!       │                     │
//!       ▼                     ▼
//! ┌──────────┐       ┌────────────────┐
//! │ EdgeSink │       │ CompletionSink │
//! └────┬─────┘       └───────┬────────┘
//!      │    ┌────────┐       │
//!      └───►│        │◄──────┘
//!           │ SymBus │◄────────── Handle (consumer API)
//!      ┌───►│        │◄──────┐
//!      │    └───┬────┘       │
//! ┌────┴───┐    │       ┌────┴───┐
//! │ Runner │    ▼       │ Client │
//! └────────┘ BusPort,   └────────┘
//!            FlagOut/In
//! ```
//!
//! Components:
//! * _SymBus_ owns the transport state machine: the atomic state word, the
//!   transfer descriptor and its buffers, the error ledger, and the
//!   statistics counters.
//! * _Handle_ is the consumer request API: initiate or update transfers,
//!   init/close/reset the device, read the diagnostics snapshot.
//! * _EdgeSink_ and _CompletionSink_ couple the platform edge interrupt and
//!   the bus completion callback to the state machine. Both are
//!   non-blocking; see the `symbus-driver` crate.
//! * _Runner_ is the worker task that executes everything which may sleep:
//!   consumer callbacks, flag silence intervals, the peer-wait timeout, and
//!   the error recovery pulse train. Run it for proper operation.
//! * _Client_ is the consumer callback seam, invoked from the runner only.
//!
//! ## Concurrency model
//!
//! Three execution domains interact: the interrupt domain (edge events and
//! the bus completion), the timeout expiry, and the sleep-capable worker.
//! The state word is the single serialization point, updated exclusively by
//! sequentially consistent compare-and-swap; ownership of the mutable
//! transfer data follows whoever holds the current state. Interior state
//! shared with interrupt context sits behind a blocking mutex with bounded
//! critical sections (a buffer copy of at most one burst).
//!
//! The generic `M: RawMutex` parameter selects the critical section flavor,
//! as elsewhere in the embassy ecosystem: `CriticalSectionRawMutex` when the
//! sinks are called from interrupt handlers, `ThreadModeRawMutex` when all
//! parts run in the thread-mode executor.
//!
//! ## Wire protocol
//!
//! A side asserts its flag to request a transfer, or to acknowledge the
//! peer's request. It deasserts the flag once it finished processing the
//! completed transfer, and keeps it inactive for at least the configured
//! minimum interval before the next assert. An error is signaled to the
//! peer by a five-edge pulse train on the flag; the receiver detects it by
//! observing two or more falling edges within one expected cycle.

#![no_std]

pub use symbus_core as core;
pub use symbus_driver::{burst, port, time};

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod client;
pub mod config;
mod device;
mod diag;
mod engine;
mod flags;
mod ledger;
mod state;
mod work;
pub mod xfer;

pub use client::{Client, Verdict};
pub use config::Config;
pub use device::{FullDuplex, Handle, Runner, SymBus};
pub use xfer::Xfer;
