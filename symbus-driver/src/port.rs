//! Port traits consumed by the engine and sink handles consumed by drivers

use crate::burst::{Burst, Completion};
use crate::internal;

/// Bus channel port
///
/// Starts an asynchronous full-duplex burst. The call must not block and is
/// made from contexts that cannot sleep; a driver that needs to defer the
/// actual programming should enqueue internally. The finished burst is
/// delivered through the [`CompletionSink`] handle.
pub trait BusPort {
    /// Begins the burst, or rejects it synchronously with the driver-native
    /// error code.
    fn submit(&self, burst: &Burst) -> Result<(), i32>;
}

/// Output port of our handshake flag line
///
/// Level writes must not block. The engine owns the line between init and
/// close; the driver only translates levels to the wire.
pub trait FlagOut {
    fn set_level(&self, high: bool);
}

/// Input port of the peer handshake flag line
///
/// Level reads must not block and must return the current wire level, not a
/// latched one: the engine samples the line after each edge event to decide
/// which edge it was.
pub trait FlagIn {
    fn level(&self) -> bool;
}

/// Which edges of the peer flag line must be dispatched to the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EdgeTrigger {
    /// Falling edge only; the bus controller observes the rising edge itself
    /// through its hardware ready handshake.
    Falling,
    /// Both edges.
    Both,
}

/// Receiver of peer flag edge events. A platform driver should consume it.
///
/// The platform interrupt handler calls [`edge`](Self::edge) after any edge
/// configured by [`trigger`](Self::trigger). The call is non-blocking and
/// interrupt-safe.
#[derive(Clone, Copy)]
pub struct EdgeSink<'a>(&'a (dyn internal::DynamicEdgeSink + Sync));

impl<'a> EdgeSink<'a> {
    pub fn new(sink: &'a (dyn internal::DynamicEdgeSink + Sync)) -> Self {
        Self(sink)
    }

    /// Dispatches one observed edge of the peer flag line.
    pub fn edge(&self) {
        self.0.edge();
    }

    /// Edge set the platform must register the interrupt for.
    pub fn trigger(&self) -> EdgeTrigger {
        self.0.trigger()
    }
}

/// Receiver of burst completions. The bus driver should consume it.
///
/// The call is non-blocking and interrupt-safe; bus drivers commonly invoke
/// it straight from their transfer-done interrupt.
#[derive(Clone, Copy)]
pub struct CompletionSink<'a>(&'a (dyn internal::DynamicCompletionSink + Sync));

impl<'a> CompletionSink<'a> {
    pub fn new(sink: &'a (dyn internal::DynamicCompletionSink + Sync)) -> Self {
        Self(sink)
    }

    /// Delivers the result of the burst submitted last.
    pub fn complete(&self, completion: &Completion) {
        self.0.complete(completion);
    }
}
