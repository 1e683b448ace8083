//! Consumer callback seam

use crate::burst::BusConfig;
use crate::core::{Error, XferId};
use crate::xfer::Xfer;

/// Consumer decision returned from the done and fail callbacks
pub enum Verdict {
    /// Keep the current descriptor; the next transfer repeats its TX data.
    Keep,
    /// Replace the current descriptor with this one. The engine absorbs it
    /// by copy and confirms through [`Client::on_accepted`].
    Replace(Xfer),
    /// Stop the device where it stands, keeping our flag asserted so the
    /// peer sees the link as busy. Only an explicit reset revives the
    /// transport.
    Halt,
}

/// Upper-layer protocol hooks
///
/// `on_done` and `on_fail` are invoked from the worker task and may sleep.
/// `on_configure` is invoked immediately before a burst submission from a
/// context that cannot sleep; keep it to plain field assignments.
pub trait Client {
    /// A transfer finished; `done` holds the delivered RX payload.
    ///
    /// `next_id` is the identifier the next descriptor would get. Setting
    /// `start_immediately` requests an immediate follow-up transfer once
    /// the engine returns to idle, regardless of the returned verdict.
    fn on_done(&self, done: &Xfer, next_id: XferId, start_immediately: &mut bool) -> Verdict;

    /// Error recovery finished signaling the peer; decide how to resume.
    ///
    /// `Keep` restarts with the current descriptor, `Replace` resumes with
    /// a new one, `Halt` forbids the resume and leaves the device down.
    fn on_fail(&self, current: &Xfer, next_id: XferId, error: Error) -> Verdict {
        let _ = (current, next_id, error);
        Verdict::Keep
    }

    /// The replacement descriptor with `id` has been absorbed; whatever
    /// staging the consumer kept for it can be released.
    fn on_accepted(&self, id: XferId) {
        let _ = id;
    }

    /// Sets the transport-level fields of the native burst configuration.
    ///
    /// The engine is oblivious to word width, clock polarity/phase and chip
    /// select behavior; only the upper protocol knows what the counterpart
    /// expects. Must not block.
    fn on_configure(&self, xfer: &Xfer, config: &mut BusConfig) {
        let _ = (xfer, config);
    }
}
