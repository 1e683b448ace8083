//! Deferred work dispatch and the peer-wait timeout deadline
//!
//! Operations that may sleep (consumer callbacks, flag silence intervals,
//! the recovery pulse train) never run in interrupt or completion context;
//! they are requested here as work items and drained by the single worker
//! task. One pending bit per item: at most one instance of each runs at a
//! time, re-requests coalesce.
//!
//! The timeout deadline lives in the same place because its expiry is
//! detected on the worker as well: there is no separate timer context, so a
//! cancel never races a concurrent expiry handler.

use core::cell::{Cell, RefCell};
use core::future::{Future, poll_fn};
use core::sync::atomic::{AtomicU8, AtomicU32, Ordering};
use core::task::Poll;

use embassy_futures::select::{Either, select};
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::waitqueue::WakerRegistration;
use embassy_time::{Instant, Timer};

/// What the worker should do next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub(crate) enum Work {
    /// Start the next transfer (a previously latched or self-issued
    /// request).
    DoXfer,
    /// Deliver the finished burst to the consumer.
    Postprocess,
    /// Run the error recovery sequence.
    Recover,
    /// The peer-wait deadline expired.
    Timeout,
}

const RECOVER: u8 = 1 << 0;
const POSTPROCESS: u8 = 1 << 1;
const DO_XFER: u8 = 1 << 2;

pub(crate) struct WorkQueue<M: RawMutex> {
    mask: AtomicU8,
    generation: AtomicU32,
    waker: Mutex<M, RefCell<WakerRegistration>>,
    deadline: Mutex<M, Cell<Option<Instant>>>,
}

impl<M: RawMutex> WorkQueue<M> {
    pub const fn new() -> Self {
        Self {
            mask: AtomicU8::new(0),
            generation: AtomicU32::new(0),
            waker: Mutex::new(RefCell::new(WakerRegistration::new())),
            deadline: Mutex::new(Cell::new(None)),
        }
    }

    /// Requests a work item. Safe from any context.
    pub fn schedule(&self, work: Work) {
        let bit = match work {
            Work::DoXfer => DO_XFER,
            Work::Postprocess => POSTPROCESS,
            Work::Recover => RECOVER,
            Work::Timeout => return,
        };
        self.mask.fetch_or(bit, Ordering::SeqCst);
        self.bump();
    }

    /// Starts/restarts the peer-wait deadline. Safe from any context.
    pub fn arm(&self, deadline: Instant) {
        trace!("timer set, expires at {} us", deadline.as_micros());
        self.deadline.lock(|cell| cell.set(Some(deadline)));
        self.bump();
    }

    /// Stops the deadline. A worker already waiting on the stale instant
    /// wakes up, fails to claim it and goes back to sleep.
    pub fn cancel(&self) {
        trace!("timer stop");
        self.deadline.lock(|cell| cell.set(None));
    }

    /// Drops all pending work. Teardown only.
    pub fn clear(&self) {
        self.mask.store(0, Ordering::SeqCst);
        self.cancel();
    }

    /// Fetches the next work item; the deadline expiry wins over nothing,
    /// recovery wins over everything.
    pub async fn next(&self) -> Work {
        loop {
            if let Some(work) = self.take() {
                return work;
            }
            let seen = self.generation.load(Ordering::SeqCst);
            match self.deadline.lock(|cell| cell.get()) {
                Some(deadline) if Instant::now() >= deadline => {
                    if self.expire(deadline) {
                        return Work::Timeout;
                    }
                }
                Some(deadline) => match select(self.changed(seen), Timer::at(deadline)).await {
                    Either::First(()) => {}
                    Either::Second(()) => {
                        if self.expire(deadline) {
                            return Work::Timeout;
                        }
                    }
                },
                None => self.changed(seen).await,
            }
        }
    }

    fn take(&self) -> Option<Work> {
        let mask = self.mask.load(Ordering::SeqCst);
        let (bit, work) = if mask & RECOVER != 0 {
            (RECOVER, Work::Recover)
        } else if mask & POSTPROCESS != 0 {
            (POSTPROCESS, Work::Postprocess)
        } else if mask & DO_XFER != 0 {
            (DO_XFER, Work::DoXfer)
        } else {
            return None;
        };
        self.mask.fetch_and(!bit, Ordering::SeqCst);
        Some(work)
    }

    /// Claims the expired deadline; fails if it was re-armed meanwhile.
    fn expire(&self, deadline: Instant) -> bool {
        self.deadline.lock(|cell| {
            if cell.get() == Some(deadline) {
                cell.set(None);
                true
            } else {
                false
            }
        })
    }

    fn changed(&self, seen: u32) -> impl Future<Output = ()> + '_ {
        poll_fn(move |cx| {
            self.waker.lock(|waker| waker.borrow_mut().register(cx.waker()));

            // Check after the waker is set
            if self.mask.load(Ordering::SeqCst) != 0
                || self.generation.load(Ordering::SeqCst) != seen
            {
                Poll::Ready(())
            } else {
                Poll::Pending
            }
        })
    }

    fn bump(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.waker.lock(|waker| waker.borrow_mut().wake());
    }
}
