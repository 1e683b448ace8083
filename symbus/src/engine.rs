//! The transport state machine: handshake sequences, interrupt glue, error
//! routing, and the worker loop
//!
//! Entry points split by execution domain:
//! * `peer_edge` and `bus_complete` are non-blocking and interrupt-safe;
//!   they move the state word, account flag edges, and request worker items.
//! * `exchange`, `update_default` and `init` run on the caller's thread and
//!   never block either: buffer updates are bounded copies of one burst.
//! * `run_postprocess`, `run_recovery` and the timeout expiry execute on the
//!   worker only, the single place where sleeping is allowed.

use core::cell::RefCell;
use core::sync::atomic::{AtomicBool, AtomicI32, AtomicU8, AtomicU32, Ordering};

use embassy_futures::select::{Either, select};
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_time::Timer;

use symbus_driver::internal::{DynamicCompletionSink, DynamicEdgeSink};

use crate::burst::{Burst, BusConfig, Completion, Data};
use crate::client::{Client, Verdict};
use crate::config::Config;
use crate::core::{Error, State, XferId};
use crate::flags::Flags;
use crate::ledger::Ledger;
use crate::port::{BusPort, EdgeTrigger, FlagIn, FlagOut};
use crate::state::StateCell;
use crate::time::Instant;
use crate::work::{Work, WorkQueue};
use crate::xfer::{Xfer, XferSlot};

// Ordered init milestones, so a partially initialized device unwinds
// correctly on close.
const LEVEL_COLD: u8 = 0;
const LEVEL_XFER_CREATED: u8 = 1;
const LEVEL_ISR_LIVE: u8 = 2;
const LEVEL_FULL: u8 = 3;

/// Big-picture operation counters
///
/// No locking on purpose: the values provide overview information without
/// pretending to exact precision.
pub(crate) struct Stats {
    other_side_indicated: AtomicU32,
    other_side_silent: AtomicU32,
    bursts_done: AtomicU32,
    peer_flag_edges: AtomicU32,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct StatsSnapshot {
    pub other_side_indicated: u32,
    pub other_side_silent: u32,
    pub bursts_done: u32,
    pub peer_flag_edges: u32,
}

impl Stats {
    const fn new() -> Self {
        Self {
            other_side_indicated: AtomicU32::new(0),
            other_side_silent: AtomicU32::new(0),
            bursts_done: AtomicU32::new(0),
            peer_flag_edges: AtomicU32::new(0),
        }
    }

    fn reset(&self) {
        self.other_side_indicated.store(0, Ordering::Relaxed);
        self.other_side_silent.store(0, Ordering::Relaxed);
        self.bursts_done.store(0, Ordering::Relaxed);
        self.peer_flag_edges.store(0, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            other_side_indicated: self.other_side_indicated.load(Ordering::Relaxed),
            other_side_silent: self.other_side_silent.load(Ordering::Relaxed),
            bursts_done: self.bursts_done.load(Ordering::Relaxed),
            peer_flag_edges: self.peer_flag_edges.load(Ordering::Relaxed),
        }
    }
}

pub(crate) struct Core<'a, M: RawMutex> {
    client: &'a (dyn Client + Sync),
    bus: &'a (dyn BusPort + Sync),
    flags: Flags<'a>,
    config: Config,
    state: StateCell<M>,
    init_level: AtomicU8,
    /// Falling edges of the peer flag since the last submitted burst.
    /// 0: the peer is still on the previous cycle; 1: released cleanly;
    /// >1: the peer signals an error.
    drop_counter: AtomicI32,
    pending_request: AtomicBool,
    /// Error kind awaiting recovery; 0 while none.
    last_error: AtomicU8,
    next_xfer_id: AtomicU32,
    work: WorkQueue<M>,
    slot: Mutex<M, RefCell<XferSlot>>,
    ledger: Mutex<M, RefCell<Ledger>>,
    stats: Stats,
}

impl<'a, M: RawMutex> Core<'a, M> {
    pub fn new(
        bus: &'a (dyn BusPort + Sync),
        flag_out: &'a (dyn FlagOut + Sync),
        flag_in: &'a (dyn FlagIn + Sync),
        client: &'a (dyn Client + Sync),
        config: Config,
    ) -> Self {
        let config = config.validated();
        Self {
            client,
            bus,
            flags: Flags::new(flag_out, flag_in, config.role),
            config,
            state: StateCell::new(),
            init_level: AtomicU8::new(LEVEL_COLD),
            drop_counter: AtomicI32::new(1),
            pending_request: AtomicBool::new(false),
            last_error: AtomicU8::new(0),
            next_xfer_id: AtomicU32::new(XferId::INITIAL.into_u32()),
            work: WorkQueue::new(),
            slot: Mutex::new(RefCell::new(XferSlot::new())),
            ledger: Mutex::new(RefCell::new(Ledger::new(
                config.min_report_interval,
                config.error_decay_half_life,
            ))),
            stats: Stats::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn is_running(&self) -> bool {
        self.state.get() != State::Cold
    }

    /* ----------------------- consumer requests ----------------------- */

    /// Starts a transfer with the given data, or with the current default.
    ///
    /// When the device is busy and no new data was given, the request is
    /// latched and replayed on the return to idle; the done callback is
    /// then guaranteed to follow.
    pub fn exchange(
        &self,
        template: Option<&Xfer>,
        force_size_change: bool,
    ) -> Result<Option<XferId>, Error> {
        if self.state.is_closing() {
            debug!("closing, transfer request rejected");
            return Err(Error::NotReady);
        }
        let id = match self.idle_to_prepare(template, force_size_change) {
            Ok(id) => id,
            Err(Error::NotReady) if template.is_none() => {
                self.pending_request.store(true, Ordering::SeqCst);
                return Err(Error::NotReady);
            }
            Err(err) => return Err(err),
        };
        self.prepare_to_waiting_prev()?;
        Ok(id)
    }

    /// Updates the default TX data without starting a transfer.
    pub fn update_default(&self, template: &Xfer, force_size_change: bool) -> Result<XferId, Error> {
        if self.state.is_closing() {
            debug!("closing, update rejected");
            return Err(Error::NotReady);
        }
        let id = unwrap!(self.idle_to_prepare(Some(template), force_size_change)?);
        self.to_idle(State::XferPrepare, false, None)?;
        Ok(id)
    }

    pub fn init(&self, template: &Xfer) -> Result<(), Error> {
        info!("starting initialization");
        if template.size() == 0 {
            error!("incorrect input, abort");
            return Err(Error::NoXfer);
        }
        if self.state.get() != State::Cold {
            info!("device is already initialized, will reuse it");
            return Ok(());
        }

        self.next_xfer_id
            .store(XferId::INITIAL.into_u32(), Ordering::SeqCst);
        let id = self.take_next_id();
        self.slot.lock(|slot| slot.borrow_mut().install(template, id))?;
        self.init_level.store(LEVEL_XFER_CREATED, Ordering::SeqCst);
        trace!("init level: transfer created");

        self.ledger.lock(|ledger| ledger.borrow_mut().reset());
        self.stats.reset();
        self.last_error.store(0, Ordering::SeqCst);
        self.pending_request.store(false, Ordering::SeqCst);
        self.work.clear();

        // Self-consistent with the regular flow: the peer counts as done
        // with the previous cycle, either there was none or it ended in a
        // completed recovery.
        self.drop_counter.store(1, Ordering::SeqCst);

        self.flags.deassert_our();
        self.init_level.store(LEVEL_ISR_LIVE, Ordering::SeqCst);
        trace!("init level: edge dispatch live");

        self.state.clear_closing();
        self.state.switch_forced(State::Idle);
        self.init_level.store(LEVEL_FULL, Ordering::SeqCst);
        info!("initialization done");

        // A peer request may predate us. There is no previous cycle yet,
        // so the raw level is the request, not the release accounting.
        if self.flags.peer_asserted() {
            let _ = self.exchange(None, false);
        }
        Ok(())
    }

    pub async fn close(&self) -> Result<(), Error> {
        if !self.state.latch_closing() {
            error!("device is closing already");
            return Err(Error::AlreadyClosing);
        }
        if self.state.get() == State::Cold {
            error!("device is already closed");
            return Ok(());
        }
        info!("closing started");

        // Consumer entries and all strict switches except leaving Xfer are
        // rejected from here on. An in-flight burst is the only thing worth
        // waiting for: the hardware cannot be aborted.
        if self.init_level.load(Ordering::SeqCst) >= LEVEL_FULL && self.state.get() == State::Xfer
        {
            match select(self.state.leave_xfer(), Timer::after(self.config.close_wait)).await {
                Either::First(()) => {}
                Either::Second(()) => {
                    error!("timeout waiting for the burst to finish, will force abort");
                }
            }
        }

        if self.init_level.load(Ordering::SeqCst) >= LEVEL_ISR_LIVE {
            self.init_level.store(LEVEL_XFER_CREATED, Ordering::SeqCst);
            trace!("init level: transfer created");
            self.flags.deassert_our();
            self.work.cancel();
        }

        if self.state.switch_forced(State::Cold) == State::Cold {
            warn!("on closing the device was already cold");
        }

        // Only pending worker items could bother us from this point, and
        // every worker sequence re-validates the state it serves.
        self.work.clear();
        self.slot.lock(|slot| slot.borrow_mut().free());
        self.init_level.store(LEVEL_COLD, Ordering::SeqCst);
        info!("closing done");
        Ok(())
    }

    pub async fn reset(&self, template: Option<&Xfer>) -> Result<(), Error> {
        let preserved = match template {
            Some(_) => None,
            None => self.slot.lock(|slot| {
                let slot = slot.borrow();
                if slot.is_valid() {
                    slot.clone_current()
                } else {
                    None
                }
            }),
        };
        let Some(template) = template.or(preserved.as_ref()) else {
            error!("incorrect input, abort");
            return Err(Error::NoXfer);
        };

        let _ = self.close().await;
        self.init(template)
    }

    /* -------------------- handshake sequences ------------------------ */

    fn idle_to_prepare(
        &self,
        template: Option<&Xfer>,
        force_size_change: bool,
    ) -> Result<Option<XferId>, Error> {
        if !self.state.switch_strict(State::Idle, State::XferPrepare) {
            debug!("transfer request while not idle");
            return Err(Error::NotReady);
        }
        self.error_check(None, "request")?;

        // From here we own the workflow: nothing else reads or writes the
        // current transfer even if our interrupts fire; only the release
        // counter and the state word can still move under us.
        match template {
            None => Ok(None),
            Some(template) => self.update_xfer(template, force_size_change).map(Some),
        }
    }

    fn update_xfer(&self, template: &Xfer, force_size_change: bool) -> Result<XferId, Error> {
        let state = self.state.get();
        let id = self.take_next_id();
        let res = self
            .slot
            .lock(|slot| slot.borrow_mut().replace(template, id, state, force_size_change));
        if let Err(err) = res {
            error!("transfer update failed: {:?}", err);
            // input mistakes leave no mark on the cycle; memory and logic
            // faults go through the error path
            let internal = matches!(err, Error::NoMemory | Error::Logical).then_some(err);
            if state != State::Error {
                let _ = self.to_idle(state, false, internal);
            }
            return Err(err);
        }
        Ok(id)
    }

    fn prepare_to_waiting_prev(&self) -> Result<(), Error> {
        self.flags.assert_our();

        // the prepare stage may have lasted a while; do not enter the wire
        // sequence against an already signaled peer error
        self.error_check(None, "prepare")?;

        if self
            .state
            .switch_strict(State::XferPrepare, State::WaitingPrev)
        {
            self.work.arm(Instant::now() + self.config.peer_wait_timeout);
        }

        // the slave bypasses the waiting state; the master proceeds once
        // the peer released the previous cycle
        if self.drop_counter.load(Ordering::SeqCst) == 1 || !self.config.role.is_master() {
            return self.try_leave_waiting_prev();
        }
        Ok(())
    }

    fn try_leave_waiting_prev(&self) -> Result<(), Error> {
        if !self.config.role.is_master() || self.config.hardware_ready {
            if self.state.switch_strict(State::WaitingPrev, State::Xfer) {
                self.work.cancel();
                return self.submit_burst();
            }
            return Ok(());
        }

        if self.state.switch_strict(State::WaitingPrev, State::WaitingRdy) {
            self.work.arm(Instant::now() + self.config.peer_wait_timeout);
            if self.is_peer_request() {
                return self.try_leave_waiting_rdy();
            }
        }
        Ok(())
    }

    fn try_leave_waiting_rdy(&self) -> Result<(), Error> {
        if self.state.switch_strict(State::WaitingRdy, State::Xfer) {
            self.work.cancel();
            return self.submit_burst();
        }
        Ok(())
    }

    fn submit_burst(&self) -> Result<(), Error> {
        // drop the release accounting right before the burst
        self.drop_counter.store(0, Ordering::SeqCst);

        let burst = self.slot.lock(|slot| {
            let slot = slot.borrow();
            let xfer = slot.current()?;
            let mut config = BusConfig::default();
            self.client.on_configure(xfer, &mut config);
            let tx = unwrap!(Data::new(xfer.tx()));
            Some(Burst { tx, config })
        });
        let Some(burst) = burst else {
            self.handle_error(Error::Logical, 0, "submit");
            return Err(Error::Logical);
        };

        if let Err(code) = self.bus.submit(&burst) {
            error!("bus layer rejected the burst: {}", code);
            self.handle_error(Error::BusLayer, code, "submit");
            return Err(Error::BusLayer);
        }
        Ok(())
    }

    /// Finalizes a cycle: back to idle, then replay whatever request
    /// accumulated meanwhile.
    fn to_idle(
        &self,
        from: State,
        start_next: bool,
        internal_error: Option<Error>,
    ) -> Result<(), Error> {
        // absorbs a deadline that survived the arm/cancel shuffle of the
        // finished cycle
        self.work.cancel();

        self.state.switch_strict(from, State::Idle);

        if from != State::Error {
            self.error_check(internal_error, "to-idle")?;
        } else {
            info!("recovered, resuming");
        }

        let start = start_next || self.pending_request.swap(false, Ordering::SeqCst);
        if start || self.is_peer_request() {
            // re-enter through the worker: the self-request then looks like
            // any external one and holds no state resources of this cycle
            self.work.schedule(Work::DoXfer);
        }
        Ok(())
    }

    /// Whether the peer requested a transfer since the last cycle started.
    fn is_peer_request(&self) -> bool {
        self.drop_counter.load(Ordering::SeqCst) == 1 && self.flags.peer_asserted()
    }

    fn take_next_id(&self) -> XferId {
        let id = XferId::try_from(self.next_xfer_id.load(Ordering::SeqCst))
            .unwrap_or(XferId::INITIAL);
        self.next_xfer_id
            .store(id.next().into_u32(), Ordering::SeqCst);
        id
    }

    fn peek_next_id(&self) -> XferId {
        XferId::try_from(self.next_xfer_id.load(Ordering::SeqCst)).unwrap_or(XferId::INITIAL)
    }

    /* ----------------------- error routing --------------------------- */

    /// Accounts the error and routes the state machine toward recovery.
    /// Callable from any context.
    pub fn handle_error(&self, kind: Error, sub_code: i32, site: &'static str) {
        match kind {
            Error::OtherSide => {
                self.stats.other_side_indicated.fetch_add(1, Ordering::Relaxed);
            }
            Error::WaitOtherSide => {
                self.stats.other_side_silent.fetch_add(1, Ordering::Relaxed);
            }
            _ => {}
        }

        let verbose = self
            .ledger
            .lock(|ledger| ledger.borrow_mut().report(kind, sub_code, site));

        // The state can move between observations, so walk until a stable
        // picture emerges: every iteration either wins a CAS, observes a
        // sink, or defers to the bounded bus completion.
        loop {
            if self.state.switch_strict(State::Idle, State::Error)
                || self.state.switch_strict(State::XferPrepare, State::Error)
                || self.state.switch_strict(State::WaitingPrev, State::Error)
                || self.state.switch_strict(State::WaitingRdy, State::Error)
                || self.state.switch_strict(State::Postprocessing, State::Error)
            {
                if verbose {
                    warn!("scheduling recovery");
                }
                self.last_error.store(kind.into_u8(), Ordering::SeqCst);
                // not a direct call: recovery waits out silence intervals,
                // which must not happen in this context
                self.work.schedule(Work::Recover);
                return;
            }

            match self.state.get() {
                // sinks: nothing new to do about the error
                State::Cold | State::Error => return,
                State::Xfer => {
                    self.last_error.store(kind.into_u8(), Ordering::SeqCst);
                    debug!("recovery postponed till the burst completes");
                    // a completion may have raced us out of Xfer already
                    if self.state.switch_strict(State::Postprocessing, State::Error) {
                        self.work.schedule(Work::Recover);
                    }
                    return;
                }
                // every CAS above is rejected while closing; the teardown
                // owns the state from here
                _ if self.state.is_closing() => return,
                _ => {}
            }
        }
    }

    /// Enters the error path when an error is pending from either side.
    fn error_check(&self, internal_error: Option<Error>, site: &'static str) -> Result<(), Error> {
        let peer_error = self.drop_counter.load(Ordering::SeqCst) > 1;
        if internal_error.is_none() && !peer_error {
            return Ok(());
        }
        let kind = internal_error.unwrap_or(Error::OtherSide);
        self.handle_error(kind, 0, site);
        Err(kind)
    }

    /* ----------------------- interrupt glue -------------------------- */

    /// Dispatches one edge of the peer flag line. Interrupt context.
    fn peer_edge(&self) {
        if self.init_level.load(Ordering::SeqCst) < LEVEL_ISR_LIVE {
            return;
        }
        if self.state.get() == State::Cold {
            return;
        }
        trace!("peer flag edge");

        if self.flags.peer_asserted() {
            self.peer_asserted_edge();
        } else {
            self.peer_released_edge();
        }

        self.stats.peer_flag_edges.fetch_add(1, Ordering::Relaxed);
    }

    fn peer_asserted_edge(&self) {
        // peer-initiated transfer: enter the pipeline right here, without a
        // worker round-trip, to keep the reaction latency down; the
        // prepare sequence is light and deterministic
        if self.state.switch_strict(State::Idle, State::XferPrepare) {
            let _ = self.prepare_to_waiting_prev();
            return;
        }

        // without the hardware ready handshake, the master triggers the
        // burst on the peer readiness itself
        if self.config.role.is_master() && !self.config.hardware_ready {
            let _ = self.try_leave_waiting_rdy();
        }
    }

    fn peer_released_edge(&self) {
        let count = self.drop_counter.fetch_add(1, Ordering::SeqCst) + 1;

        // the release accounting is all a slave needs from this edge
        if count == 1 && self.config.role.is_master() {
            let _ = self.try_leave_waiting_prev();
            return;
        }

        if count >= 2 {
            self.handle_error(Error::OtherSide, 0, "edge");
            return;
        }

        if count <= 0 {
            error!("unexpected peer flag release accounting, something is really broken");
            self.handle_error(Error::Logical, 0, "edge");
        }
    }

    /// Takes over the finished burst. Completion context, cannot sleep.
    fn bus_complete(&self, completion: &Completion) {
        // no one except us exits the xfer state; even error handling is
        // postponed until the hardware is done
        if !self.state.switch_strict(State::Xfer, State::Postprocessing) {
            self.handle_error(Error::Logical, 0, "complete");
            return;
        }

        self.slot
            .lock(|slot| slot.borrow_mut().write_rx(&completion.rx));

        // trigger the postponed error handling if needed
        if let Some(pending) = Error::try_from_u8(self.last_error.load(Ordering::SeqCst)) {
            self.handle_error(pending, 0, "complete");
            return;
        }

        if completion.status != 0 {
            self.handle_error(Error::BusLayer, completion.status, "complete");
            return;
        }

        self.stats.bursts_done.fetch_add(1, Ordering::Relaxed);

        // the data delivery may sleep on consumer callbacks, hand it to
        // the worker
        self.work.schedule(Work::Postprocess);
    }

    /* ------------------------- worker side --------------------------- */

    /// The worker loop. Run exactly one instance per device.
    pub async fn run_worker(&self) -> ! {
        loop {
            match self.work.next().await {
                Work::DoXfer => {
                    let _ = self.exchange(None, false);
                }
                Work::Postprocess => self.run_postprocess().await,
                Work::Recover => self.run_recovery().await,
                Work::Timeout => self.handle_error(Error::WaitOtherSide, 0, "timeout"),
            }
        }
    }

    /// Delivers the finished transfer to the consumer and closes the cycle.
    async fn run_postprocess(&self) {
        if self.state.get() != State::Postprocessing {
            // overtaken by an error or by the teardown
            return;
        }

        let snapshot = self.slot.lock(|slot| {
            let mut slot = slot.borrow_mut();
            slot.bump_counter();
            slot.clone_current()
        });
        let Some(snapshot) = snapshot else {
            self.handle_error(Error::Logical, 0, "postprocess");
            return;
        };

        let mut start_immediately = false;
        let verdict = self
            .client
            .on_done(&snapshot, self.peek_next_id(), &mut start_immediately);

        match verdict {
            Verdict::Halt => {
                // our flag stays asserted: the peer sees the link halted
                // until an explicit reset
                info!("device was halted by consumer request");
                return;
            }
            Verdict::Replace(new_xfer) => {
                // a size change at the end of a cycle is fine, both sides
                // are between bursts
                match self.update_xfer(&new_xfer, true) {
                    Ok(id) => self.client.on_accepted(id),
                    Err(_) => {
                        self.flags.deassert_our();
                        self.silence().await;
                        return;
                    }
                }
            }
            Verdict::Keep => {}
        }

        self.flags.deassert_our();
        self.silence().await;

        // only after the data delivery the cycle is really done
        let _ = self.to_idle(State::Postprocessing, start_immediately, None);
    }

    /// Signals the error to the peer and brings the communication back.
    async fn run_recovery(&self) {
        if self.state.get() != State::Error {
            return;
        }
        let kind =
            Error::try_from_u8(self.last_error.load(Ordering::SeqCst)).unwrap_or(Error::Logical);
        let verbose = self.ledger.lock(|ledger| ledger.borrow().last_reported(kind));
        if verbose {
            warn!("starting recovery after error {}", kind.into_u8());
        }

        self.work.cancel();

        // wire-level error indication: five edges with full silence gaps,
        // so the peer observes at least two falling edges within one cycle
        for active in [false, true, false, true, false] {
            if self.torn_down() {
                return;
            }
            if active {
                self.flags.assert_our();
            } else {
                self.flags.deassert_our();
            }
            self.silence().await;
        }

        // idle silence to give the peer time to react
        Timer::after(self.config.recovery_silence).await;
        if self.torn_down() {
            return;
        }

        let Some(snapshot) = self.slot.lock(|slot| slot.borrow().clone_current()) else {
            return;
        };
        match self.client.on_fail(&snapshot, self.peek_next_id(), kind) {
            Verdict::Halt => {
                warn!("device was halted by consumer request");
                return;
            }
            Verdict::Replace(new_xfer) => {
                if verbose {
                    warn!("consumer provided a transfer update");
                }
                match self.update_xfer(&new_xfer, true) {
                    Ok(id) => self.client.on_accepted(id),
                    Err(err) => {
                        warn!(
                            "recovery failed, could not apply the transfer update: {:?}, device halted",
                            err
                        );
                        return;
                    }
                }
            }
            Verdict::Keep => {
                if verbose {
                    warn!("restarting the current transfer");
                }
            }
        }

        // the peer error indication is consumed; one release is what a
        // clean cycle start expects
        self.drop_counter.store(1, Ordering::SeqCst);
        self.last_error.store(0, Ordering::SeqCst);
        if verbose {
            warn!("recovery completed");
        }
        let _ = self.to_idle(State::Error, false, None);
    }

    /// Minimal inactive interval on our flag, so the peer reliably samples
    /// the edge.
    async fn silence(&self) {
        Timer::after(self.config.inactive_min).await;
    }

    /// Whether the teardown owns the device; worker sequences step aside
    /// after every suspension point.
    fn torn_down(&self) -> bool {
        self.state.is_closing() || self.state.get() == State::Cold
    }
}

impl<'a, M: RawMutex> DynamicEdgeSink for Core<'a, M> {
    fn edge(&self) {
        self.peer_edge();
    }

    fn trigger(&self) -> EdgeTrigger {
        if self.config.hardware_ready {
            EdgeTrigger::Falling
        } else {
            EdgeTrigger::Both
        }
    }
}

impl<'a, M: RawMutex> DynamicCompletionSink for Core<'a, M> {
    fn complete(&self, completion: &Completion) {
        self.bus_complete(completion);
    }
}
