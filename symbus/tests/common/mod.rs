//! Shared mock ports, client recorder and executor plumbing for the
//! scenario tests.
#![allow(dead_code)]

use std::boxed::Box;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::vec::Vec;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::{Duration, MockDriver};
use futures_executor::LocalPool;
use futures_task::LocalSpawn;

use symbus::burst::{Burst, Completion, Data};
use symbus::client::{Client, Verdict};
use symbus::core::{Error, XferId};
use symbus::port::{BusPort, CompletionSink, EdgeSink, FlagIn, FlagOut};
use symbus::{Config, Handle, Runner, SymBus, Xfer};

// Mock time is process-global; scenarios take this lock to keep their
// timelines apart.
static TEST_LOCK: Mutex<()> = Mutex::new(());

pub fn lock() -> MutexGuard<'static, ()> {
    TEST_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Bus port capturing submitted bursts.
#[derive(Default)]
pub struct TestBus {
    submitted: Mutex<Vec<Burst>>,
    reject_next: Mutex<Option<i32>>,
}

impl TestBus {
    pub fn submitted_count(&self) -> usize {
        self.submitted.lock().unwrap().len()
    }

    pub fn last_tx(&self) -> Option<Vec<u8>> {
        self.submitted
            .lock()
            .unwrap()
            .last()
            .map(|burst| burst.tx.to_vec())
    }

    /// Makes the next submission fail synchronously with `code`.
    pub fn reject_next(&self, code: i32) {
        *self.reject_next.lock().unwrap() = Some(code);
    }
}

impl BusPort for TestBus {
    fn submit(&self, burst: &Burst) -> Result<(), i32> {
        if let Some(code) = self.reject_next.lock().unwrap().take() {
            return Err(code);
        }
        self.submitted.lock().unwrap().push(*burst);
        Ok(())
    }
}

/// Our flag line recorder.
#[derive(Default)]
pub struct TestFlagOut {
    writes: Mutex<Vec<bool>>,
}

impl TestFlagOut {
    pub fn level(&self) -> bool {
        self.writes.lock().unwrap().last().copied().unwrap_or(false)
    }

    /// Level changes since the last clear, consecutive rewrites collapsed.
    /// The first recorded write is the comparison baseline.
    pub fn changes(&self) -> Vec<bool> {
        let writes = self.writes.lock().unwrap();
        let mut changes: Vec<bool> = Vec::new();
        let Some(mut level) = writes.first().copied() else {
            return changes;
        };
        for write in writes.iter().skip(1) {
            if *write != level {
                changes.push(*write);
                level = *write;
            }
        }
        changes
    }

    pub fn clear(&self) {
        let level = self.level();
        let mut writes = self.writes.lock().unwrap();
        writes.clear();
        // the standing level becomes the new baseline
        writes.push(level);
    }
}

impl FlagOut for TestFlagOut {
    fn set_level(&self, high: bool) {
        self.writes.lock().unwrap().push(high);
    }
}

/// Peer flag line stub, set by the test body.
#[derive(Default)]
pub struct TestFlagIn {
    level: AtomicBool,
}

impl TestFlagIn {
    pub fn set(&self, high: bool) {
        self.level.store(high, Ordering::SeqCst);
    }
}

impl FlagIn for TestFlagIn {
    fn level(&self) -> bool {
        self.level.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub struct DoneEvent {
    pub id: u32,
    pub counter: u32,
    pub next_id: u32,
    pub rx: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct FailEvent {
    pub id: u32,
    pub next_id: u32,
    pub error: Error,
}

/// Scripted verdict for the next done/fail callback.
pub enum NextVerdict {
    Keep,
    Halt,
    Replace(Vec<u8>),
}

impl NextVerdict {
    fn into_verdict(self) -> Verdict {
        match self {
            NextVerdict::Keep => Verdict::Keep,
            NextVerdict::Halt => Verdict::Halt,
            NextVerdict::Replace(tx) => Verdict::Replace(Xfer::new(&tx).unwrap()),
        }
    }
}

/// Consumer recorder with scriptable verdicts (default: keep the current
/// descriptor).
#[derive(Default)]
pub struct TestClient {
    done: Mutex<Vec<DoneEvent>>,
    failed: Mutex<Vec<FailEvent>>,
    accepted: Mutex<Vec<u32>>,
    done_verdicts: Mutex<VecDeque<NextVerdict>>,
    fail_verdicts: Mutex<VecDeque<NextVerdict>>,
    start_next: AtomicBool,
}

impl TestClient {
    pub fn done_events(&self) -> Vec<DoneEvent> {
        self.done.lock().unwrap().clone()
    }

    pub fn fail_events(&self) -> Vec<FailEvent> {
        self.failed.lock().unwrap().clone()
    }

    pub fn accepted_ids(&self) -> Vec<u32> {
        self.accepted.lock().unwrap().clone()
    }

    pub fn script_done(&self, verdict: NextVerdict) {
        self.done_verdicts.lock().unwrap().push_back(verdict);
    }

    pub fn script_fail(&self, verdict: NextVerdict) {
        self.fail_verdicts.lock().unwrap().push_back(verdict);
    }

    /// Makes the next done callback request an immediate follow-up.
    pub fn request_start_immediately(&self) {
        self.start_next.store(true, Ordering::SeqCst);
    }
}

impl Client for TestClient {
    fn on_done(&self, done: &Xfer, next_id: XferId, start_immediately: &mut bool) -> Verdict {
        self.done.lock().unwrap().push(DoneEvent {
            id: done.id().into_u32(),
            counter: done.counter(),
            next_id: next_id.into_u32(),
            rx: done.rx().to_vec(),
        });
        if self.start_next.swap(false, Ordering::SeqCst) {
            *start_immediately = true;
        }
        self.done_verdicts
            .lock()
            .unwrap()
            .pop_front()
            .map(NextVerdict::into_verdict)
            .unwrap_or(Verdict::Keep)
    }

    fn on_fail(&self, current: &Xfer, next_id: XferId, error: Error) -> Verdict {
        self.failed.lock().unwrap().push(FailEvent {
            id: current.id().into_u32(),
            next_id: next_id.into_u32(),
            error,
        });
        self.fail_verdicts
            .lock()
            .unwrap()
            .pop_front()
            .map(NextVerdict::into_verdict)
            .unwrap_or(Verdict::Keep)
    }

    fn on_accepted(&self, id: XferId) {
        self.accepted.lock().unwrap().push(id.into_u32());
    }
}

type M = CriticalSectionRawMutex;

pub struct Fixture {
    pub handle: Handle<'static, M>,
    pub edges: EdgeSink<'static>,
    pub completions: CompletionSink<'static>,
    pub bus: &'static TestBus,
    pub flag_out: &'static TestFlagOut,
    pub flag_in: &'static TestFlagIn,
    pub client: &'static TestClient,
}

/// Builds a device over fresh mocks and spawns its runner on a local pool.
pub fn fixture(config: Config) -> (Fixture, LocalPool) {
    let bus: &'static TestBus = Box::leak(Box::new(TestBus::default()));
    let flag_out: &'static TestFlagOut = Box::leak(Box::new(TestFlagOut::default()));
    let flag_in: &'static TestFlagIn = Box::leak(Box::new(TestFlagIn::default()));
    let client: &'static TestClient = Box::leak(Box::new(TestClient::default()));

    let device = Box::leak(Box::new(SymBus::<M>::new(
        bus, flag_out, flag_in, client, config,
    )));
    let (handle, edges, completions, runner) = device.split();

    let pool = LocalPool::new();
    pool.spawner()
        .spawn_local_obj(Box::new(runner_task(runner)).into())
        .unwrap();

    (
        Fixture {
            handle,
            edges,
            completions,
            bus,
            flag_out,
            flag_in,
            client,
        },
        pool,
    )
}

async fn runner_task(mut runner: Runner<'static, M>) {
    runner.run().await
}

pub fn completion_ok(rx: &[u8]) -> Completion {
    Completion {
        status: 0,
        rx: Data::new(rx).unwrap(),
    }
}

/// Walks mock time forward in half-millisecond steps, draining the executor
/// after each step so every armed timer gets its turn.
pub fn run_for(pool: &mut LocalPool, total: Duration) {
    pool.run_until_stalled();
    let step = Duration::from_micros(500);
    let mut elapsed = Duration::from_ticks(0);
    while elapsed < total {
        MockDriver::get().advance(step);
        elapsed += step;
        pool.run_until_stalled();
    }
}
