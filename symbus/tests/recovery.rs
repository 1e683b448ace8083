//! Error detection and the wire-level recovery sequence: peer error
//! indication, peer timeouts, bus layer failures, and consumer verdicts.

mod common;

use common::{NextVerdict, completion_ok, fixture, run_for};
use embassy_time::Duration;
use symbus::Config;
use symbus::Xfer;
use symbus::core::{Error, Role};

fn master_hw_ready() -> Config {
    let mut config = Config::new(Role::Master);
    config.hardware_ready = true;
    config
}

// Covers the pulse train plus the recovery silence with a wide margin.
const RECOVERY_TIME: Duration = Duration::from_millis(40);

#[test]
fn test_peer_error_indication_recovers() {
    let _guard = common::lock();
    let (f, mut pool) = fixture(master_hw_ready());

    f.handle.init(&Xfer::new(&[0x00; 64]).unwrap()).unwrap();
    f.handle.exchange(None, false).unwrap();
    assert_eq!(f.bus.submitted_count(), 1);

    // two falling edges of the peer flag within one cycle: the peer
    // signals an error
    f.flag_in.set(false);
    f.edges.edge();
    f.edges.edge();

    // the burst is still owned by the hardware; recovery waits for it
    run_for(&mut pool, Duration::from_millis(1));
    assert_eq!(f.client.fail_events().len(), 0);

    f.flag_out.clear();
    f.completions.complete(&completion_ok(&[0u8; 64]));
    run_for(&mut pool, RECOVERY_TIME);

    // no data delivery for the failed cycle
    assert_eq!(f.client.done_events().len(), 0);

    // the error pulse train appeared on our flag
    assert_eq!(
        f.flag_out.changes(),
        vec![false, true, false, true, false]
    );

    let failed = f.client.fail_events();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].error, Error::OtherSide);
    assert_eq!(failed[0].id, 1);

    // back in business: a new cycle starts cleanly
    f.handle.exchange(None, false).unwrap();
    assert_eq!(f.bus.submitted_count(), 2);
}

#[test]
fn test_peer_timeout_recovers() {
    let _guard = common::lock();
    let (f, mut pool) = fixture(Config::new(Role::Master));

    f.handle.init(&Xfer::new(&[0x01; 16]).unwrap()).unwrap();
    f.handle.exchange(None, false).unwrap();

    // no peer reaction at all: the burst is never triggered
    assert_eq!(f.bus.submitted_count(), 0);
    f.flag_out.clear();

    // outlast the peer wait timeout, then the recovery sequence
    run_for(&mut pool, Duration::from_millis(70));
    run_for(&mut pool, RECOVERY_TIME);

    let failed = f.client.fail_events();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].error, Error::WaitOtherSide);

    assert_eq!(
        f.flag_out.changes(),
        vec![false, true, false, true, false]
    );

    // the device is idle again and accepts requests
    f.handle.exchange(None, false).unwrap();
    assert!(f.flag_out.level());
}

#[test]
fn test_bus_rejection_recovers() {
    let _guard = common::lock();
    let (f, mut pool) = fixture(master_hw_ready());

    f.handle.init(&Xfer::new(&[0x02; 8]).unwrap()).unwrap();

    f.bus.reject_next(-5);
    assert_eq!(f.handle.exchange(None, false).unwrap_err(), Error::BusLayer);

    run_for(&mut pool, RECOVERY_TIME);
    let failed = f.client.fail_events();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].error, Error::BusLayer);

    // the rejection did not wedge the device
    f.handle.exchange(None, false).unwrap();
    assert_eq!(f.bus.submitted_count(), 1);
}

#[test]
fn test_bus_completion_error_recovers() {
    let _guard = common::lock();
    let (f, mut pool) = fixture(master_hw_ready());

    f.handle.init(&Xfer::new(&[0x03; 8]).unwrap()).unwrap();
    f.handle.exchange(None, false).unwrap();

    f.completions.complete(&symbus::burst::Completion {
        status: -71,
        rx: symbus::burst::Data::new(&[0u8; 8]).unwrap(),
    });
    run_for(&mut pool, RECOVERY_TIME);

    assert_eq!(f.client.done_events().len(), 0);
    let failed = f.client.fail_events();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].error, Error::BusLayer);
}

#[test]
fn test_fail_verdict_replace_resumes_with_new_data() {
    let _guard = common::lock();
    let (f, mut pool) = fixture(Config::new(Role::Master));

    f.handle.init(&Xfer::new(&[0x04; 8]).unwrap()).unwrap();
    f.client.script_fail(NextVerdict::Replace(vec![0x05; 8]));

    f.handle.exchange(None, false).unwrap();
    run_for(&mut pool, Duration::from_millis(70));
    run_for(&mut pool, RECOVERY_TIME);
    assert_eq!(f.client.fail_events().len(), 1);
    assert_eq!(f.client.accepted_ids().len(), 1);

    // the resumed communication carries the replacement data
    f.handle.exchange(None, false).unwrap();
    f.flag_in.set(true);
    f.edges.edge();
    assert_eq!(f.bus.last_tx().unwrap(), vec![0x05; 8]);
}

#[test]
fn test_fail_verdict_halt_stops_device() {
    let _guard = common::lock();
    let (f, mut pool) = fixture(Config::new(Role::Master));

    f.handle.init(&Xfer::new(&[0x06; 8]).unwrap()).unwrap();
    f.client.script_fail(NextVerdict::Halt);

    f.handle.exchange(None, false).unwrap();
    run_for(&mut pool, Duration::from_millis(70));
    run_for(&mut pool, RECOVERY_TIME);
    assert_eq!(f.client.fail_events().len(), 1);

    // halted: new requests are refused until an explicit reset
    assert_eq!(f.handle.exchange(None, false).unwrap_err(), Error::NotReady);
    assert_eq!(f.bus.submitted_count(), 0);
}

#[test]
fn test_done_verdict_halt_keeps_flag_asserted() {
    let _guard = common::lock();
    let (f, mut pool) = fixture(master_hw_ready());

    f.handle.init(&Xfer::new(&[0x07; 8]).unwrap()).unwrap();
    f.client.script_done(NextVerdict::Halt);

    f.handle.exchange(None, false).unwrap();
    f.completions.complete(&completion_ok(&[0u8; 8]));
    run_for(&mut pool, Duration::from_millis(2));

    assert_eq!(f.client.done_events().len(), 1);
    // the link shows busy to the peer until reset
    assert!(f.flag_out.level());
    assert_eq!(f.handle.exchange(None, false).unwrap_err(), Error::NotReady);
}

#[test]
fn test_peer_edges_counted() {
    let _guard = common::lock();
    let (f, mut pool) = fixture(master_hw_ready());

    f.handle.init(&Xfer::new(&[0x08; 8]).unwrap()).unwrap();
    f.handle.exchange(None, false).unwrap();
    f.completions.complete(&completion_ok(&[0u8; 8]));
    run_for(&mut pool, Duration::from_millis(2));

    // a clean release edge from the peer after the cycle
    f.flag_in.set(false);
    f.edges.edge();

    let mut info = vec![0u8; 2048];
    let count = f.handle.read_info(0, &mut info);
    let text = std::str::from_utf8(&info[..count]).unwrap();
    assert!(text.contains("peer flag edges detected:  1"));
    assert!(text.contains("bursts done OK:  1"));
}
