//! Error ledger: per-kind statistics, rate estimation, log flood protection
//!
//! Reporting is rate-aware: each kind carries an exponentially smoothed
//! inter-arrival interval, and the derived per-second rate decides whether a
//! report classifies as an error (steady fault) or a warning (occasional
//! glitch). Within the minimal report interval repeats are only counted,
//! not logged, unless the rate crosses the threshold upward.

use crate::core::Error;
use crate::time::{Duration, Instant};

// Lower bound of the decay step, so sequential bursts still age the
// estimate.
const DECAY_MIN_PERCENT: u64 = 3;

#[derive(Default)]
struct Record {
    total: u32,
    suppressed: u32,
    last_report_ms: u64,
    last_occurrence_ms: u64,
    avg_interval_ms: u64,
    last_reported: bool,
}

pub(crate) struct Ledger {
    records: [Record; Error::KIND_COUNT],
    min_report_interval_ms: u64,
    decay_half_life_ms: u64,
}

impl Ledger {
    pub fn new(min_report_interval: Duration, decay_half_life: Duration) -> Self {
        Self {
            records: Default::default(),
            min_report_interval_ms: min_report_interval.as_millis(),
            decay_half_life_ms: decay_half_life.as_millis().max(1),
        }
    }

    pub fn reset(&mut self) {
        self.records = Default::default();
    }

    /// Whether the last occurrence of `kind` made it into the log.
    pub fn last_reported(&self, kind: Error) -> bool {
        self.record_ref(kind).last_reported
    }

    /// Accounts one occurrence of `kind` and decides the log verbosity.
    ///
    /// Returns whether it is OK to be verbose about this occurrence.
    pub fn report(&mut self, kind: Error, sub_code: i32, site: &'static str) -> bool {
        self.report_at(Instant::now().as_millis(), kind, sub_code, site)
    }

    fn report_at(&mut self, now_ms: u64, kind: Error, sub_code: i32, site: &'static str) -> bool {
        let min_report_interval_ms = self.min_report_interval_ms;
        let decay_half_life_ms = self.decay_half_life_ms;
        let record = self.record_mut(kind);

        record.total = record.total.wrapping_add(1);
        let since_report_ms = now_ms.saturating_sub(record.last_report_ms);
        let since_occurrence_ms = now_ms.saturating_sub(record.last_occurrence_ms);
        record.last_occurrence_ms = now_ms;

        // Approximation of the exponential decay at this time point: the
        // step weight grows with the gap between occurrences.
        let decay_percent =
            ((50 * since_occurrence_ms) / decay_half_life_ms).clamp(DECAY_MIN_PERCENT, 100);
        let threshold = u64::from(kind.rate_threshold());
        let prev_rate = 1000 / record.avg_interval_ms.max(1);

        record.avg_interval_ms = (((100 - decay_percent) * record.avg_interval_ms
            + decay_percent * since_occurrence_ms)
            / 100)
            .max(1);
        let rate = 1000 / record.avg_interval_ms;

        let crossed_up = prev_rate < threshold && rate >= threshold;
        if since_report_ms < min_report_interval_ms && !crossed_up {
            record.suppressed = record.suppressed.wrapping_add(1);
            record.last_reported = false;
            return false;
        }

        record.last_report_ms = now_ms;
        record.last_reported = true;

        if rate >= threshold {
            error!(
                "transport error {} (per-sec rate {}): {} (sub-code {}), at {}",
                kind.into_u8(),
                rate,
                kind.describe(),
                sub_code,
                site
            );
        } else {
            warn!(
                "transport warning {} (per-sec rate {}): {} (sub-code {}), at {}",
                kind.into_u8(),
                rate,
                kind.describe(),
                sub_code,
                site
            );
        }

        if record.suppressed > 0 {
            warn!(
                "{} more of kind {} within the last {} ms, total {}",
                record.suppressed,
                kind.into_u8(),
                since_report_ms,
                record.total
            );
            record.suppressed = 0;
        }

        true
    }

    fn record_ref(&self, kind: Error) -> &Record {
        &self.records[kind.into_u8() as usize - 1]
    }

    fn record_mut(&mut self, kind: Error) -> &mut Record {
        &mut self.records[kind.into_u8() as usize - 1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger() -> Ledger {
        Ledger::new(Duration::from_millis(10_000), Duration::from_millis(2000))
    }

    #[test]
    fn test_first_report_after_quiet_start() {
        let mut ledger = ledger();
        assert!(ledger.report_at(20_000, Error::BusLayer, -5, "test"));
        assert!(ledger.last_reported(Error::BusLayer));
    }

    #[test]
    fn test_repeat_suppression() {
        let mut ledger = ledger();
        assert!(ledger.report_at(20_000, Error::BusLayer, 0, "test"));
        assert!(!ledger.report_at(20_500, Error::BusLayer, 0, "test"));
        assert!(!ledger.last_reported(Error::BusLayer));
        assert_eq!(ledger.record_ref(Error::BusLayer).suppressed, 1);

        // the next report past the interval flushes the suppressed count
        assert!(ledger.report_at(31_000, Error::BusLayer, 0, "test"));
        assert_eq!(ledger.record_ref(Error::BusLayer).suppressed, 0);
        assert_eq!(ledger.record_ref(Error::BusLayer).total, 3);
    }

    #[test]
    fn test_kinds_tracked_independently() {
        let mut ledger = ledger();
        assert!(ledger.report_at(20_000, Error::BusLayer, 0, "test"));
        assert!(ledger.report_at(20_001, Error::OtherSide, 0, "test"));
    }

    #[test]
    fn test_threshold_crossing_breaks_suppression() {
        let mut ledger = ledger();
        // a lone occurrence leaves the rate estimate far below 5 per second
        assert!(ledger.report_at(20_000, Error::OtherSide, 0, "test"));
        assert!(!ledger.report_at(20_010, Error::OtherSide, 0, "test"));

        // a steady burst must get one report through before the minimal
        // report interval elapses, on the upward threshold crossing
        let mut now = 20_010;
        let mut crossed = false;
        for _ in 0..1000 {
            now += 10;
            if ledger.report_at(now, Error::OtherSide, 0, "test") {
                crossed = true;
                break;
            }
        }
        assert!(crossed);
        assert!(now - 20_000 < 10_000);
        assert!(1000 / ledger.record_ref(Error::OtherSide).avg_interval_ms >= 5);
    }

    #[test]
    fn test_interval_floor() {
        let mut ledger = ledger();
        ledger.report_at(20_000, Error::Logical, 0, "test");
        for i in 0..100 {
            ledger.report_at(20_000 + i, Error::Logical, 0, "test");
        }
        assert!(ledger.record_ref(Error::Logical).avg_interval_ms >= 1);
    }

    #[test]
    fn test_reset() {
        let mut ledger = ledger();
        ledger.report_at(20_000, Error::BusLayer, 0, "test");
        ledger.reset();
        assert_eq!(ledger.record_ref(Error::BusLayer).total, 0);
        assert!(!ledger.last_reported(Error::BusLayer));
    }
}
