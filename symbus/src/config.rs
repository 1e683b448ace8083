//! Transport configuration

use crate::core::Role;
use crate::time::Duration;

/// Default minimal time our flag stays inactive between a deassert and the
/// next assert. The peer may not detect a faster drop-raise of the line.
pub const INACTIVE_MIN_DEFAULT: Duration = Duration::from_micros(750);

/// Default timeout of waiting for the peer flag reaction.
///
/// Set it high enough that expiry reasonably indicates a hang on the other
/// side which is worth purging with the error indication pulse train; a low
/// value triggers needless recovery cycles that only slow both sides down.
pub const PEER_WAIT_TIMEOUT_DEFAULT: Duration = Duration::from_millis(60);

/// Lower bound of the peer wait timeout. Coarse-grained platform timers make
/// the relative expiry error of shorter timeouts too high, producing false
/// positive timeout indications.
pub const PEER_WAIT_TIMEOUT_MIN: Duration = Duration::from_millis(30);

/// Upper bound of the peer wait timeout.
pub const PEER_WAIT_TIMEOUT_MAX: Duration = Duration::from_millis(1000);

/// Default duration of the silence which immediately follows the error
/// indication pulse train, giving the peer time to react before the normal
/// workflow resumes.
pub const RECOVERY_SILENCE_DEFAULT: Duration = Duration::from_millis(10);

/// Default timeout of waiting for an in-flight burst to finish on close.
pub const CLOSE_WAIT_DEFAULT: Duration = Duration::from_millis(500);

/// Default half-life of the per-kind error rate estimate.
pub const ERROR_DECAY_HALF_LIFE_DEFAULT: Duration = Duration::from_millis(2000);

/// Default minimal time between repeated reports of one error kind.
pub const MIN_REPORT_INTERVAL_DEFAULT: Duration = Duration::from_millis(10_000);

/// Executor placement the worker runner is intended for
///
/// The runner is spawned by the consumer, so the mode is advisory: it
/// records the latency class the deployment was designed around and is
/// surfaced by the diagnostics readout. A transport serving an optional
/// device tolerates the shared default executor; one serving e.g. a
/// hardware watchdog path belongs on a high-priority or private executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RunnerMode {
    /// Shared default-priority executor.
    Shared,
    /// Shared high-priority executor.
    SharedHighPriority,
    /// Executor dedicated to this transport.
    #[default]
    Private,
}

/// Transport configuration
///
/// `Default` mirrors the timing envelope the protocol was tuned for; only
/// the role and the hardware-ready capability normally need adjusting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub struct Config {
    /// Bus role of this side.
    pub role: Role,
    /// Whether the bus controller natively stalls a burst until the peer
    /// signals readiness. When set, the rising edge of the peer flag is
    /// consumed by the controller and the readiness waiting state is
    /// skipped.
    pub hardware_ready: bool,
    /// Minimal inactive time of our flag line.
    pub inactive_min: Duration,
    /// Timeout of waiting for the peer reaction. Clamped into
    /// [`PEER_WAIT_TIMEOUT_MIN`]..=[`PEER_WAIT_TIMEOUT_MAX`].
    pub peer_wait_timeout: Duration,
    /// Silence window following the error indication pulse train.
    pub recovery_silence: Duration,
    /// Bound on waiting for an in-flight burst when closing.
    pub close_wait: Duration,
    /// Advisory executor placement of the worker runner.
    pub runner_mode: RunnerMode,
    /// Log verbosity level the deployment is built with (0..=6); recorded
    /// for the diagnostics readout.
    pub verbosity: u8,
    /// Half-life of the error rate decay.
    pub error_decay_half_life: Duration,
    /// Minimal time between repeated reports of one error kind.
    pub min_report_interval: Duration,
}

impl Config {
    pub fn new(role: Role) -> Self {
        Self {
            role,
            hardware_ready: false,
            inactive_min: INACTIVE_MIN_DEFAULT,
            peer_wait_timeout: PEER_WAIT_TIMEOUT_DEFAULT,
            recovery_silence: RECOVERY_SILENCE_DEFAULT,
            close_wait: CLOSE_WAIT_DEFAULT,
            runner_mode: Default::default(),
            verbosity: 3,
            error_decay_half_life: ERROR_DECAY_HALF_LIFE_DEFAULT,
            min_report_interval: MIN_REPORT_INTERVAL_DEFAULT,
        }
    }

    /// Returns the configuration with out-of-range timings clamped.
    pub(crate) fn validated(mut self) -> Self {
        if self.peer_wait_timeout < PEER_WAIT_TIMEOUT_MIN {
            warn!(
                "peer wait timeout below the platform timer resolution floor, clamping to {} ms",
                PEER_WAIT_TIMEOUT_MIN.as_millis()
            );
            self.peer_wait_timeout = PEER_WAIT_TIMEOUT_MIN;
        }
        if self.peer_wait_timeout > PEER_WAIT_TIMEOUT_MAX {
            warn!(
                "peer wait timeout too high, clamping to {} ms",
                PEER_WAIT_TIMEOUT_MAX.as_millis()
            );
            self.peer_wait_timeout = PEER_WAIT_TIMEOUT_MAX;
        }
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(Role::Master)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_clamping() {
        let mut config = Config::default();
        config.peer_wait_timeout = Duration::from_millis(5);
        assert_eq!(config.validated().peer_wait_timeout, PEER_WAIT_TIMEOUT_MIN);

        config.peer_wait_timeout = Duration::from_millis(5000);
        assert_eq!(config.validated().peer_wait_timeout, PEER_WAIT_TIMEOUT_MAX);

        config.peer_wait_timeout = PEER_WAIT_TIMEOUT_DEFAULT;
        assert_eq!(
            config.validated().peer_wait_timeout,
            PEER_WAIT_TIMEOUT_DEFAULT
        );
    }
}
