//! Symbus protocol core data types
//!
//! This crate provides basic data type definitions used by other Symbus crates.
//! Symbus users should not depend on this crate directly. Use `symbus::core` reexport instead.
#![no_std]

#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InvalidValue;

/// Side role on the shared bus
///
/// The bus is electrically asymmetric (one side drives the clock), while the
/// transport protocol itself is fully symmetric: either role may initiate a
/// transfer. The role decides whether the waiting states of the handshake
/// apply and which level counts as the active one on each flag line.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Role {
    /// Drives the bus clock and triggers the burst.
    Master,
    /// Follows the master's clock. Bypasses the readiness waiting states:
    /// the slave arms its controller and lets the master clock the burst.
    Slave,
}

impl Role {
    pub const fn is_master(self) -> bool {
        matches!(self, Role::Master)
    }
}

/// Transport controller state
///
/// The type has explicit numeric encoding so that the state word can be kept
/// in an atomic cell and updated by compare-and-swap only.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum State {
    /// Cold and dark: the controller is not initialized, no edge events are
    /// dispatched, the bus is untouched.
    Cold = 0,
    /// Waiting for a transfer request (from either side).
    Idle = 1,
    /// Preparing our data to send; our flag is about to be asserted.
    XferPrepare = 2,
    /// Waiting for the peer to finish with the previous transfer
    /// (its flag has not been released since the previous burst).
    WaitingPrev = 3,
    /// Waiting for the peer to request the next transfer (flag assert).
    ///
    /// Entered only by a master whose bus controller lacks the hardware
    /// ready handshake.
    WaitingRdy = 4,
    /// Hardware controlled burst in flight.
    Xfer = 5,
    /// Burst finished, results are being delivered to the consumer.
    Postprocessing = 6,
    /// An error was detected; recovery is planned or running.
    Error = 7,
}

impl State {
    pub const MAX: State = State::Error;

    pub const fn try_from_u8(code: u8) -> Option<State> {
        if code <= Self::MAX.into_u8() {
            Some(State::from_u8_truncating(code))
        } else {
            None
        }
    }

    pub const fn from_u8_truncating(code: u8) -> State {
        match code & 0x7 {
            0 => State::Cold,
            1 => State::Idle,
            2 => State::XferPrepare,
            3 => State::WaitingPrev,
            4 => State::WaitingRdy,
            5 => State::Xfer,
            6 => State::Postprocessing,
            7 => State::Error,
            _ => unreachable!(),
        }
    }

    pub const fn into_u8(self) -> u8 {
        self as u8
    }
}

impl From<State> for u8 {
    fn from(value: State) -> Self {
        value.into_u8()
    }
}

impl TryFrom<u8> for State {
    type Error = InvalidValue;

    fn try_from(value: u8) -> Result<Self, InvalidValue> {
        Self::try_from_u8(value).ok_or(InvalidValue)
    }
}

/// Classification of an error kind, deciding how it propagates
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ErrorClass {
    /// Triggers the wire-level recovery sequence.
    Transient,
    /// Surfaced to the caller at init/reset time.
    Configuration,
    /// Returned to the caller immediately; no state change.
    Input,
    /// Surfaced to the caller; the current transfer descriptor is reset.
    Resource,
    /// Should never occur in production; triggers recovery for safety.
    Internal,
}

/// Transport error kind
///
/// The type has explicit numeric encoding so that the last pending error can
/// be kept in an atomic cell (with 0 meaning "no error").
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Error {
    /// Logic error; only expected while debugging.
    Logical = 1,
    /// The controller cannot accept the request in its current state.
    NotReady = 2,
    /// No usable device context.
    NoDevice = 3,
    /// No bus channel provided.
    NoBus = 4,
    /// No flag signal line provided.
    NoSignalLine = 5,
    /// No transfer descriptor provided where one is required.
    NoXfer = 6,
    /// Transfer buffers could not be (re)allocated.
    NoMemory = 7,
    /// The requested transfer size differs from the current one at a point
    /// of the cycle where the sides could lose size agreement.
    XferSizeMismatch = 8,
    /// The requested transfer size is zero.
    XferSizeZero = 9,
    /// The supplied TX region is inconsistent with the declared transfer
    /// window: the staged payload would overrun the agreed region.
    Overlap = 10,
    /// The peer signaled an error over its flag line.
    OtherSide = 11,
    /// Timeout waiting for the peer reaction.
    WaitOtherSide = 12,
    /// The underlying bus layer returned an error (see sub-code).
    BusLayer = 13,
    /// The peer flag interrupt line could not be acquired.
    IrqAcquisition = 14,
    /// The peer flag edge handler could not be installed.
    IsrSetup = 15,
    /// The deferred-work runner could not be created.
    RunnerInit = 16,
    /// The device is already being closed.
    AlreadyClosing = 17,
}

impl Error {
    pub const MAX: Error = Error::AlreadyClosing;

    /// Number of distinct error kinds, e.g. for per-kind bookkeeping arrays.
    pub const KIND_COUNT: usize = Self::MAX.into_u8() as usize;

    pub const fn try_from_u8(code: u8) -> Option<Error> {
        match code {
            1 => Some(Error::Logical),
            2 => Some(Error::NotReady),
            3 => Some(Error::NoDevice),
            4 => Some(Error::NoBus),
            5 => Some(Error::NoSignalLine),
            6 => Some(Error::NoXfer),
            7 => Some(Error::NoMemory),
            8 => Some(Error::XferSizeMismatch),
            9 => Some(Error::XferSizeZero),
            10 => Some(Error::Overlap),
            11 => Some(Error::OtherSide),
            12 => Some(Error::WaitOtherSide),
            13 => Some(Error::BusLayer),
            14 => Some(Error::IrqAcquisition),
            15 => Some(Error::IsrSetup),
            16 => Some(Error::RunnerInit),
            17 => Some(Error::AlreadyClosing),
            _ => None,
        }
    }

    pub const fn into_u8(self) -> u8 {
        self as u8
    }

    pub const fn class(self) -> ErrorClass {
        match self {
            Error::OtherSide | Error::WaitOtherSide | Error::BusLayer => ErrorClass::Transient,
            Error::NoDevice
            | Error::NoBus
            | Error::NoSignalLine
            | Error::NoXfer
            | Error::IrqAcquisition
            | Error::IsrSetup
            | Error::RunnerInit => ErrorClass::Configuration,
            Error::NotReady
            | Error::XferSizeMismatch
            | Error::XferSizeZero
            | Error::Overlap
            | Error::AlreadyClosing => ErrorClass::Input,
            Error::NoMemory => ErrorClass::Resource,
            Error::Logical => ErrorClass::Internal,
        }
    }

    /// Whether the kind enters the ledger and the recovery sequence.
    pub const fn is_recoverable(self) -> bool {
        matches!(
            self.class(),
            ErrorClass::Transient | ErrorClass::Internal | ErrorClass::Resource
        )
    }

    /// Occurrences per second separating a steady fault ("error" report
    /// class) from an occasional glitch ("warning" report class).
    ///
    /// Zero means every report of the kind is classified as an error.
    pub const fn rate_threshold(self) -> u32 {
        match self {
            Error::OtherSide | Error::WaitOtherSide => 5,
            _ => 0,
        }
    }

    pub const fn describe(self) -> &'static str {
        match self {
            Error::OtherSide => "more than one falling edge of the peer flag since last burst",
            Error::WaitOtherSide => "timeout waiting for the peer reaction",
            Error::BusLayer => "the bus layer returned an error, see sub-code",
            Error::RunnerInit => "failed to create the deferred-work runner",
            _ => "",
        }
    }
}

impl From<Error> for u8 {
    fn from(value: Error) -> Self {
        value.into_u8()
    }
}

impl TryFrom<u8> for Error {
    type Error = InvalidValue;

    fn try_from(value: u8) -> Result<Self, InvalidValue> {
        Self::try_from_u8(value).ok_or(InvalidValue)
    }
}

/// Transfer descriptor identifier
///
/// Monotonically assigned, strictly positive, bounded by `i32::MAX`.
/// Wraps back to the initial seed, skipping zero.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct XferId(u32);

impl XferId {
    const MAX_VALUE: u32 = i32::MAX as u32;

    /// Identifier of the first transfer after initialization, and the wrap
    /// seed afterwards.
    pub const INITIAL: XferId = XferId(1);

    pub const fn new(value: u32) -> Option<Self> {
        if value >= 1 && value <= Self::MAX_VALUE {
            Some(Self(value))
        } else {
            None
        }
    }

    pub const fn into_u32(self) -> u32 {
        self.0
    }

    pub const fn next(self) -> Self {
        if self.0 >= Self::MAX_VALUE {
            Self::INITIAL
        } else {
            Self(self.0 + 1)
        }
    }
}

impl Default for XferId {
    fn default() -> Self {
        Self::INITIAL
    }
}

impl From<XferId> for u32 {
    fn from(value: XferId) -> Self {
        value.into_u32()
    }
}

impl TryFrom<u32> for XferId {
    type Error = InvalidValue;

    fn try_from(value: u32) -> Result<Self, InvalidValue> {
        Self::new(value).ok_or(InvalidValue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_roundtrip() {
        for code in 0..=State::MAX.into_u8() {
            let state = State::try_from_u8(code).unwrap();
            assert_eq!(state.into_u8(), code);
        }
        assert!(State::try_from_u8(State::MAX.into_u8() + 1).is_none());
    }

    #[test]
    fn test_error_roundtrip() {
        for code in 1..=Error::MAX.into_u8() {
            let error = Error::try_from_u8(code).unwrap();
            assert_eq!(error.into_u8(), code);
        }
        assert!(Error::try_from_u8(0).is_none());
        assert!(Error::try_from_u8(Error::MAX.into_u8() + 1).is_none());
    }

    #[test]
    fn test_error_classes() {
        assert_eq!(Error::OtherSide.class(), ErrorClass::Transient);
        assert_eq!(Error::WaitOtherSide.class(), ErrorClass::Transient);
        assert_eq!(Error::BusLayer.class(), ErrorClass::Transient);
        assert_eq!(Error::NoXfer.class(), ErrorClass::Configuration);
        assert_eq!(Error::XferSizeMismatch.class(), ErrorClass::Input);
        assert_eq!(Error::NoMemory.class(), ErrorClass::Resource);
        assert_eq!(Error::Logical.class(), ErrorClass::Internal);

        assert!(Error::OtherSide.is_recoverable());
        assert!(Error::Logical.is_recoverable());
        assert!(!Error::XferSizeMismatch.is_recoverable());
    }

    #[test]
    fn test_xfer_id_wrap() {
        assert_eq!(XferId::INITIAL.next(), XferId::new(2).unwrap());
        let last = XferId::new(i32::MAX as u32).unwrap();
        assert_eq!(last.next(), XferId::INITIAL);
    }

    #[test]
    fn test_xfer_id_bounds() {
        assert!(XferId::new(0).is_none());
        assert!(XferId::new(1).is_some());
        assert!(XferId::new(i32::MAX as u32).is_some());
        assert!(XferId::new(i32::MAX as u32 + 1).is_none());
    }
}
