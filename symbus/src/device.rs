//! Device object and its split-off access handles
//!
//! ## Examples
//!
//! A device is created cold and split into its access handles:
//! ```ignore
//! use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex as Mutex;
//! use symbus::{Config, SymBus, Xfer};
//!
//! static DEVICE: StaticCell<SymBus<'static, Mutex>> = StaticCell::new();
//! let device = DEVICE.init(SymBus::new(&bus, &flag_out, &flag_in, &client, Config::default()));
//! let (handle, edges, completions, mut runner) = device.split();
//!
//! // wire `edges` into the peer flag interrupt, `completions` into the bus
//! // driver, spawn `runner.run()`, then:
//! handle.init(&Xfer::new(&[0u8; 64]).unwrap()).unwrap();
//! ```

use embassy_sync::blocking_mutex::raw::RawMutex;

use crate::client::Client;
use crate::config::Config;
use crate::core::{Error, XferId};
use crate::diag;
use crate::engine::Core;
use crate::port::{BusPort, CompletionSink, EdgeSink, FlagIn, FlagOut};
use crate::xfer::Xfer;

/// The symmetric full-duplex transport device
///
/// Owns the complete state of one transport: the state machine, the current
/// transfer descriptor and its buffers, the error ledger, and the
/// statistics. The bus channel, the two flag lines, and the client hooks
/// are borrowed; the consumer keeps them alive and untouched while the
/// device is not cold.
pub struct SymBus<'a, M: RawMutex> {
    core: Core<'a, M>,
}

impl<'a, M: RawMutex + Sync> SymBus<'a, M> {
    /// Creates the device in the cold state.
    ///
    /// Out-of-range timing configuration is clamped, see `config`.
    pub fn new(
        bus: &'a (dyn BusPort + Sync),
        flag_out: &'a (dyn FlagOut + Sync),
        flag_in: &'a (dyn FlagIn + Sync),
        client: &'a (dyn Client + Sync),
        config: Config,
    ) -> Self {
        Self {
            core: Core::new(bus, flag_out, flag_in, client, config),
        }
    }

    /// Splits the device into its access handles.
    ///
    /// Wire the [`EdgeSink`] into the peer flag edge interrupt and the
    /// [`CompletionSink`] into the bus driver completion path, then run the
    /// [`Runner`] for proper operation.
    pub fn split(&mut self) -> (Handle<'_, M>, EdgeSink<'_>, CompletionSink<'_>, Runner<'_, M>) {
        (
            Handle { core: &self.core },
            EdgeSink::new(&self.core),
            CompletionSink::new(&self.core),
            Runner { core: &self.core },
        )
    }
}

/// Consumer request API of a transport device
///
/// All operations are safe with respect to each other and to the interrupt
/// sinks, except [`init`](Self::init) and [`reset`](Self::reset): those
/// require that no other call is in flight.
pub struct Handle<'a, M: RawMutex> {
    core: &'a Core<'a, M>,
}

impl<'a, M: RawMutex> Clone for Handle<'a, M> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, M: RawMutex> Copy for Handle<'a, M> {}

impl<'a, M: RawMutex> Handle<'a, M> {
    /// Makes a data exchange with the given data, or with the current
    /// default data when `xfer` is `None`.
    ///
    /// The descriptor is deep-copied and may be dropped as soon as the call
    /// returns. With a new descriptor, returns the identifier assigned to
    /// it; the done or fail callback later carries the same identifier.
    ///
    /// When the device is busy and no new data was given, the request is
    /// latched and replayed once the running cycle finishes; the call still
    /// returns `NotReady`, and the done callback invocation is guaranteed
    /// to follow. A busy device with new data is a plain `NotReady`.
    ///
    /// `force_size_change` permits a transfer size change outside the
    /// points of the cycle where the sides can renegotiate it; use it only
    /// when the upper protocol knows out-of-band that the peer is already
    /// reconfigured.
    pub fn exchange(
        &self,
        xfer: Option<&Xfer>,
        force_size_change: bool,
    ) -> Result<Option<XferId>, Error> {
        self.core.exchange(xfer, force_size_change)
    }

    /// Updates the default TX data without starting a transfer.
    ///
    /// The default data is what the next cycle sends when the peer
    /// initiates the transfer before we do.
    pub fn update_default(&self, xfer: &Xfer, force_size_change: bool) -> Result<XferId, Error> {
        self.core.update_default(xfer, force_size_change)
    }

    /// Initializes the device with the given default transfer.
    ///
    /// The device comes up idle and fully functional, with our flag
    /// deasserted; a peer request already present on the wire is served
    /// immediately. Initializing a running device is a no-op success.
    ///
    /// Not thread safe: no other calls are allowed until `init` returns.
    pub fn init(&self, default_xfer: &Xfer) -> Result<(), Error> {
        self.core.init(default_xfer)
    }

    /// Releases everything the device holds and turns it cold.
    ///
    /// An in-flight burst is awaited for a bounded time, since the
    /// hardware cannot be aborted; everything else stops immediately. Only
    /// the first caller performs the teardown, later ones get
    /// `AlreadyClosing`.
    pub async fn close(&self) -> Result<(), Error> {
        self.core.close().await
    }

    /// Restarts the device: close followed by init.
    ///
    /// Without a descriptor the current one is preserved across the
    /// restart, if it is usable.
    ///
    /// Not thread safe: no other calls are allowed until `reset` returns.
    pub async fn reset(&self, default_xfer: Option<&Xfer>) -> Result<(), Error> {
        self.core.reset(default_xfer).await
    }

    pub fn is_running(&self) -> bool {
        self.core.is_running()
    }

    /// Reads the human-readable statistics/configuration snapshot,
    /// starting at `offset`. Returns the number of bytes written.
    pub fn read_info(&self, offset: usize, buf: &mut [u8]) -> usize {
        diag::read(self.core, offset, buf)
    }
}

/// The generic symmetric full-duplex transport role
///
/// The operation bundle an upper protocol binds to, so that it can drive
/// any transport with these semantics instead of this device specifically.
/// [`Handle`] implements it by delegation.
pub trait FullDuplex {
    fn exchange(
        &self,
        xfer: Option<&Xfer>,
        force_size_change: bool,
    ) -> Result<Option<XferId>, Error>;
    fn update_default(&self, xfer: &Xfer, force_size_change: bool) -> Result<XferId, Error>;
    fn init(&self, default_xfer: &Xfer) -> Result<(), Error>;
    async fn close(&self) -> Result<(), Error>;
    async fn reset(&self, default_xfer: Option<&Xfer>) -> Result<(), Error>;
    fn is_running(&self) -> bool;
}

impl<'a, M: RawMutex> FullDuplex for Handle<'a, M> {
    fn exchange(
        &self,
        xfer: Option<&Xfer>,
        force_size_change: bool,
    ) -> Result<Option<XferId>, Error> {
        Handle::exchange(self, xfer, force_size_change)
    }

    fn update_default(&self, xfer: &Xfer, force_size_change: bool) -> Result<XferId, Error> {
        Handle::update_default(self, xfer, force_size_change)
    }

    fn init(&self, default_xfer: &Xfer) -> Result<(), Error> {
        Handle::init(self, default_xfer)
    }

    async fn close(&self) -> Result<(), Error> {
        Handle::close(self).await
    }

    async fn reset(&self, default_xfer: Option<&Xfer>) -> Result<(), Error> {
        Handle::reset(self, default_xfer).await
    }

    fn is_running(&self) -> bool {
        Handle::is_running(self)
    }
}

/// Transport worker task runner.
///
/// Run this task for proper device operation: it executes everything that
/// may sleep, i.e. consumer callbacks, flag silence intervals, the
/// peer-wait timeout, and the error recovery sequence.
pub struct Runner<'a, M: RawMutex> {
    core: &'a Core<'a, M>,
}

impl<'a, M: RawMutex> Runner<'a, M> {
    pub async fn run(&mut self) -> ! {
        self.core.run_worker().await
    }
}
