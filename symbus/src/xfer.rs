//! Transfer descriptor and the owned buffer management

use heapless::Vec;

use crate::burst::BURST_SIZE_MAX;
use crate::core::{Error, State, XferId};

/// One full-duplex transfer: what to send and where the received bytes land
///
/// A descriptor declares a transfer window size and stages a TX payload for
/// it; a window wider than the payload is transmitted zero-padded.
/// Consumer-supplied descriptors are deep-copied on entry, so the consumer
/// may reuse or drop its copy as soon as a call returns. In the descriptor
/// held by the engine, TX and RX buffers are owned and always span the full
/// window.
///
/// The completed-transfers counter tracks how many bursts were carried with
/// this descriptor's data; it restarts at 1 on overflow.
#[derive(Debug, Clone)]
pub struct Xfer {
    id: XferId,
    counter: u32,
    token: u32,
    size: usize,
    tx: Vec<u8, BURST_SIZE_MAX>,
    rx: Vec<u8, BURST_SIZE_MAX>,
}

impl Xfer {
    /// Creates a descriptor carrying a copy of `tx`, with the transfer
    /// window sized to it.
    ///
    /// Fails with `XferSizeZero` on an empty payload and with `NoMemory`
    /// when the payload exceeds the single-burst capacity of the bus
    /// controller.
    pub fn new(tx: &[u8]) -> Result<Self, Error> {
        if tx.is_empty() {
            return Err(Error::XferSizeZero);
        }
        let tx = Vec::from_slice(tx).map_err(|_| Error::NoMemory)?;
        let mut rx = Vec::new();
        unwrap!(rx.resize(tx.len(), 0));

        Ok(Self {
            id: XferId::INITIAL,
            counter: 0,
            token: 0,
            size: tx.len(),
            tx,
            rx,
        })
    }

    /// Attaches an opaque consumer token, handed back with every callback.
    pub fn with_token(mut self, token: u32) -> Self {
        self.token = token;
        self
    }

    /// Declares the transfer window size, decoupled from the staged
    /// payload.
    ///
    /// A window wider than the payload is transmitted zero-padded. A window
    /// narrower than the payload is invalid: the payload would overrun the
    /// agreed region, and the engine rejects such a descriptor with
    /// `Overlap`.
    pub fn with_size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    pub fn id(&self) -> XferId {
        self.id
    }

    /// Transfers completed with this descriptor.
    pub fn counter(&self) -> u32 {
        self.counter
    }

    pub fn token(&self) -> u32 {
        self.token
    }

    /// Declared transfer window size in bytes.
    pub fn size(&self) -> usize {
        self.size
    }

    /// The staged TX payload. In the engine-held descriptor it spans the
    /// full transfer window.
    pub fn tx(&self) -> &[u8] {
        &self.tx
    }

    pub fn rx(&self) -> &[u8] {
        &self.rx
    }

    /// The staged payload must fit the declared transfer window; anything
    /// longer would overrun the agreed region on the wire.
    fn check_window(&self) -> Result<(), Error> {
        if self.tx.len() > self.size {
            error!(
                "a {} byte payload overruns the declared {} byte transfer window, will not apply",
                self.tx.len(),
                self.size
            );
            return Err(Error::Overlap);
        }
        Ok(())
    }

    fn resize(&mut self, size: usize) -> Result<(), Error> {
        self.tx.resize(size, 0).map_err(|_| Error::NoMemory)?;
        self.rx.resize(size, 0).map_err(|_| Error::NoMemory)?;
        self.size = size;
        Ok(())
    }
}

/// The single transfer descriptor slot of a device
///
/// Empty while the device is cold. Whoever owns the current state owns the
/// slot contents; the callers guarantee exclusion, the slot only enforces
/// the replacement rules.
pub(crate) struct XferSlot {
    current: Option<Xfer>,
}

impl XferSlot {
    pub const fn new() -> Self {
        Self { current: None }
    }

    pub fn is_valid(&self) -> bool {
        self.current.as_ref().is_some_and(|xfer| xfer.size() > 0)
    }

    pub fn current(&self) -> Option<&Xfer> {
        self.current.as_ref()
    }

    pub fn clone_current(&self) -> Option<Xfer> {
        self.current.clone()
    }

    /// Installs the initial descriptor as a normalized deep copy of
    /// `template`.
    pub fn install(&mut self, template: &Xfer, id: XferId) -> Result<(), Error> {
        if template.size() == 0 {
            return Err(Error::NoXfer);
        }
        template.check_window()?;

        let mut xfer = Xfer {
            id,
            counter: 0,
            token: template.token,
            size: 0,
            tx: Vec::new(),
            rx: Vec::new(),
        };
        xfer.resize(template.size)?;
        xfer.tx[..template.tx.len()].copy_from_slice(&template.tx);
        self.current = Some(xfer);
        Ok(())
    }

    /// Replaces the current descriptor contents with a copy of `template`.
    ///
    /// The template's payload must fit its declared window. A window size
    /// change is only accepted in the `Xfer` or `Error` states, or under
    /// `force_size_change`: anywhere else the sides could silently lose
    /// their size agreement.
    pub fn replace(
        &mut self,
        template: &Xfer,
        id: XferId,
        state: State,
        force_size_change: bool,
    ) -> Result<(), Error> {
        let Some(current) = self.current.as_mut() else {
            return Err(Error::Logical);
        };

        if template.size() == 0 {
            error!("new transfer orders zero size, will not apply");
            return Err(Error::XferSizeZero);
        }

        template.check_window()?;

        if current.size() != template.size() {
            if state != State::Xfer && state != State::Error && !force_size_change {
                error!(
                    "sudden transfer size change {} -> {} outside a completed cycle, will not apply",
                    current.size(),
                    template.size()
                );
                return Err(Error::XferSizeMismatch);
            }
            current.resize(template.size())?;
        }

        let payload = template.tx.len();
        current.tx[..payload].copy_from_slice(&template.tx);
        current.tx[payload..].fill(0);
        current.id = id;
        current.counter = 0;
        current.token = template.token;
        Ok(())
    }

    /// Stores the received payload of the finished burst.
    pub fn write_rx(&mut self, data: &[u8]) {
        let Some(current) = self.current.as_mut() else {
            return;
        };
        if data.len() != current.rx.len() {
            warn!(
                "burst returned {} bytes for a {} byte transfer",
                data.len(),
                current.rx.len()
            );
        }
        let len = data.len().min(current.rx.len());
        current.rx[..len].copy_from_slice(&data[..len]);
    }

    pub fn bump_counter(&mut self) {
        if let Some(current) = self.current.as_mut() {
            current.counter = match current.counter.checked_add(1) {
                Some(counter) => counter,
                None => {
                    warn!("transfer counter overflow, restarting at 1");
                    1
                }
            };
        }
    }

    pub fn free(&mut self) {
        self.current = None;
    }
}
