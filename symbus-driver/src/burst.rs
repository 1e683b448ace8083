//! Burst payload and native bus configuration objects

/// The maximum single burst size in bytes.
///
/// Limited by the hardware FIFO of the bus controller; usually the same for
/// all controllers on a chip and for both the master and the slave role.
pub const BURST_SIZE_MAX: usize = 64;

#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InvalidLength;

/// Fixed-capacity burst data vector
///
/// Payloads cross the driver boundary by value; the length is bounded by
/// [`BURST_SIZE_MAX`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Data {
    length: u8,
    bytes: [u8; BURST_SIZE_MAX],
}

impl Data {
    /// Creates a new vector from a slice of compatible length.
    pub fn new(data: &[u8]) -> Result<Self, InvalidLength> {
        if data.len() > BURST_SIZE_MAX {
            return Err(InvalidLength);
        }
        let mut bytes = [0; BURST_SIZE_MAX];
        bytes[..data.len()].copy_from_slice(data);

        Ok(Self {
            length: data.len() as u8,
            bytes,
        })
    }

    pub fn new_zeros(length: usize) -> Result<Self, InvalidLength> {
        if length > BURST_SIZE_MAX {
            return Err(InvalidLength);
        }
        Ok(Self {
            length: length as u8,
            bytes: [0; BURST_SIZE_MAX],
        })
    }

    pub fn length(&self) -> usize {
        usize::from(self.length)
    }
}

impl core::ops::Deref for Data {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.bytes[..usize::from(self.length)]
    }
}

impl core::ops::DerefMut for Data {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.bytes[..usize::from(self.length)]
    }
}

/// Clock polarity of the bus in its idle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockPolarity {
    #[default]
    IdleLow,
    IdleHigh,
}

/// Clock edge on which data is captured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockPhase {
    #[default]
    CaptureOnFirst,
    CaptureOnSecond,
}

/// Native (transport-level) burst configuration
///
/// The engine is oblivious to these fields; they are set by the consumer's
/// configuration hook before each submission, since only the upper protocol
/// driver knows the transport details of the counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub struct BusConfig {
    /// Word width of the bus in bits.
    pub word_bits: u8,
    pub clock_polarity: ClockPolarity,
    pub clock_phase: ClockPhase,
    /// Keep the chip select asserted between words of the burst.
    pub cs_hold: bool,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            word_bits: 8,
            clock_polarity: Default::default(),
            clock_phase: Default::default(),
            cs_hold: true,
        }
    }
}

/// A full-duplex burst submitted to the bus driver
///
/// TX and RX lengths of a burst are always equal; the RX payload of the same
/// length is returned through [`Completion`].
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Burst {
    pub tx: Data,
    pub config: BusConfig,
}

/// Result of a finished burst, pushed by the bus driver
///
/// A non-zero status carries the driver-native error code; the RX data is
/// only meaningful when the status is zero.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Completion {
    pub status: i32,
    pub rx: Data,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_length() {
        let data = Data::new(&[1, 2, 3]).unwrap();
        assert_eq!(data.length(), 3);
        assert_eq!(&data[..], &[1, 2, 3]);

        assert!(Data::new(&[0; BURST_SIZE_MAX]).is_ok());
        assert!(Data::new(&[0; BURST_SIZE_MAX + 1]).is_err());
    }

    #[test]
    fn test_data_zeros() {
        let data = Data::new_zeros(8).unwrap();
        assert_eq!(data.length(), 8);
        assert!(data.iter().all(|byte| *byte == 0));
        assert!(Data::new_zeros(BURST_SIZE_MAX + 1).is_err());
    }
}
