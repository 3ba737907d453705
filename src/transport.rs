use std::io;

use crate::config::SpiMode;

/// One segment of a batched bus transaction.
///
/// All steps submitted together in one [`SpiTransport::transfer`] call are
/// executed as a single continuous transaction: chip-select stays asserted
/// between consecutive steps and is released when the batch completes.
#[derive(Debug)]
pub enum TransferStep<'a> {
    /// Clock out `tx`; incoming bytes are discarded.
    Write { tx: &'a [u8] },
    /// Clock in `rx.len()` bytes; outgoing bytes are don't-care.
    Read { rx: &'a mut [u8] },
    /// Full-duplex in place: `buf` is clocked out while simultaneously
    /// being overwritten with the incoming bytes.
    Exchange { buf: &'a mut [u8] },
}

impl TransferStep<'_> {
    /// Byte length of this step on the wire.
    pub fn len(&self) -> usize {
        match self {
            TransferStep::Write { tx } => tx.len(),
            TransferStep::Read { rx } => rx.len(),
            TransferStep::Exchange { buf } => buf.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Blocking transport for one open SPI channel.
///
/// Setters issue a configuration write to the device; getters issue a
/// genuine read-back rather than echoing a cached value, so they report
/// what the kernel actually applied.
pub trait SpiTransport: Send {
    fn set_mode(&mut self, mode: SpiMode) -> io::Result<()>;
    fn mode(&mut self) -> io::Result<SpiMode>;

    fn set_bits_per_word(&mut self, bits: u8) -> io::Result<()>;
    fn bits_per_word(&mut self) -> io::Result<u8>;

    fn set_speed_hz(&mut self, speed_hz: u32) -> io::Result<()>;
    fn speed_hz(&mut self) -> io::Result<u32>;

    /// Execute `steps` as one atomic bus transaction.
    fn transfer(&mut self, steps: &mut [TransferStep<'_>]) -> io::Result<()>;
}

/// Abstracts transport construction.
///
/// The manager calls [`open`](TransportFactory::open) on the first
/// acquisition of a channel; dropping the transport closes the device.
/// Implementors decide how a channel number maps to a device, which keeps
/// the manager testable against a mock transport.
pub trait TransportFactory {
    type Transport: SpiTransport;

    /// Open the device backing `channel`. The channel number has already
    /// been range-checked by the manager.
    fn open(&self, channel: u8) -> io::Result<Self::Transport>;
}
