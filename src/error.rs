use std::io;

use derive_more::{Display, Error};

/// Errors that can occur during bus operations.
#[derive(Debug, Display, Error)]
pub enum BusError {
    /// The requested channel is outside the range supported by the host.
    #[display("SPI channel {channel} is out of range (expected 0 or 1)")]
    InvalidChannel { channel: u8 },
    /// The channel's device node could not be opened.
    #[display("could not open SPI device: {source}")]
    DeviceUnavailable { source: io::Error },
    /// The kernel rejected a mode / speed / bits-per-word request.
    #[display("SPI configuration rejected: {source}")]
    ConfigurationRejected { source: io::Error },
    /// A caller-supplied argument was invalid before reaching the bus.
    #[display("invalid argument: {reason}")]
    InvalidArgument { reason: &'static str },
    /// The transport rejected a transfer batch.
    #[display("SPI transfer failed: {source}")]
    TransferFailed { source: io::Error },
    /// A channel lock was poisoned by a panicking thread.
    #[display("SPI channel state is poisoned")]
    Poisoned,
}
