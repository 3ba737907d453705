//! Shared-access lifecycle manager for Linux spidev SPI channels.
//!
//! Linux exposes each SPI channel as a character device
//! (`/dev/spidev0.<channel>`), and that device is a single physical
//! resource: at most one open connection per channel makes sense, and
//! transfers from different threads must not interleave. [`BusManager`]
//! enforces both. A channel's device is opened lazily on the first
//! [`acquire`](BusManager::acquire), shared by every outstanding
//! [`BusHandle`] through reference counting, and closed again when the
//! last handle is dropped. All transfers and configuration calls on a
//! channel are serialized through one per-channel lock.
//!
//! The transport is abstracted behind [`SpiTransport`] /
//! [`TransportFactory`] so the manager can be driven against a mock in
//! tests; [`SpidevFactory`] is the production implementation backed by
//! the `spidev` crate.

mod config;
mod error;
mod handle;
mod manager;
mod spidev;
mod transport;

pub use config::{BusConfig, SpiMode};
pub use error::BusError;
pub use handle::BusHandle;
pub use manager::{BusManager, CHANNEL_COUNT};
pub use self::spidev::{SpidevFactory, SpidevTransport};
pub use transport::{SpiTransport, TransferStep, TransportFactory};
