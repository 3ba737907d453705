use std::io;
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use crate::config::{BusConfig, SpiMode};
use crate::error::BusError;
use crate::handle::BusHandle;
use crate::transport::{SpiTransport, TransportFactory};

/// Number of SPI channels exposed by the host.
pub const CHANNEL_COUNT: usize = 2;

/// Transport plus the last configuration it acknowledged.
pub(crate) struct ChannelState<T> {
    pub(crate) transport: T,
    pub(crate) mode: SpiMode,
    pub(crate) speed_hz: u32,
    pub(crate) bits_per_word: u8,
}

/// State shared by every handle on one channel. The single mutex
/// serializes transfers and configuration calls alike, so a setter can
/// never race an in-flight batch.
pub(crate) struct Shared<T> {
    pub(crate) state: Mutex<ChannelState<T>>,
}

struct Slot<T> {
    shared: Option<Arc<Shared<T>>>,
    users: usize,
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self { shared: None, users: 0 }
    }
}

/// Per-channel lifecycle manager.
///
/// Each channel's device is opened lazily on its first
/// [`acquire`](BusManager::acquire) and stays open while any handle is
/// alive. Dropping the last handle closes the device; a later acquire
/// reopens and reconfigures it.
pub struct BusManager<F: TransportFactory> {
    factory: F,
    slots: [Mutex<Slot<F::Transport>>; CHANNEL_COUNT],
}

impl<F: TransportFactory> BusManager<F> {
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            slots: std::array::from_fn(|_| Mutex::new(Slot::default())),
        }
    }

    /// Acquire a handle to `channel`.
    ///
    /// The first successful acquisition opens the device and applies
    /// `config` (mode, then bits-per-word, then speed). Later acquisitions
    /// share the open device and **ignore** `config`: the electrical
    /// configuration is a property of the bus, and the first acquisition
    /// wins until the channel is fully released.
    pub fn acquire(
        &self,
        channel: u8,
        config: BusConfig,
    ) -> Result<BusHandle<'_, F>, BusError> {
        let slot_mutex = self.slot(channel)?;
        config
            .validate()
            .map_err(|reason| BusError::InvalidArgument { reason })?;

        let mut slot = slot_mutex.lock().map_err(|_| BusError::Poisoned)?;
        let shared = match &slot.shared {
            Some(shared) => Arc::clone(shared),
            None => {
                let transport = self
                    .factory
                    .open(channel)
                    .map_err(|source| BusError::DeviceUnavailable { source })?;
                // A configuration failure drops the freshly opened
                // transport, closing the device and leaving the slot empty.
                let state = apply_initial_config(transport, config).map_err(|source| {
                    warn!(channel, %source, "initial SPI configuration rejected");
                    BusError::ConfigurationRejected { source }
                })?;
                let shared = Arc::new(Shared { state: Mutex::new(state) });
                slot.shared = Some(Arc::clone(&shared));
                debug!(channel, "SPI channel opened");
                shared
            }
        };
        slot.users += 1;
        Ok(BusHandle::new(self, channel, shared))
    }

    /// Number of live handles on `channel`. Out-of-range channels report 0.
    pub fn user_count(&self, channel: u8) -> usize {
        self.slot(channel)
            .ok()
            .and_then(|m| m.lock().ok().map(|slot| slot.users))
            .unwrap_or(0)
    }

    /// Whether `channel` currently has an open device.
    pub fn is_active(&self, channel: u8) -> bool {
        self.slot(channel)
            .ok()
            .and_then(|m| m.lock().ok().map(|slot| slot.shared.is_some()))
            .unwrap_or(false)
    }

    /// Called from `BusHandle::drop`. Tears the channel down exactly when
    /// the user count returns to zero.
    pub(crate) fn release(&self, channel: u8) {
        let Ok(slot_mutex) = self.slot(channel) else {
            return;
        };
        // Drop cannot fail; a poisoned slot just forfeits the teardown.
        let Ok(mut slot) = slot_mutex.lock() else {
            return;
        };
        slot.users = slot.users.saturating_sub(1);
        if slot.users == 0 && slot.shared.take().is_some() {
            debug!(channel, "SPI channel closed");
        }
    }

    fn slot(&self, channel: u8) -> Result<&Mutex<Slot<F::Transport>>, BusError> {
        self.slots
            .get(usize::from(channel))
            .ok_or(BusError::InvalidChannel { channel })
    }
}

/// Mode, then bits-per-word, then speed, in the order the reference
/// transport expects them.
fn apply_initial_config<T: SpiTransport>(
    mut transport: T,
    config: BusConfig,
) -> io::Result<ChannelState<T>> {
    transport.set_mode(config.mode)?;
    transport.set_bits_per_word(config.bits_per_word)?;
    transport.set_speed_hz(config.speed_hz)?;
    Ok(ChannelState {
        transport,
        mode: config.mode,
        speed_hz: config.speed_hz,
        bits_per_word: config.bits_per_word,
    })
}
