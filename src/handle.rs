use std::sync::{Arc, MutexGuard};

use crate::config::{BusConfig, SpiMode};
use crate::error::BusError;
use crate::manager::{BusManager, ChannelState, Shared};
use crate::transport::{SpiTransport, TransferStep, TransportFactory};

/// One caller's reference to a channel's shared connection.
///
/// Handles are cheap to create and reference-counted: every handle on a
/// channel talks to the same open device, and dropping the last one closes
/// it. All operations below take the channel lock, so calls from sibling
/// handles on different threads are serialized.
pub struct BusHandle<'a, F: TransportFactory> {
    manager: &'a BusManager<F>,
    channel: u8,
    shared: Arc<Shared<F::Transport>>,
}

impl<'a, F: TransportFactory> BusHandle<'a, F> {
    pub(crate) fn new(
        manager: &'a BusManager<F>,
        channel: u8,
        shared: Arc<Shared<F::Transport>>,
    ) -> Self {
        Self { manager, channel, shared }
    }

    /// Channel this handle is bound to.
    pub fn channel(&self) -> u8 {
        self.channel
    }

    /// Explicit release; equivalent to dropping the handle.
    pub fn release(self) {}

    // -----------------------------------------------------------------
    // Data-moving operations
    // -----------------------------------------------------------------

    /// Register write: one continuous transaction clocking out
    /// `[register]` followed by `data`.
    ///
    /// Empty `data` is legal and sends just the register byte.
    pub fn write(&self, register: u8, data: &[u8]) -> Result<(), BusError> {
        let mut tx = Vec::with_capacity(data.len() + 1);
        tx.push(register);
        tx.extend_from_slice(data);
        self.submit(&mut [TransferStep::Write { tx: &tx }])
    }

    /// Register read: sends `register`, then clocks `buf.len()` bytes into
    /// `buf`, with chip-select held across both steps.
    pub fn read(&self, register: u8, buf: &mut [u8]) -> Result<(), BusError> {
        if buf.is_empty() {
            return Err(BusError::InvalidArgument {
                reason: "read buffer must not be empty",
            });
        }
        let reg = [register];
        self.submit(&mut [
            TransferStep::Write { tx: &reg },
            TransferStep::Read { rx: buf },
        ])
    }

    /// Full-duplex exchange in place: `buf` is clocked out while being
    /// overwritten with whatever the peripheral clocks back.
    pub fn transfer_in_place(&self, buf: &mut [u8]) -> Result<(), BusError> {
        if buf.is_empty() {
            return Err(BusError::InvalidArgument {
                reason: "exchange buffer must not be empty",
            });
        }
        self.submit(&mut [TransferStep::Exchange { buf }])
    }

    /// Validate → lock → submit → map. No retries; a transport failure
    /// surfaces to the caller as-is.
    fn submit(&self, steps: &mut [TransferStep<'_>]) -> Result<(), BusError> {
        let mut state = self.lock()?;
        state
            .transport
            .transfer(steps)
            .map_err(|source| BusError::TransferFailed { source })
    }

    // -----------------------------------------------------------------
    // Configuration accessors
    // -----------------------------------------------------------------

    pub fn set_mode(&self, mode: SpiMode) -> Result<(), BusError> {
        let mut state = self.lock()?;
        state
            .transport
            .set_mode(mode)
            .map_err(|source| BusError::ConfigurationRejected { source })?;
        state.mode = mode;
        Ok(())
    }

    /// Read back the mode the kernel actually applied.
    pub fn mode(&self) -> Result<SpiMode, BusError> {
        let mut state = self.lock()?;
        let mode = state
            .transport
            .mode()
            .map_err(|source| BusError::ConfigurationRejected { source })?;
        state.mode = mode;
        Ok(mode)
    }

    pub fn set_speed_hz(&self, speed_hz: u32) -> Result<(), BusError> {
        if speed_hz == 0 {
            return Err(BusError::InvalidArgument {
                reason: "speed must be a positive frequency in Hz",
            });
        }
        let mut state = self.lock()?;
        state
            .transport
            .set_speed_hz(speed_hz)
            .map_err(|source| BusError::ConfigurationRejected { source })?;
        state.speed_hz = speed_hz;
        Ok(())
    }

    pub fn speed_hz(&self) -> Result<u32, BusError> {
        let mut state = self.lock()?;
        let speed_hz = state
            .transport
            .speed_hz()
            .map_err(|source| BusError::ConfigurationRejected { source })?;
        state.speed_hz = speed_hz;
        Ok(speed_hz)
    }

    pub fn set_bits_per_word(&self, bits: u8) -> Result<(), BusError> {
        if !(1..=32).contains(&bits) {
            return Err(BusError::InvalidArgument {
                reason: "bits per word must be within 1..=32",
            });
        }
        let mut state = self.lock()?;
        state
            .transport
            .set_bits_per_word(bits)
            .map_err(|source| BusError::ConfigurationRejected { source })?;
        state.bits_per_word = bits;
        Ok(())
    }

    pub fn bits_per_word(&self) -> Result<u8, BusError> {
        let mut state = self.lock()?;
        let bits = state
            .transport
            .bits_per_word()
            .map_err(|source| BusError::ConfigurationRejected { source })?;
        state.bits_per_word = bits;
        Ok(bits)
    }

    /// Last configuration acknowledged by the kernel, served from the
    /// shared cache without a bus round-trip. Reflects the latest setter
    /// or getter on any sibling handle.
    pub fn cached_config(&self) -> Result<BusConfig, BusError> {
        let state = self.lock()?;
        Ok(BusConfig {
            speed_hz: state.speed_hz,
            mode: state.mode,
            bits_per_word: state.bits_per_word,
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, ChannelState<F::Transport>>, BusError> {
        self.shared.state.lock().map_err(|_| BusError::Poisoned)
    }
}

impl<F: TransportFactory> Drop for BusHandle<'_, F> {
    fn drop(&mut self) {
        self.manager.release(self.channel);
    }
}
