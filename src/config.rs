/// SPI clock polarity and phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpiMode {
    /// CPOL 0, CPHA 0
    Mode0 = 0,
    /// CPOL 0, CPHA 1
    Mode1 = 1,
    /// CPOL 1, CPHA 0
    Mode2 = 2,
    /// CPOL 1, CPHA 1
    Mode3 = 3,
}

impl SpiMode {
    /// Mode number as the kernel encodes it in the low two mode bits.
    pub fn bits(self) -> u8 {
        self as u8
    }

    /// Decode from a kernel mode byte. Flag bits above the polarity/phase
    /// pair (CS_HIGH, LSB_FIRST, ...) are ignored.
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => SpiMode::Mode0,
            1 => SpiMode::Mode1,
            2 => SpiMode::Mode2,
            _ => SpiMode::Mode3,
        }
    }
}

/// Initial electrical configuration applied when a channel's device is
/// first opened.
///
/// Only the first acquisition of a channel applies its configuration; the
/// bus settings are a property of the shared channel, not of an individual
/// handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusConfig {
    /// Maximum clock speed in Hz.
    pub speed_hz: u32,
    /// Clock polarity/phase.
    pub mode: SpiMode,
    /// Word size in bits, `1..=32`.
    pub bits_per_word: u8,
}

impl BusConfig {
    /// New configuration with the default word size of 8 bits.
    pub fn new(speed_hz: u32, mode: SpiMode) -> Self {
        Self { speed_hz, mode, bits_per_word: 8 }
    }

    /// Override the word size.
    pub fn bits_per_word(mut self, bits: u8) -> Self {
        self.bits_per_word = bits;
        self
    }

    pub(crate) fn validate(&self) -> Result<(), &'static str> {
        if self.speed_hz == 0 {
            return Err("speed must be a positive frequency in Hz");
        }
        if !(1..=32).contains(&self.bits_per_word) {
            return Err("bits per word must be within 1..=32");
        }
        Ok(())
    }
}
