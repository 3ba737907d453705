use std::io;
use std::os::unix::io::AsRawFd;
use std::path::PathBuf;

use ::spidev::{spidevioctl, SpiModeFlags, Spidev, SpidevOptions, SpidevTransfer};
use tracing::debug;

use crate::config::SpiMode;
use crate::transport::{SpiTransport, TransferStep, TransportFactory};

/// Opens `spidev0.<channel>` nodes under a configurable device root.
///
/// The default root is `/dev`; tests and non-standard sysroots can point
/// it elsewhere.
#[derive(Debug, Clone)]
pub struct SpidevFactory {
    dev_root: PathBuf,
}

impl SpidevFactory {
    pub fn new(dev_root: impl Into<PathBuf>) -> Self {
        Self { dev_root: dev_root.into() }
    }
}

impl Default for SpidevFactory {
    fn default() -> Self {
        Self::new("/dev")
    }
}

impl TransportFactory for SpidevFactory {
    type Transport = SpidevTransport;

    fn open(&self, channel: u8) -> io::Result<SpidevTransport> {
        let path = self.dev_root.join(format!("spidev0.{channel}"));
        debug!(path = %path.display(), "opening SPI device");
        Ok(SpidevTransport { spi: Spidev::open(path)? })
    }
}

/// Production transport backed by an open spidev character device.
pub struct SpidevTransport {
    spi: Spidev,
}

fn mode_flags(mode: SpiMode) -> SpiModeFlags {
    match mode {
        SpiMode::Mode0 => SpiModeFlags::SPI_MODE_0,
        SpiMode::Mode1 => SpiModeFlags::SPI_MODE_1,
        SpiMode::Mode2 => SpiModeFlags::SPI_MODE_2,
        SpiMode::Mode3 => SpiModeFlags::SPI_MODE_3,
    }
}

impl SpiTransport for SpidevTransport {
    fn set_mode(&mut self, mode: SpiMode) -> io::Result<()> {
        let options = SpidevOptions::new().mode(mode_flags(mode)).build();
        self.spi.configure(&options)
    }

    fn mode(&mut self) -> io::Result<SpiMode> {
        spidevioctl::get_mode(self.spi.as_raw_fd()).map(SpiMode::from_bits)
    }

    fn set_bits_per_word(&mut self, bits: u8) -> io::Result<()> {
        let options = SpidevOptions::new().bits_per_word(bits).build();
        self.spi.configure(&options)
    }

    fn bits_per_word(&mut self) -> io::Result<u8> {
        spidevioctl::get_bits_per_word(self.spi.as_raw_fd())
    }

    fn set_speed_hz(&mut self, speed_hz: u32) -> io::Result<()> {
        let options = SpidevOptions::new().max_speed_hz(speed_hz).build();
        self.spi.configure(&options)
    }

    fn speed_hz(&mut self) -> io::Result<u32> {
        spidevioctl::get_max_speed_hz(self.spi.as_raw_fd())
    }

    fn transfer(&mut self, steps: &mut [TransferStep<'_>]) -> io::Result<()> {
        // An Exchange step aliases one buffer as both source and sink, but
        // spi_ioc_transfer wants distinct tx/rx pointers from safe Rust.
        // Clock out a snapshot and let the kernel fill the original.
        let snapshots: Vec<Option<Vec<u8>>> = steps
            .iter()
            .map(|step| match step {
                TransferStep::Exchange { buf } => Some(buf.to_vec()),
                _ => None,
            })
            .collect();

        let mut xfers: Vec<SpidevTransfer<'_, '_>> = Vec::with_capacity(steps.len());
        for (step, snapshot) in steps.iter_mut().zip(&snapshots) {
            let xfer = match (step, snapshot) {
                (TransferStep::Write { tx }, _) => SpidevTransfer::write(tx),
                (TransferStep::Read { rx }, _) => SpidevTransfer::read(&mut **rx),
                (TransferStep::Exchange { buf }, Some(tx)) => {
                    SpidevTransfer::read_write(tx.as_slice(), &mut **buf)
                }
                (TransferStep::Exchange { .. }, None) => unreachable!(),
            };
            xfers.push(xfer);
        }

        // One ioctl, one chip-select assertion across every step: the
        // default cs_change of 0 keeps CS held between consecutive steps.
        self.spi.transfer_multiple(&mut xfers)
    }
}
