#![allow(dead_code)]

use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use spidev_bus::{BusConfig, SpiMode, SpiTransport, TransferStep, TransportFactory};

/// Owned snapshot of one submitted transfer step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepRecord {
    /// Outgoing bytes as the transport saw them.
    Write(Vec<u8>),
    /// Length of the incoming step.
    Read(usize),
    /// Outgoing bytes of an in-place exchange.
    Exchange(Vec<u8>),
}

/// Shared observation point for everything the mock transport sees.
#[derive(Default)]
pub struct MockLog {
    pub opens: AtomicUsize,
    pub closes: AtomicUsize,
    /// Every submitted batch, in submission order.
    pub batches: Mutex<Vec<Vec<StepRecord>>>,
    /// Set while a transfer call is executing; used to detect overlap.
    in_flight: AtomicBool,
    pub overlaps: AtomicUsize,
    pub fail_open: AtomicBool,
    pub fail_mode: AtomicBool,
    pub fail_transfer: AtomicBool,
    /// Bytes the next Read/Exchange steps clock in, FIFO.
    pub incoming: Mutex<VecDeque<Vec<u8>>>,
    /// When set, speed read-backs report this instead of the applied value
    /// (simulates the kernel clamping a requested speed).
    pub force_speed: Mutex<Option<u32>>,
}

impl MockLog {
    pub fn script_incoming(&self, data: &[u8]) {
        self.incoming.lock().unwrap().push_back(data.to_vec());
    }

    pub fn batches(&self) -> Vec<Vec<StepRecord>> {
        self.batches.lock().unwrap().clone()
    }
}

pub struct MockFactory {
    log: Arc<MockLog>,
}

impl MockFactory {
    pub fn new() -> (Self, Arc<MockLog>) {
        let log = Arc::new(MockLog::default());
        (Self { log: log.clone() }, log)
    }
}

impl TransportFactory for MockFactory {
    type Transport = MockTransport;

    fn open(&self, _channel: u8) -> io::Result<MockTransport> {
        if self.log.fail_open.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::NotFound, "no such device"));
        }
        self.log.opens.fetch_add(1, Ordering::SeqCst);
        Ok(MockTransport {
            log: self.log.clone(),
            mode: SpiMode::Mode0,
            speed_hz: 0,
            bits_per_word: 8,
        })
    }
}

/// In-memory transport that records batches instead of touching hardware.
pub struct MockTransport {
    log: Arc<MockLog>,
    mode: SpiMode,
    speed_hz: u32,
    bits_per_word: u8,
}

impl Drop for MockTransport {
    fn drop(&mut self) {
        self.log.closes.fetch_add(1, Ordering::SeqCst);
    }
}

impl SpiTransport for MockTransport {
    fn set_mode(&mut self, mode: SpiMode) -> io::Result<()> {
        if self.log.fail_mode.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "mode refused"));
        }
        self.mode = mode;
        Ok(())
    }

    fn mode(&mut self) -> io::Result<SpiMode> {
        Ok(self.mode)
    }

    fn set_bits_per_word(&mut self, bits: u8) -> io::Result<()> {
        self.bits_per_word = bits;
        Ok(())
    }

    fn bits_per_word(&mut self) -> io::Result<u8> {
        Ok(self.bits_per_word)
    }

    fn set_speed_hz(&mut self, speed_hz: u32) -> io::Result<()> {
        self.speed_hz = speed_hz;
        Ok(())
    }

    fn speed_hz(&mut self) -> io::Result<u32> {
        let forced = *self.log.force_speed.lock().unwrap();
        Ok(forced.unwrap_or(self.speed_hz))
    }

    fn transfer(&mut self, steps: &mut [TransferStep<'_>]) -> io::Result<()> {
        if self.log.fail_transfer.load(Ordering::SeqCst) {
            return Err(io::Error::other("transfer refused"));
        }
        if self.log.in_flight.swap(true, Ordering::SeqCst) {
            self.log.overlaps.fetch_add(1, Ordering::SeqCst);
        }

        let mut record = Vec::with_capacity(steps.len());
        for step in steps.iter_mut() {
            match step {
                TransferStep::Write { tx } => record.push(StepRecord::Write(tx.to_vec())),
                TransferStep::Read { rx } => {
                    if let Some(data) = self.log.incoming.lock().unwrap().pop_front() {
                        let n = data.len().min(rx.len());
                        rx[..n].copy_from_slice(&data[..n]);
                    }
                    record.push(StepRecord::Read(rx.len()));
                }
                TransferStep::Exchange { buf } => {
                    record.push(StepRecord::Exchange(buf.to_vec()));
                    if let Some(data) = self.log.incoming.lock().unwrap().pop_front() {
                        let n = data.len().min(buf.len());
                        buf[..n].copy_from_slice(&data[..n]);
                    }
                }
            }
        }

        // Widen the window so overlapping submissions from a missing lock
        // would actually collide.
        std::thread::yield_now();
        self.log.batches.lock().unwrap().push(record);

        self.log.in_flight.store(false, Ordering::SeqCst);
        Ok(())
    }
}

pub fn default_config() -> BusConfig {
    BusConfig::new(500_000, SpiMode::Mode0)
}

pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
