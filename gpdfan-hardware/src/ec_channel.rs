//! Embedded controller register channel
//!
//! Reads and writes arbitrary 16-bit EC RAM offsets through the board's
//! address-select and data ports. Every transaction is three latched stages:
//!
//! 1. high address byte: `0x2E`→addr, `0x11`→data, `0x2F`→addr, `offset >> 8`→data
//! 2. low address byte:  `0x2E`→addr, `0x10`→data, `0x2F`→addr, `offset & 0xFF`→data
//! 3. transfer:          `0x2E`→addr, `0x12`→data, `0x2F`→addr, then read/write data
//!
//! The EC latches between each write, so the stages can never be reordered or
//! interleaved with another transaction. A single process-wide lock guards the
//! whole sequence regardless of board or offset.

use gpdfan_core::{BoardDescriptor, GpdFanError, Result};
use parking_lot::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::trace;

use crate::port_io::PortIo;

/// Index-register select, written to the address port
const INDEX_SELECT: u8 = 0x2E;
/// Data-register select, written to the address port
const DATA_SELECT: u8 = 0x2F;
/// Sub-register holding the high address byte
const ADDR_HIGH: u8 = 0x11;
/// Sub-register holding the low address byte
const ADDR_LOW: u8 = 0x10;
/// Sub-register for the data transfer
const TRANSFER: u8 = 0x12;

/// Serializes every EC transaction in the process.
static EC_LOCK: Mutex<()> = parking_lot::const_mutex(());

/// How long a transaction waits for the EC lock before giving up
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(1);

/// Dumb register transport; no validation of returned data.
pub struct EcChannel<P: PortIo> {
    port: P,
    addr_port: u16,
    data_port: u16,
    lock: &'static Mutex<()>,
    lock_timeout: Duration,
}

impl<P: PortIo> EcChannel<P> {
    /// Create a channel on the board's port pair
    pub fn new(port: P, board: &BoardDescriptor) -> Self {
        Self {
            port,
            addr_port: board.addr_port,
            data_port: board.data_port,
            lock: &EC_LOCK,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    /// Bound the wait for the EC lock
    pub fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }

    #[cfg(test)]
    fn with_lock(mut self, lock: &'static Mutex<()>) -> Self {
        self.lock = lock;
        self
    }

    /// Read one byte of EC RAM
    ///
    /// # Errors
    ///
    /// [`GpdFanError::Busy`] if the lock is not acquired within the timeout;
    /// transport errors are passed through unchanged.
    pub fn read(&mut self, offset: u16) -> Result<u8> {
        let _guard = self.acquire()?;

        self.select_offset(offset)?;
        self.latch(TRANSFER)?;
        let value = self.port.inb(self.data_port)?;

        trace!("EC read  0x{:04X} -> 0x{:02X}", offset, value);
        Ok(value)
    }

    /// Write one byte of EC RAM
    ///
    /// # Errors
    ///
    /// Same as [`EcChannel::read`].
    pub fn write(&mut self, offset: u16, value: u8) -> Result<()> {
        let _guard = self.acquire()?;

        self.select_offset(offset)?;
        self.latch(TRANSFER)?;
        self.port.outb(self.data_port, value)?;

        trace!("EC write 0x{:04X} <- 0x{:02X}", offset, value);
        Ok(())
    }

    /// Read two consecutive registers as a big-endian word
    pub fn read_word(&mut self, offset: u16) -> Result<u16> {
        let high = self.read(offset)?;
        let low = self.read(offset.wrapping_add(1))?;
        Ok(u16::from_be_bytes([high, low]))
    }

    fn acquire(&self) -> Result<MutexGuard<'static, ()>> {
        self.lock
            .try_lock_for(self.lock_timeout)
            .ok_or(GpdFanError::Busy)
    }

    /// Select `sub` and leave the data port pointing at it.
    fn latch(&mut self, sub: u8) -> Result<()> {
        self.port.outb(self.addr_port, INDEX_SELECT)?;
        self.port.outb(self.data_port, sub)?;
        self.port.outb(self.addr_port, DATA_SELECT)
    }

    fn select_offset(&mut self, offset: u16) -> Result<()> {
        let [high, low] = offset.to_be_bytes();

        self.latch(ADDR_HIGH)?;
        self.port.outb(self.data_port, high)?;

        self.latch(ADDR_LOW)?;
        self.port.outb(self.data_port, low)
    }
}
