//! Legacy I/O port access
//!
//! The embedded controller is reached through two 8-bit ports. [`PortIo`] is
//! the seam between the register protocol and the machine: [`DevPort`] talks
//! to real hardware through `/dev/port`, tests and mock mode use
//! [`SimulatedEc`](crate::sim::SimulatedEc).

use gpdfan_core::Result;
use std::fs::{File, OpenOptions};
use std::os::unix::fs::FileExt;
use std::path::Path;
use tracing::{debug, error};

/// Byte-wide port I/O
pub trait PortIo: Send {
    /// Write one byte to `port`
    fn outb(&mut self, port: u16, value: u8) -> Result<()>;

    /// Read one byte from `port`
    fn inb(&mut self, port: u16) -> Result<u8>;
}

impl<P: PortIo + ?Sized> PortIo for Box<P> {
    fn outb(&mut self, port: u16, value: u8) -> Result<()> {
        (**self).outb(port, value)
    }

    fn inb(&mut self, port: u16) -> Result<u8> {
        (**self).inb(port)
    }
}

/// Port I/O through the `/dev/port` character device
///
/// Each file offset maps to the I/O port of the same number. Requires
/// `CAP_SYS_RAWIO`.
pub struct DevPort {
    file: File,
}

impl DevPort {
    pub const DEFAULT_PATH: &'static str = "/dev/port";

    /// Open `/dev/port`
    pub fn open() -> Result<Self> {
        Self::open_path(Self::DEFAULT_PATH)
    }

    /// Open a port device at a custom path
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Opening port device: {}", path.display());

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| {
                error!("Failed to open {}: {}", path.display(), e);
                e
            })?;

        Ok(Self { file })
    }
}

impl PortIo for DevPort {
    fn outb(&mut self, port: u16, value: u8) -> Result<()> {
        self.file.write_all_at(&[value], port as u64)?;
        Ok(())
    }

    fn inb(&mut self, port: u16) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.file.read_exact_at(&mut buf, port as u64)?;
        Ok(buf[0])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gpdfan_core::GpdFanError;
    use tempfile::NamedTempFile;

    #[test]
    fn test_dev_port_offsets_are_ports() {
        // A plain file behaves like /dev/port for positional byte I/O
        let file = NamedTempFile::new().unwrap();
        file.as_file().set_len(0x100).unwrap();

        let mut port = DevPort::open_path(file.path()).unwrap();
        port.outb(0x4E, 0x2E).unwrap();
        port.outb(0x4F, 0x11).unwrap();

        assert_eq!(port.inb(0x4E).unwrap(), 0x2E);
        assert_eq!(port.inb(0x4F).unwrap(), 0x11);
        assert_eq!(port.inb(0x2E).unwrap(), 0x00);
    }

    #[test]
    fn test_dev_port_missing_device() {
        let result = DevPort::open_path("/nonexistent/port");
        assert!(matches!(result, Err(GpdFanError::Io(_))));
    }

    #[test]
    fn test_boxed_port_forwards() {
        let file = NamedTempFile::new().unwrap();
        file.as_file().set_len(0x100).unwrap();

        let mut port: Box<dyn PortIo> = Box::new(DevPort::open_path(file.path()).unwrap());
        port.outb(0x2F, 0x7F).unwrap();
        assert_eq!(port.inb(0x2F).unwrap(), 0x7F);
    }
}
