//! Serial link module
//!
//! The dispatcher talks to the remote peer through [`SerialLink`]: blocking
//! single-byte reads with a bounded inter-character timeout, and blocking
//! writes that either complete or fail as a whole.

mod serial;

pub use self::serial::SerialPortLink;

use crate::core::Result;

/// Byte-oriented link to the remote peer
pub trait SerialLink {
    /// Reads one identifier byte.
    ///
    /// Returns `Ok(None)` when the read timeout elapsed without any data.
    fn read_byte(&mut self) -> Result<Option<u8>>;

    /// Writes `buf` completely, or fails
    fn write_bytes(&mut self, buf: &[u8]) -> Result<()>;
}

impl<T: SerialLink + ?Sized> SerialLink for Box<T> {
    fn read_byte(&mut self) -> Result<Option<u8>> {
        (**self).read_byte()
    }

    fn write_bytes(&mut self, buf: &[u8]) -> Result<()> {
        (**self).write_bytes(buf)
    }
}
