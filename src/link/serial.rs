use std::io::{self, Read, Write};

use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use tracing::info;

use crate::core::{Error, Result, SerialSettings};
use super::SerialLink;

/// Serial device opened in raw 8N1 mode without flow control
pub struct SerialPortLink {
    /// Underlying port
    port: Box<dyn SerialPort>,
    /// Device path, for log lines
    device: String,
}

impl SerialPortLink {
    /// Opens and configures the serial device
    pub fn open(settings: &SerialSettings) -> Result<Self> {
        let port = serialport::new(settings.device.as_str(), settings.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(settings.read_timeout)
            .open()
            .map_err(|e| Error::device(format!("Failed to open {}: {}", settings.device, e)))?;

        info!(
            device = %settings.device,
            baud_rate = settings.baud_rate,
            timeout_ms = settings.read_timeout.as_millis() as u64,
            "serial device ready"
        );

        Ok(SerialPortLink {
            port,
            device: settings.device.clone(),
        })
    }

    /// Device path this link was opened on
    pub fn device(&self) -> &str {
        &self.device
    }
}

impl SerialLink for SerialPortLink {
    fn read_byte(&mut self) -> Result<Option<u8>> {
        read_one(&mut self.port)
    }

    fn write_bytes(&mut self, buf: &[u8]) -> Result<()> {
        self.port.write_all(buf)?;
        self.port.flush()?;
        Ok(())
    }
}

/// Reads a single byte, mapping the port's read timeout to `None`
fn read_one<R: Read + ?Sized>(reader: &mut R) -> Result<Option<u8>> {
    let mut byte = [0u8; 1];
    loop {
        match reader.read(&mut byte) {
            Ok(0) => return Ok(None),
            Ok(_) => return Ok(Some(byte[0])),
            Err(e) if e.kind() == io::ErrorKind::TimedOut => return Ok(None),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    struct TimingOut;

    impl Read for TimingOut {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::TimedOut, "no data"))
        }
    }

    struct Broken;

    impl Read for Broken {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "unplugged"))
        }
    }

    #[test]
    fn test_read_one_consumes_single_byte() {
        let mut reader = Cursor::new(vec![0x05, 0x06]);
        assert_eq!(read_one(&mut reader).unwrap(), Some(0x05));
        assert_eq!(read_one(&mut reader).unwrap(), Some(0x06));
        assert_eq!(read_one(&mut reader).unwrap(), None);
    }

    #[test]
    fn test_read_one_timeout_is_idle() {
        assert_eq!(read_one(&mut TimingOut).unwrap(), None);
    }

    #[test]
    fn test_read_one_error() {
        let err = read_one(&mut Broken).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_open_missing_device() {
        let settings = SerialSettings {
            device: "/dev/does-not-exist".to_string(),
            baud_rate: 115_200,
            read_timeout: std::time::Duration::from_millis(100),
        };
        assert!(matches!(SerialPortLink::open(&settings), Err(Error::Device(_))));
    }
}
