//! Byte-stream handles to a controller board.
//!
//! The reader only needs a duplex byte channel that can report how many bytes
//! are waiting without blocking. [`Transport`] is that seam; [`Connector`]
//! opens one. [`SerialConnector`] is the serial port implementation.

use std::io::{self, Read, Write};
use std::time::Duration;

use serialport::{ClearBuffer, SerialPort};

use crate::config::ReaderConfig;

/// A duplex byte channel to a controller.
pub trait Transport: Read + Write {
    /// Number of bytes that can be read right now without blocking.
    fn bytes_to_read(&mut self) -> io::Result<usize>;
}

/// Opens a [`Transport`].
pub trait Connector {
    type Handle: Transport;

    /// Human-readable device name for logs and errors.
    fn path(&self) -> &str;

    fn connect(&self) -> io::Result<Self::Handle>;
}

impl Transport for Box<dyn SerialPort> {
    fn bytes_to_read(&mut self) -> io::Result<usize> {
        Ok(SerialPort::bytes_to_read(&**self)? as usize)
    }
}

/// Read timeout applied to the serial port itself.
pub const PORT_TIMEOUT: Duration = Duration::from_millis(100);

/// Opens a serial port at a fixed speed (8N1, no flow control).
#[derive(Debug, Clone)]
pub struct SerialConnector {
    path: String,
    speed: u32,
}

impl SerialConnector {
    pub fn new(path: impl Into<String>, speed: u32) -> Self {
        Self {
            path: path.into(),
            speed,
        }
    }

    pub fn from_config(config: &ReaderConfig) -> Self {
        Self::new(config.path.clone(), config.speed)
    }

    pub fn speed(&self) -> u32 {
        self.speed
    }
}

impl Connector for SerialConnector {
    type Handle = Box<dyn SerialPort>;

    fn path(&self) -> &str {
        &self.path
    }

    fn connect(&self) -> io::Result<Self::Handle> {
        let port = serialport::new(&self.path, self.speed)
            .timeout(PORT_TIMEOUT)
            .open()?;
        // Stale bytes from before we opened belong to no frame we can use.
        port.clear(ClearBuffer::Input)?;
        Ok(port)
    }
}

// ---------------------------------------------------------------------------
// In-memory device for tests
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod mock {
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::io::{self, Read, Write};
    use std::rc::Rc;

    use super::{Connector, Transport};

    /// Shared state of a simulated controller link.
    #[derive(Debug, Default)]
    pub struct Wire {
        /// Bytes the device has sent and the reader has not yet read.
        pub incoming: VecDeque<u8>,
        /// Bytes the reader wrote to the device.
        pub written: Vec<u8>,
        /// Number of times the device was opened.
        pub opens: usize,
        /// Fail the next connect.
        pub unavailable: bool,
        /// Feed `incoming` to the reader at most this many bytes per read.
        pub chunk: Option<usize>,
        /// Bytes queued to arrive after each write (a scripted reply).
        pub replies: VecDeque<Vec<u8>>,
    }

    #[derive(Debug, Clone, Default)]
    pub struct MockDevice(pub Rc<RefCell<Wire>>);

    impl MockDevice {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn push(&self, bytes: &[u8]) {
            self.0.borrow_mut().incoming.extend(bytes.iter().copied());
        }

        pub fn reply_after_write(&self, bytes: Vec<u8>) {
            self.0.borrow_mut().replies.push_back(bytes);
        }

        pub fn written(&self) -> Vec<u8> {
            self.0.borrow().written.clone()
        }

        pub fn pending(&self) -> usize {
            self.0.borrow().incoming.len()
        }
    }

    impl Read for MockDevice {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let mut wire = self.0.borrow_mut();
            let limit = wire.chunk.unwrap_or(usize::MAX).min(buf.len());
            let mut n = 0;
            while n < limit {
                match wire.incoming.pop_front() {
                    Some(b) => {
                        buf[n] = b;
                        n += 1;
                    }
                    None => break,
                }
            }
            Ok(n)
        }
    }

    impl Write for MockDevice {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let mut wire = self.0.borrow_mut();
            wire.written.extend_from_slice(buf);
            if let Some(reply) = wire.replies.pop_front() {
                wire.incoming.extend(reply);
            }
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Transport for MockDevice {
        fn bytes_to_read(&mut self) -> io::Result<usize> {
            let wire = self.0.borrow();
            Ok(wire.incoming.len().min(wire.chunk.unwrap_or(usize::MAX)))
        }
    }

    impl Connector for MockDevice {
        type Handle = MockDevice;

        fn path(&self) -> &str {
            "mock"
        }

        fn connect(&self) -> io::Result<MockDevice> {
            let mut wire = self.0.borrow_mut();
            if wire.unavailable {
                return Err(io::Error::new(io::ErrorKind::NotFound, "no such device"));
            }
            wire.opens += 1;
            Ok(self.clone())
        }
    }
}
