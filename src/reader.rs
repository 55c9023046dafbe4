//! Polling reader for a KBSP controller link.
//!
//! Owns the byte-stream handle, runs every received byte through the
//! [`FrameAssembler`], and decodes complete frames into [`Message`]s.
//! No background threads. Callers drive the loop with
//! [`read_nonblocking()`](Reader::read_nonblocking) or
//! [`drain_messages()`](Reader::drain_messages).
//!
//! Only transport failures are errors. Corrupt frames, checksum mismatches,
//! unknown message types and malformed payloads are dropped, logged at
//! `debug`, and counted in [`ReaderStats`].

use std::collections::VecDeque;
use std::fmt;
use std::io::{self, Read, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info, trace, warn};
use thiserror::Error;

use crate::config::{DEFAULT_HANDSHAKE_TIMEOUT, DEFAULT_POLL_INTERVAL, ReaderConfig};
use crate::error::WireError;
use crate::frame::{FrameAssembler, RawFrame};
use crate::protocol::{Hello, Message, OutputMode, SetOutput, SetSerialNumber};
use crate::transport::{Connector, SerialConnector, Transport};

/// Errors from reader operations.
#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("reader not open; call open() first")]
    NotOpen,

    #[error("reader already open")]
    AlreadyOpen,

    #[error("device {path} unavailable: {source}")]
    DeviceUnavailable {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Outbound message could not be encoded.
    #[error("wire error: {0}")]
    Wire(#[from] WireError),
}

/// Counters for frames the reader accepted or dropped.
///
/// Dropped frames never surface as errors; these counters are the only way
/// to tell "no data" apart from "data rejected".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReaderStats {
    /// Frames decoded into messages
    pub messages: u64,
    /// Complete frames whose checksum did not match
    pub checksum_errors: u64,
    /// Complete frames that were truncated or had a bad length field
    pub malformed_frames: u64,
    /// Valid frames with an unallocated message type id
    pub unknown_types: u64,
    /// Valid frames of a known type whose payload failed to decode
    pub decode_errors: u64,
}

impl ReaderStats {
    /// Total frames dropped for any reason.
    pub fn dropped(&self) -> u64 {
        self.checksum_errors + self.malformed_frames + self.unknown_types + self.decode_errors
    }
}

/// Polling reader for a controller link.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use kbsp::{Message, Reader, ReaderConfig, ReaderError};
///
/// let mut reader = Reader::serial(&ReaderConfig::new("/dev/ttyACM0"));
/// reader.open()?;
/// if let Some(hello) = reader.wait_for_ping(5)? {
///     println!("controller {:?}", hello.serial_number);
/// }
/// loop {
///     for msg in reader.drain_messages()? {
///         println!("{msg:?}");
///     }
///     std::thread::sleep(Duration::from_millis(100));
/// }
/// # Ok::<(), ReaderError>(())
/// ```
pub struct Reader<C: Connector> {
    connector: C,
    handle: Option<C::Handle>,
    assembler: FrameAssembler,
    read_buf: [u8; 256],
    /// Bytes read from the handle but not yet fed to the assembler.
    pending: VecDeque<u8>,
    stats: ReaderStats,
    poll_interval: Duration,
    handshake_timeout: Duration,
    shutdown: Option<Arc<AtomicBool>>,
    /// Called before every message write.
    on_send: Option<Box<dyn FnMut(&Message) + Send>>,
    /// Called after every successful frame decode.
    on_recv: Option<Box<dyn FnMut(&Message) + Send>>,
}

impl Reader<SerialConnector> {
    /// Reader for the serial device named in `config`.
    pub fn serial(config: &ReaderConfig) -> Self {
        Self::with_config(SerialConnector::from_config(config), config)
    }
}

impl<C: Connector> Reader<C> {
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            handle: None,
            assembler: FrameAssembler::new(),
            read_buf: [0u8; 256],
            pending: VecDeque::new(),
            stats: ReaderStats::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            shutdown: None,
            on_send: None,
            on_recv: None,
        }
    }

    /// Reader using the timing settings from `config`.
    pub fn with_config(connector: C, config: &ReaderConfig) -> Self {
        let mut reader = Self::new(connector);
        reader.poll_interval = config.poll_interval;
        reader.handshake_timeout = config.handshake_timeout;
        reader
    }

    /// Register a flag that ends blocking reads early once set.
    ///
    /// The flag is checked between polls, never mid-sleep.
    pub fn set_shutdown_flag(&mut self, flag: Arc<AtomicBool>) {
        self.shutdown = Some(flag);
    }

    /// Register a callback invoked at the top of every [`write_message()`](Self::write_message).
    pub fn set_on_send(&mut self, f: impl FnMut(&Message) + Send + 'static) {
        self.on_send = Some(Box::new(f));
    }

    /// Register a callback invoked after every decoded message.
    pub fn set_on_recv(&mut self, f: impl FnMut(&Message) + Send + 'static) {
        self.on_recv = Some(Box::new(f));
    }

    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    pub fn stats(&self) -> ReaderStats {
        self.stats
    }

    pub fn assembler(&self) -> &FrameAssembler {
        &self.assembler
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Open the device. Must be called before any other I/O.
    pub fn open(&mut self) -> Result<(), ReaderError> {
        if self.handle.is_some() {
            return Err(ReaderError::AlreadyOpen);
        }
        let handle = self
            .connector
            .connect()
            .map_err(|source| ReaderError::DeviceUnavailable {
                path: self.connector.path().to_string(),
                source,
            })?;
        self.reset();
        self.handle = Some(handle);
        info!("opened {}", self.connector.path());
        Ok(())
    }

    /// Close the device and discard any partial frame.
    pub fn close(&mut self) -> Result<(), ReaderError> {
        let mut handle = self.handle.take().ok_or(ReaderError::NotOpen)?;
        self.reset();
        info!("closed {}", self.connector.path());
        handle.flush()?;
        Ok(())
    }

    /// Like [`close()`](Self::close), but never fails. Closing a reader
    /// that is not open is a no-op.
    pub fn close_quietly(&mut self) {
        match self.close() {
            Ok(()) | Err(ReaderError::NotOpen) => {}
            Err(e) => warn!("error closing {}: {e}", self.connector.path()),
        }
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Return the next message if one can be assembled from bytes that are
    /// already available. Never waits for the device.
    ///
    /// Bytes past the returned message stay buffered for the next call.
    pub fn read_nonblocking(&mut self) -> Result<Option<Message>, ReaderError> {
        let handle = self.handle.as_mut().ok_or(ReaderError::NotOpen)?;
        loop {
            while let Some(b) = self.pending.pop_front() {
                let Some(wire) = self.assembler.feed(b) else {
                    continue;
                };
                if let Some(msg) = accept(&mut self.stats, &wire) {
                    if let Some(cb) = self.on_recv.as_mut() {
                        cb(&msg);
                    }
                    return Ok(Some(msg));
                }
            }

            let available = handle.bytes_to_read()?;
            if available == 0 {
                return Ok(None);
            }
            let want = available.min(self.read_buf.len());
            let n = match handle.read(&mut self.read_buf[..want]) {
                Ok(n) => n,
                Err(e)
                    if e.kind() == io::ErrorKind::WouldBlock
                        || e.kind() == io::ErrorKind::TimedOut =>
                {
                    0
                }
                Err(e) => return Err(e.into()),
            };
            if n == 0 {
                return Ok(None);
            }
            self.pending.extend(&self.read_buf[..n]);
        }
    }

    /// Return every message that can be assembled from bytes already
    /// available, in arrival order.
    pub fn drain_messages(&mut self) -> Result<Vec<Message>, ReaderError> {
        if self.handle.is_none() {
            return Err(ReaderError::NotOpen);
        }
        let mut messages = Vec::new();
        while let Some(msg) = self.read_nonblocking()? {
            messages.push(msg);
        }
        Ok(messages)
    }

    /// Poll every `poll_interval` until a message arrives.
    ///
    /// Returns `Ok(None)` once `timeout` has elapsed or the shutdown flag is
    /// set. With no timeout, waits until a message arrives.
    pub fn read_blocking(
        &mut self,
        timeout: Option<Duration>,
        poll_interval: Duration,
    ) -> Result<Option<Message>, ReaderError> {
        let deadline = timeout.map(|t| Instant::now() + t);
        loop {
            if let Some(msg) = self.read_nonblocking()? {
                return Ok(Some(msg));
            }
            if self.shutdown_requested() {
                debug!("blocking read ended by shutdown flag");
                return Ok(None);
            }
            let mut sleep = poll_interval;
            if let Some(deadline) = deadline {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    return Ok(None);
                }
                sleep = sleep.min(remaining);
            }
            thread::sleep(sleep);
        }
    }

    /// [`read_blocking()`](Self::read_blocking) with the configured poll interval.
    pub fn read_message(&mut self, timeout: Option<Duration>) -> Result<Option<Message>, ReaderError> {
        self.read_blocking(timeout, self.poll_interval)
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    /// Encode and send a message. Returns the number of bytes written.
    pub fn write_message(&mut self, message: &Message) -> Result<usize, ReaderError> {
        let handle = self.handle.as_mut().ok_or(ReaderError::NotOpen)?;
        if let Some(cb) = self.on_send.as_mut() {
            cb(message);
        }
        let wire = message.encode()?;
        handle.write_all(&wire)?;
        handle.flush()?;
        trace!(">> {}", message.debug_hex());
        Ok(wire.len())
    }

    pub fn ping(&mut self) -> Result<usize, ReaderError> {
        self.write_message(&Message::Ping)
    }

    pub fn set_serial_number(&mut self, serial_number: &str) -> Result<usize, ReaderError> {
        self.write_message(&Message::SetSerialNumber(SetSerialNumber::new(serial_number)))
    }

    pub fn set_output(&mut self, output_id: u8, enable: bool) -> Result<usize, ReaderError> {
        self.write_message(&Message::SetOutput(SetOutput::new(
            output_id,
            OutputMode::from(enable),
        )))
    }

    // -----------------------------------------------------------------------
    // Handshake
    // -----------------------------------------------------------------------

    /// Ping the controller until it answers with a Hello.
    ///
    /// Stale messages are drained first. Each of the `attempts` rounds sends
    /// a Ping, waits up to the handshake timeout for a reply, then drains
    /// anything else that arrived. Returns `Ok(None)` once all attempts are
    /// used up.
    pub fn wait_for_ping(&mut self, attempts: usize) -> Result<Option<Hello>, ReaderError> {
        let stale = self.drain_messages()?;
        if !stale.is_empty() {
            debug!("discarded {} stale messages before handshake", stale.len());
        }
        for attempt in 1..=attempts {
            self.ping()?;
            let first = self.read_blocking(Some(self.handshake_timeout), self.poll_interval)?;
            let rest = self.drain_messages()?;
            for msg in first.into_iter().chain(rest) {
                if let Message::Hello(hello) = msg {
                    return Ok(Some(hello));
                }
            }
            debug!("no hello after ping {attempt}/{attempts}");
            if self.shutdown_requested() {
                break;
            }
        }
        Ok(None)
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn reset(&mut self) {
        self.assembler.reset();
        self.pending.clear();
    }

    fn shutdown_requested(&self) -> bool {
        self.shutdown
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

impl<C: Connector> fmt::Display for Reader<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.is_open() { "open" } else { "closed" };
        write!(f, "<Kegboard path={} {state}>", self.connector.path())
    }
}

impl<C: Connector> Drop for Reader<C> {
    fn drop(&mut self) {
        self.close_quietly();
    }
}

/// Parse and decode one assembled frame, counting anything dropped.
fn accept(stats: &mut ReaderStats, wire: &[u8]) -> Option<Message> {
    let frame = match RawFrame::parse(wire) {
        Ok(frame) => frame,
        Err(e @ WireError::ChecksumMismatch { .. }) => {
            stats.checksum_errors += 1;
            debug!("dropping frame: {e}");
            return None;
        }
        Err(e) => {
            stats.malformed_frames += 1;
            debug!("dropping frame: {e}");
            return None;
        }
    };
    match Message::decode_frame(&frame) {
        Ok(msg) => {
            stats.messages += 1;
            trace!("<< {}", msg.debug_hex());
            Some(msg)
        }
        Err(e @ WireError::UnknownType { .. }) => {
            stats.unknown_types += 1;
            debug!("dropping frame: {e}");
            None
        }
        Err(e) => {
            stats.decode_errors += 1;
            debug!("dropping frame: {e}");
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
