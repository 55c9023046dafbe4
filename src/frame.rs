//! Frame parsing, encoding, and the incremental frame assembler.
//!
//! Wire format:
//! ```text
//! "KBSP v1:" TYPE_LO TYPE_HI LEN_LO LEN_HI PAYLOAD... CRC_LO CRC_HI '\r' '\n'
//! ```
//!
//! The checksum covers every byte before the checksum field (prefix, header
//! and payload).

use log::trace;

use crate::checksum;
use crate::error::{Result, WireError};

/// Literal frame prefix.
pub const PREFIX: &[u8; 8] = b"KBSP v1:";
/// Prefix plus the type id and payload length fields.
pub const HEADER_LEN: usize = 12;
/// Largest payload the protocol allows.
pub const PAYLOAD_MAXLEN: usize = 112;
/// Line terminator that marks the end of a frame.
pub const TRAILER: &[u8; 2] = b"\r\n";
/// Checksum field plus [`TRAILER`].
pub const FOOTER_LEN: usize = 4;
/// Buffer length at which an in-progress frame is declared corrupt.
///
/// Matches the controller's receive bound: prefix + max payload + trailer.
/// Frames of this length or longer never complete.
pub const MAX_FRAME_LEN: usize = PAYLOAD_MAXLEN + PREFIX.len() + TRAILER.len();

/// A parsed frame: header fields and checksum-verified payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    pub type_id: u16,
    pub payload: Vec<u8>,
}

impl RawFrame {
    /// Parse a single complete wire frame (prefix through CR LF).
    pub fn parse(wire: &[u8]) -> Result<Self> {
        if wire.len() < HEADER_LEN + FOOTER_LEN {
            return Err(WireError::FrameTooShort { len: wire.len() });
        }
        if !wire.starts_with(PREFIX) {
            return Err(WireError::BadPrefix);
        }
        if !wire.ends_with(TRAILER) {
            return Err(WireError::BadTrailer);
        }

        let cs_pos = wire.len() - FOOTER_LEN;
        let expected = u16::from_le_bytes([wire[cs_pos], wire[cs_pos + 1]]);
        let computed = checksum::compute(&wire[..cs_pos]);
        if expected != computed {
            return Err(WireError::ChecksumMismatch { expected, computed });
        }

        let type_id = u16::from_le_bytes([wire[8], wire[9]]);
        let declared = u16::from_le_bytes([wire[10], wire[11]]) as usize;
        let payload = &wire[HEADER_LEN..cs_pos];
        if declared != payload.len() {
            return Err(WireError::LengthMismatch {
                declared,
                actual: payload.len(),
            });
        }

        Ok(RawFrame {
            type_id,
            payload: payload.to_vec(),
        })
    }

    /// Encode this frame into a complete wire frame.
    ///
    /// The checksum is computed fresh on every call.
    pub fn encode(&self) -> Result<Vec<u8>> {
        if self.payload.len() > PAYLOAD_MAXLEN {
            return Err(WireError::PayloadTooLarge {
                len: self.payload.len(),
                max: PAYLOAD_MAXLEN,
            });
        }

        let mut wire = Vec::with_capacity(HEADER_LEN + self.payload.len() + FOOTER_LEN);
        wire.extend_from_slice(PREFIX);
        wire.extend_from_slice(&self.type_id.to_le_bytes());
        wire.extend_from_slice(&(self.payload.len() as u16).to_le_bytes());
        wire.extend_from_slice(&self.payload);

        let cs = checksum::compute(&wire);
        wire.extend_from_slice(&cs.to_le_bytes());
        wire.extend_from_slice(TRAILER);
        Ok(wire)
    }
}

/// State of the in-progress frame.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AssemblerState {
    /// Ready to start a new frame.
    #[default]
    Empty,
    /// Collecting a frame whose prefix still matches.
    Accumulating(Vec<u8>),
    /// Discarding bytes until the next `\n`.
    Corrupt,
}

/// Reassembles frames from a byte stream one byte at a time.
///
/// Noise, truncated frames and oversize frames put the assembler into
/// [`AssemblerState::Corrupt`]; it resynchronizes on the next line feed, so
/// one bad frame costs at most one line of input.
#[derive(Debug, Default)]
pub struct FrameAssembler {
    state: AssemblerState,
}

impl FrameAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &AssemblerState {
        &self.state
    }

    /// Drop any partial frame and return to [`AssemblerState::Empty`].
    pub fn reset(&mut self) {
        self.state = AssemblerState::Empty;
    }

    /// Feed one byte. Returns the raw wire frame when `byte` completes one.
    ///
    /// The returned frame has matched the prefix and trailer but has not been
    /// checksum-verified; pass it to [`RawFrame::parse`].
    pub fn feed(&mut self, byte: u8) -> Option<Vec<u8>> {
        let mut buf = match std::mem::take(&mut self.state) {
            AssemblerState::Corrupt => {
                if byte != b'\n' {
                    self.state = AssemblerState::Corrupt;
                }
                return None;
            }
            AssemblerState::Empty => Vec::with_capacity(MAX_FRAME_LEN),
            AssemblerState::Accumulating(buf) => buf,
        };

        buf.push(byte);

        if buf.len() >= MAX_FRAME_LEN {
            trace!("frame exceeds {MAX_FRAME_LEN} bytes, discarding line");
            self.state = AssemblerState::Corrupt;
            return None;
        }

        let n = buf.len().min(PREFIX.len());
        if buf[..n] != PREFIX[..n] {
            trace!("bad frame start 0x{:02X} at offset {}, discarding line", buf[n - 1], n - 1);
            self.state = AssemblerState::Corrupt;
            return None;
        }

        if buf.ends_with(TRAILER) {
            // state is already Empty from the take above
            return Some(buf);
        }

        self.state = AssemblerState::Accumulating(buf);
        None
    }

    /// Feed a chunk of bytes and collect every frame it completes.
    pub fn feed_all(&mut self, data: &[u8]) -> Vec<Vec<u8>> {
        data.iter().filter_map(|&b| self.feed(b)).collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn hello_wire() -> Vec<u8> {
        RawFrame {
            type_id: 0x0001,
            payload: vec![],
        }
        .encode()
        .unwrap()
    }

    #[test]
    fn encode_layout() {
        let wire = RawFrame {
            type_id: 0x0084,
            payload: vec![0x01, 0x01, 0x02],
        }
        .encode()
        .unwrap();
        assert_eq!(&wire[..8], b"KBSP v1:");
        assert_eq!(&wire[8..12], &[0x84, 0x00, 0x03, 0x00]);
        assert_eq!(&wire[12..15], &[0x01, 0x01, 0x02]);
        let cs = checksum::compute(&wire[..15]);
        assert_eq!(&wire[15..17], &cs.to_le_bytes());
        assert_eq!(&wire[17..], b"\r\n");
    }

    #[test]
    fn hello_scenario_bytes() {
        assert_eq!(hello_wire(), b"KBSP v1:\x01\x00\x00\x00\xBA\xEA\r\n".to_vec());
    }

    #[test]
    fn round_trip() {
        let original = RawFrame {
            type_id: 0x0010,
            payload: vec![0x01, 0x04, b'b', b'e', b'e', b'r'],
        };
        let parsed = RawFrame::parse(&original.encode().unwrap()).unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn payload_too_large() {
        let frame = RawFrame {
            type_id: 0x0010,
            payload: vec![0; PAYLOAD_MAXLEN + 1],
        };
        assert_eq!(
            frame.encode(),
            Err(WireError::PayloadTooLarge {
                len: PAYLOAD_MAXLEN + 1,
                max: PAYLOAD_MAXLEN,
            })
        );
    }

    #[test]
    fn bad_checksum() {
        let mut wire = hello_wire();
        wire[12] ^= 0xFF;
        assert!(matches!(
            RawFrame::parse(&wire),
            Err(WireError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn length_mismatch() {
        let mut wire = b"KBSP v1:\x10\x00\x05\x00\xAA\xBB".to_vec();
        let cs = checksum::compute(&wire);
        wire.extend_from_slice(&cs.to_le_bytes());
        wire.extend_from_slice(b"\r\n");
        assert_eq!(
            RawFrame::parse(&wire),
            Err(WireError::LengthMismatch {
                declared: 5,
                actual: 2,
            })
        );
    }

    #[test]
    fn too_short() {
        assert!(matches!(
            RawFrame::parse(b"KBSP v1:\r\n"),
            Err(WireError::FrameTooShort { len: 10 })
        ));
    }

    #[test]
    fn assembler_single_frame() {
        let mut asm = FrameAssembler::new();
        let wire = hello_wire();
        let frames = asm.feed_all(&wire);
        assert_eq!(frames, vec![wire]);
        assert_eq!(asm.state(), &AssemblerState::Empty);
    }

    #[test]
    fn assembler_partial_then_rest() {
        let mut asm = FrameAssembler::new();
        let wire = hello_wire();
        assert!(asm.feed_all(&wire[..5]).is_empty());
        assert!(matches!(asm.state(), AssemblerState::Accumulating(b) if b.len() == 5));
        assert_eq!(asm.feed_all(&wire[5..]).len(), 1);
    }

    #[test]
    fn assembler_back_to_back() {
        let mut asm = FrameAssembler::new();
        let mut data = hello_wire();
        data.extend(hello_wire());
        assert_eq!(asm.feed_all(&data).len(), 2);
    }

    #[test]
    fn bad_start_goes_corrupt_until_newline() {
        let mut asm = FrameAssembler::new();
        assert_eq!(asm.feed(b'X'), None);
        assert_eq!(asm.state(), &AssemblerState::Corrupt);
        assert_eq!(asm.feed(b'\r'), None);
        assert_eq!(asm.state(), &AssemblerState::Corrupt);
        assert_eq!(asm.feed(b'\n'), None);
        assert_eq!(asm.state(), &AssemblerState::Empty);
    }

    #[test]
    fn prefix_mismatch_mid_prefix() {
        let mut asm = FrameAssembler::new();
        assert!(asm.feed_all(b"KBSP v2").is_empty());
        assert_eq!(asm.state(), &AssemblerState::Corrupt);
    }

    #[test]
    fn garbage_line_then_frame() {
        let mut asm = FrameAssembler::new();
        let mut data = b"noise noise\n".to_vec();
        data.extend(hello_wire());
        assert_eq!(asm.feed_all(&data), vec![hello_wire()]);
    }

    #[test]
    fn garbage_without_newline_swallows_frame() {
        // The frame's own trailing '\n' is what resynchronizes the assembler.
        let mut asm = FrameAssembler::new();
        let mut data = b"zz".to_vec();
        data.extend(hello_wire());
        assert!(asm.feed_all(&data).is_empty());
        assert_eq!(asm.state(), &AssemblerState::Empty);
        assert_eq!(asm.feed_all(&hello_wire()).len(), 1);
    }

    #[test]
    fn oversize_goes_corrupt() {
        let mut asm = FrameAssembler::new();
        let mut data = PREFIX.to_vec();
        data.resize(MAX_FRAME_LEN, b'A');
        assert!(asm.feed_all(&data).is_empty());
        assert_eq!(asm.state(), &AssemblerState::Corrupt);
    }

    #[test]
    fn one_below_max_still_accumulating() {
        let mut asm = FrameAssembler::new();
        let mut data = PREFIX.to_vec();
        data.resize(MAX_FRAME_LEN - 1, b'A');
        assert!(asm.feed_all(&data).is_empty());
        assert!(matches!(asm.state(), AssemblerState::Accumulating(_)));
    }

    #[test]
    fn reset_clears_partial() {
        let mut asm = FrameAssembler::new();
        asm.feed_all(b"KBSP");
        asm.reset();
        assert_eq!(asm.state(), &AssemblerState::Empty);
    }
}
