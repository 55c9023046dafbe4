//! Field codecs for KBSP message payloads.
//!
//! A payload is a sequence of tag-length-value records:
//!
//! ```text
//! TAG(1) LEN(1) VALUE(LEN) TAG(1) LEN(1) VALUE(LEN) ...
//! ```
//!
//! All multi-byte integers are little-endian. Strings are raw bytes padded
//! with optional trailing NULs.

use crate::error::{Result, WireError};

/// One tag-length-value record borrowed from a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field<'a> {
    pub tag: u8,
    pub value: &'a [u8],
}

/// Split a payload into its TLV records.
///
/// `msg_type` names the message for error context.
pub fn fields<'a>(payload: &'a [u8], msg_type: &'static str) -> Result<Vec<Field<'a>>> {
    let mut out = Vec::new();
    let mut offset = 0;
    while offset < payload.len() {
        let tag = payload[offset];
        if offset + 2 > payload.len() {
            return Err(WireError::FieldOverrun {
                msg_type,
                tag,
                need: offset + 2,
                got: payload.len(),
            });
        }
        let len = payload[offset + 1] as usize;
        let start = offset + 2;
        let end = start + len;
        if end > payload.len() {
            return Err(WireError::FieldOverrun {
                msg_type,
                tag,
                need: end,
                got: payload.len(),
            });
        }
        out.push(Field {
            tag,
            value: &payload[start..end],
        });
        offset = end;
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Read helpers
// ---------------------------------------------------------------------------

impl Field<'_> {
    pub fn read_u8(&self, msg_type: &'static str) -> Result<u8> {
        Ok(self.fixed::<1>(msg_type)?[0])
    }

    pub fn read_u16(&self, msg_type: &'static str) -> Result<u16> {
        Ok(u16::from_le_bytes(self.fixed(msg_type)?))
    }

    pub fn read_u32(&self, msg_type: &'static str) -> Result<u32> {
        Ok(u32::from_le_bytes(self.fixed(msg_type)?))
    }

    pub fn read_i32(&self, msg_type: &'static str) -> Result<i32> {
        Ok(i32::from_le_bytes(self.fixed(msg_type)?))
    }

    pub fn read_u64(&self, msg_type: &'static str) -> Result<u64> {
        Ok(u64::from_le_bytes(self.fixed(msg_type)?))
    }

    /// Decode a string value, dropping trailing NULs.
    pub fn read_string(&self) -> String {
        let end = self
            .value
            .iter()
            .rposition(|&b| b != 0)
            .map_or(0, |p| p + 1);
        String::from_utf8_lossy(&self.value[..end]).into_owned()
    }

    pub fn read_bytes(&self) -> Vec<u8> {
        self.value.to_vec()
    }

    fn fixed<const N: usize>(&self, msg_type: &'static str) -> Result<[u8; N]> {
        self.value.try_into().map_err(|_| WireError::FieldWidth {
            msg_type,
            tag: self.tag,
            expected: N,
            got: self.value.len(),
        })
    }
}

// ---------------------------------------------------------------------------
// Write helpers
// ---------------------------------------------------------------------------

/// Append a raw TLV record. Values longer than 255 bytes are truncated.
pub fn write_field(buf: &mut Vec<u8>, tag: u8, value: &[u8]) {
    let len = value.len().min(u8::MAX as usize);
    buf.push(tag);
    buf.push(len as u8);
    buf.extend_from_slice(&value[..len]);
}

pub fn write_u8(buf: &mut Vec<u8>, tag: u8, val: u8) {
    write_field(buf, tag, &[val]);
}

pub fn write_u16(buf: &mut Vec<u8>, tag: u8, val: u16) {
    write_field(buf, tag, &val.to_le_bytes());
}

pub fn write_u32(buf: &mut Vec<u8>, tag: u8, val: u32) {
    write_field(buf, tag, &val.to_le_bytes());
}

pub fn write_i32(buf: &mut Vec<u8>, tag: u8, val: i32) {
    write_field(buf, tag, &val.to_le_bytes());
}

pub fn write_u64(buf: &mut Vec<u8>, tag: u8, val: u64) {
    write_field(buf, tag, &val.to_le_bytes());
}

pub fn write_string(buf: &mut Vec<u8>, tag: u8, val: &str) {
    write_field(buf, tag, val.as_bytes());
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
