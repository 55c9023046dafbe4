use thiserror::Error;

/// Errors arising from KBSP frame parsing and message encoding/decoding.
///
/// None of these escape the [`Reader`](crate::Reader) read path: a frame that
/// fails to parse or decode is dropped and the reader moves on to the next
/// one. They surface directly only from [`RawFrame::parse`](crate::RawFrame::parse),
/// [`Message::decode`](crate::Message::decode) and encode calls.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WireError {
    #[error("frame too short ({len} bytes, minimum 16)")]
    FrameTooShort { len: usize },

    #[error("frame does not start with the KBSP v1 prefix")]
    BadPrefix,

    #[error("frame does not end with CR LF")]
    BadTrailer,

    #[error("declared payload length {declared} does not match actual length {actual}")]
    LengthMismatch { declared: usize, actual: usize },

    #[error("checksum mismatch (expected 0x{expected:04X}, computed 0x{computed:04X})")]
    ChecksumMismatch { expected: u16, computed: u16 },

    #[error("unknown message type 0x{type_id:04X}{}", format_raw_suffix(raw))]
    UnknownType {
        type_id: u16,
        /// Raw payload bytes for debug context.
        raw: Vec<u8>,
    },

    #[error("payload too large ({len} bytes, maximum {max})")]
    PayloadTooLarge { len: usize, max: usize },

    #[error("field 0x{tag:02X} in {msg_type} overruns payload: need {need} bytes, got {got}")]
    FieldOverrun {
        msg_type: &'static str,
        tag: u8,
        need: usize,
        got: usize,
    },

    #[error("field 0x{tag:02X} in {msg_type} has width {got}, expected {expected}")]
    FieldWidth {
        msg_type: &'static str,
        tag: u8,
        expected: usize,
        got: usize,
    },

    #[error("invalid output mode {value}")]
    InvalidOutputMode { value: u8 },
}

impl WireError {
    pub(crate) fn unknown_type(type_id: u16, payload: &[u8]) -> Self {
        Self::UnknownType { type_id, raw: payload.to_vec() }
    }
}

/// Format raw bytes as a suffix like " | 0103 0100" (empty if no bytes).
fn format_raw_suffix(raw: &[u8]) -> String {
    if raw.is_empty() {
        return String::new();
    }
    let limit = 16;
    let hex: String = raw.iter().take(limit).map(|b| format!("{b:02X}")).collect();
    let ellipsis = if raw.len() > limit { "..." } else { "" };
    format!(" | {hex}{ellipsis}")
}

pub type Result<T> = std::result::Result<T, WireError>;
