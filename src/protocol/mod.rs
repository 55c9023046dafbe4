//! Message types and decode/encode dispatch.
//!
//! A single [`Message`] enum covers both directions: the controller reports
//! (Hello, MeterStatus, ...) and the host commands (Ping, SetOutput,
//! SetSerialNumber). The flow-meter daemon side of the link sends reports
//! and receives commands, so both halves need to encode and decode.
//!
//! Every field in every payload is optional on the wire; decoded structs
//! carry `Option`s and encoding skips `None` fields.

pub mod command;
pub mod hello;
pub mod status;

use crate::error::{Result, WireError};
use crate::frame::RawFrame;

pub use command::{OutputMode, SetOutput, SetSerialNumber};
pub use hello::Hello;
pub use status::{AuthToken, MeterStatus, OnewirePresence, OutputStatus, TemperatureReading};

// ---------------------------------------------------------------------------
// Type ID constants
// ---------------------------------------------------------------------------

// Reports (controller sends)
pub const TYPE_HELLO: u16 = 0x01;
pub const TYPE_METER_STATUS: u16 = 0x10;
pub const TYPE_TEMPERATURE_READING: u16 = 0x11;
pub const TYPE_OUTPUT_STATUS: u16 = 0x12;
pub const TYPE_ONEWIRE_PRESENCE: u16 = 0x13;
pub const TYPE_AUTH_TOKEN: u16 = 0x14;

// Commands (host sends)
pub const TYPE_PING: u16 = 0x81;
pub const TYPE_SET_OUTPUT: u16 = 0x84;
pub const TYPE_SET_SERIAL_NUMBER: u16 = 0x85;

/// A decoded KBSP message.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Message {
    // -- Reports --
    Hello(Hello),
    MeterStatus(MeterStatus),
    TemperatureReading(TemperatureReading),
    OutputStatus(OutputStatus),
    OnewirePresence(OnewirePresence),
    AuthToken(AuthToken),

    // -- Commands --
    Ping,
    SetOutput(SetOutput),
    SetSerialNumber(SetSerialNumber),
}

impl Message {
    /// Decode a payload given its wire type id.
    ///
    /// Unallocated ids yield [`WireError::UnknownType`].
    pub fn decode(type_id: u16, payload: &[u8]) -> Result<Self> {
        let p = payload;
        match type_id {
            TYPE_HELLO => Ok(Message::Hello(Hello::decode(p)?)),
            TYPE_METER_STATUS => Ok(Message::MeterStatus(MeterStatus::decode(p)?)),
            TYPE_TEMPERATURE_READING => {
                Ok(Message::TemperatureReading(TemperatureReading::decode(p)?))
            }
            TYPE_OUTPUT_STATUS => Ok(Message::OutputStatus(OutputStatus::decode(p)?)),
            TYPE_ONEWIRE_PRESENCE => {
                Ok(Message::OnewirePresence(OnewirePresence::decode(p)?))
            }
            TYPE_AUTH_TOKEN => Ok(Message::AuthToken(AuthToken::decode(p)?)),
            TYPE_PING => Ok(Message::Ping),
            TYPE_SET_OUTPUT => Ok(Message::SetOutput(SetOutput::decode(p)?)),
            TYPE_SET_SERIAL_NUMBER => {
                Ok(Message::SetSerialNumber(SetSerialNumber::decode(p)?))
            }
            _ => Err(WireError::unknown_type(type_id, p)),
        }
    }

    /// Decode a checksum-verified frame.
    pub fn decode_frame(frame: &RawFrame) -> Result<Self> {
        Self::decode(frame.type_id, &frame.payload)
    }

    /// Wire type id of this message.
    pub fn type_id(&self) -> u16 {
        match self {
            Message::Hello(_) => TYPE_HELLO,
            Message::MeterStatus(_) => TYPE_METER_STATUS,
            Message::TemperatureReading(_) => TYPE_TEMPERATURE_READING,
            Message::OutputStatus(_) => TYPE_OUTPUT_STATUS,
            Message::OnewirePresence(_) => TYPE_ONEWIRE_PRESENCE,
            Message::AuthToken(_) => TYPE_AUTH_TOKEN,
            Message::Ping => TYPE_PING,
            Message::SetOutput(_) => TYPE_SET_OUTPUT,
            Message::SetSerialNumber(_) => TYPE_SET_SERIAL_NUMBER,
        }
    }

    /// Encoded payload bytes (no framing).
    pub fn payload(&self) -> Vec<u8> {
        match self {
            Message::Hello(m) => m.encode(),
            Message::MeterStatus(m) => m.encode(),
            Message::TemperatureReading(m) => m.encode(),
            Message::OutputStatus(m) => m.encode(),
            Message::OnewirePresence(m) => m.encode(),
            Message::AuthToken(m) => m.encode(),
            Message::Ping => vec![],
            Message::SetOutput(m) => m.encode(),
            Message::SetSerialNumber(m) => m.encode(),
        }
    }

    /// Build the `RawFrame` for this message.
    pub fn to_frame(&self) -> RawFrame {
        RawFrame {
            type_id: self.type_id(),
            payload: self.payload(),
        }
    }

    /// Encode into a complete wire frame (prefix, header, payload, checksum,
    /// trailer).
    pub fn encode(&self) -> Result<Vec<u8>> {
        self.to_frame().encode()
    }

    /// Format as a hex debug line: `"0x0084 6B | 010103020101"`.
    pub fn debug_hex(&self) -> String {
        let payload = self.payload();
        let mut s = format!("0x{:04X} {}B", self.type_id(), payload.len());
        if !payload.is_empty() {
            s.push_str(" | ");
            let limit = 20;
            for b in payload.iter().take(limit) {
                s.push_str(&format!("{b:02X}"));
            }
            if payload.len() > limit {
                s.push_str("...");
            }
        }
        s
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
