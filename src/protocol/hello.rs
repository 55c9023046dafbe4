//! Handshake identity message.

use crate::codec;
use crate::error::Result;

const TAG_FIRMWARE_VERSION: u8 = 0x01;
const TAG_PROTOCOL_VERSION: u8 = 0x02;
const TAG_SERIAL_NUMBER: u8 = 0x03;

/// Controller identity. Type 0x01.
///
/// Sent by the controller on boot and in reply to a Ping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Hello {
    pub firmware_version: Option<u16>,
    pub protocol_version: Option<u16>,
    pub serial_number: Option<String>,
}

impl Hello {
    pub fn decode(payload: &[u8]) -> Result<Self> {
        let mut hello = Self::default();
        for field in codec::fields(payload, "Hello")? {
            match field.tag {
                TAG_FIRMWARE_VERSION => {
                    hello.firmware_version = Some(field.read_u16("Hello")?);
                }
                TAG_PROTOCOL_VERSION => {
                    hello.protocol_version = Some(field.read_u16("Hello")?);
                }
                TAG_SERIAL_NUMBER => hello.serial_number = Some(field.read_string()),
                _ => {}
            }
        }
        Ok(hello)
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        if let Some(v) = self.firmware_version {
            codec::write_u16(&mut buf, TAG_FIRMWARE_VERSION, v);
        }
        if let Some(v) = self.protocol_version {
            codec::write_u16(&mut buf, TAG_PROTOCOL_VERSION, v);
        }
        if let Some(s) = &self.serial_number {
            codec::write_string(&mut buf, TAG_SERIAL_NUMBER, s);
        }
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_payload_has_no_fields() {
        assert_eq!(Hello::decode(&[]).unwrap(), Hello::default());
    }

    #[test]
    fn decode_all_fields() {
        let payload = [
            0x01, 0x02, 0x12, 0x00, // firmware 18
            0x02, 0x02, 0x01, 0x00, // protocol 1
            0x03, 0x05, b'f', b'l', b'o', b'w', b'0',
        ];
        let hello = Hello::decode(&payload).unwrap();
        assert_eq!(hello.firmware_version, Some(18));
        assert_eq!(hello.protocol_version, Some(1));
        assert_eq!(hello.serial_number.as_deref(), Some("flow0"));
    }

    #[test]
    fn unknown_tags_skipped() {
        let payload = [0x7F, 0x01, 0xAA, 0x02, 0x02, 0x01, 0x00];
        let hello = Hello::decode(&payload).unwrap();
        assert_eq!(hello.protocol_version, Some(1));
        assert_eq!(hello.firmware_version, None);
    }

    #[test]
    fn bad_width_rejected() {
        assert!(Hello::decode(&[0x01, 0x01, 0x05]).is_err());
    }
}
