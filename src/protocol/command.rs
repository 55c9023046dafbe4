//! Host → controller commands.

use crate::codec;
use crate::error::{Result, WireError};

/// Requested state of a controller output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum OutputMode {
    Disabled = 0,
    Enabled = 1,
}

impl OutputMode {
    pub fn from_byte(b: u8) -> Result<Self> {
        match b {
            0 => Ok(Self::Disabled),
            1 => Ok(Self::Enabled),
            value => Err(WireError::InvalidOutputMode { value }),
        }
    }

    pub fn as_byte(self) -> u8 {
        self as u8
    }
}

impl From<bool> for OutputMode {
    fn from(enable: bool) -> Self {
        if enable { Self::Enabled } else { Self::Disabled }
    }
}

/// Switch an output on or off. Type 0x84.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SetOutput {
    pub output_id: Option<u8>,
    pub output_mode: Option<OutputMode>,
}

impl SetOutput {
    pub fn new(output_id: u8, mode: OutputMode) -> Self {
        Self {
            output_id: Some(output_id),
            output_mode: Some(mode),
        }
    }

    pub fn decode(payload: &[u8]) -> Result<Self> {
        let mut cmd = Self::default();
        for field in codec::fields(payload, "SetOutput")? {
            match field.tag {
                0x01 => cmd.output_id = Some(field.read_u8("SetOutput")?),
                0x02 => {
                    cmd.output_mode = Some(OutputMode::from_byte(field.read_u8("SetOutput")?)?);
                }
                _ => {}
            }
        }
        Ok(cmd)
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        if let Some(id) = self.output_id {
            codec::write_u8(&mut buf, 0x01, id);
        }
        if let Some(mode) = self.output_mode {
            codec::write_u8(&mut buf, 0x02, mode.as_byte());
        }
        buf
    }
}

/// Assign the controller's serial number. Type 0x85.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SetSerialNumber {
    pub serial_number: Option<String>,
}

impl SetSerialNumber {
    pub fn new(serial_number: impl Into<String>) -> Self {
        Self {
            serial_number: Some(serial_number.into()),
        }
    }

    pub fn decode(payload: &[u8]) -> Result<Self> {
        let mut cmd = Self::default();
        for field in codec::fields(payload, "SetSerialNumber")? {
            if field.tag == 0x01 {
                cmd.serial_number = Some(field.read_string());
            }
        }
        Ok(cmd)
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        if let Some(s) = &self.serial_number {
            codec::write_string(&mut buf, 0x01, s);
        }
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_output_wire_bytes() {
        let cmd = SetOutput::new(3, OutputMode::Enabled);
        assert_eq!(cmd.encode(), vec![0x01, 0x01, 0x03, 0x02, 0x01, 0x01]);
    }

    #[test]
    fn set_output_invalid_mode() {
        assert_eq!(
            SetOutput::decode(&[0x01, 0x01, 0x00, 0x02, 0x01, 0x07]),
            Err(WireError::InvalidOutputMode { value: 7 })
        );
    }

    #[test]
    fn output_mode_from_bool() {
        assert_eq!(OutputMode::from(true), OutputMode::Enabled);
        assert_eq!(OutputMode::from(false), OutputMode::Disabled);
    }

    #[test]
    fn serial_number_round_trip() {
        let cmd = SetSerialNumber::new("KB-0042");
        assert_eq!(SetSerialNumber::decode(&cmd.encode()).unwrap(), cmd);
    }
}
