//! Sensor and status reports (controller → host).

use crate::codec;
use crate::error::Result;

/// Flow meter tick count. Type 0x10.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MeterStatus {
    /// Meter name, e.g. `"flow0"`
    pub meter_name: Option<String>,
    /// Total ticks since boot
    pub meter_reading: Option<u32>,
}

impl MeterStatus {
    pub fn decode(payload: &[u8]) -> Result<Self> {
        let mut msg = Self::default();
        for field in codec::fields(payload, "MeterStatus")? {
            match field.tag {
                0x01 => msg.meter_name = Some(field.read_string()),
                0x02 => msg.meter_reading = Some(field.read_u32("MeterStatus")?),
                _ => {}
            }
        }
        Ok(msg)
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        if let Some(name) = &self.meter_name {
            codec::write_string(&mut buf, 0x01, name);
        }
        if let Some(v) = self.meter_reading {
            codec::write_u32(&mut buf, 0x02, v);
        }
        buf
    }
}

/// Temperature sensor reading. Type 0x11.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TemperatureReading {
    pub sensor_name: Option<String>,
    /// Temperature in micro-degrees C
    pub sensor_reading: Option<i32>,
}

impl TemperatureReading {
    pub fn decode(payload: &[u8]) -> Result<Self> {
        let mut msg = Self::default();
        for field in codec::fields(payload, "TemperatureReading")? {
            match field.tag {
                0x01 => msg.sensor_name = Some(field.read_string()),
                0x02 => msg.sensor_reading = Some(field.read_i32("TemperatureReading")?),
                _ => {}
            }
        }
        Ok(msg)
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        if let Some(name) = &self.sensor_name {
            codec::write_string(&mut buf, 0x01, name);
        }
        if let Some(v) = self.sensor_reading {
            codec::write_i32(&mut buf, 0x02, v);
        }
        buf
    }

    /// Reading in degrees C.
    pub fn celsius(&self) -> Option<f64> {
        self.sensor_reading.map(|v| f64::from(v) / 1_000_000.0)
    }
}

/// Output (relay) state report. Type 0x12.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OutputStatus {
    pub output_name: Option<String>,
    pub output_reading: Option<u32>,
}

impl OutputStatus {
    pub fn decode(payload: &[u8]) -> Result<Self> {
        let mut msg = Self::default();
        for field in codec::fields(payload, "OutputStatus")? {
            match field.tag {
                0x01 => msg.output_name = Some(field.read_string()),
                0x02 => msg.output_reading = Some(field.read_u32("OutputStatus")?),
                _ => {}
            }
        }
        Ok(msg)
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        if let Some(name) = &self.output_name {
            codec::write_string(&mut buf, 0x01, name);
        }
        if let Some(v) = self.output_reading {
            codec::write_u32(&mut buf, 0x02, v);
        }
        buf
    }
}

/// A 1-wire device appeared on the bus. Type 0x13.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OnewirePresence {
    pub device_id: Option<u64>,
}

impl OnewirePresence {
    pub fn decode(payload: &[u8]) -> Result<Self> {
        let mut msg = Self::default();
        for field in codec::fields(payload, "OnewirePresence")? {
            if field.tag == 0x01 {
                msg.device_id = Some(field.read_u64("OnewirePresence")?);
            }
        }
        Ok(msg)
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        if let Some(id) = self.device_id {
            codec::write_u64(&mut buf, 0x01, id);
        }
        buf
    }
}

/// Auth token (RFID / 1-wire) added or removed. Type 0x14.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AuthToken {
    /// Reader that saw the token, e.g. `"core.rfid"`
    pub device: Option<String>,
    /// Raw token bytes
    pub token: Option<Vec<u8>>,
    /// 1 = present, 0 = removed
    pub status: Option<u8>,
}

impl AuthToken {
    pub fn decode(payload: &[u8]) -> Result<Self> {
        let mut msg = Self::default();
        for field in codec::fields(payload, "AuthToken")? {
            match field.tag {
                0x01 => msg.device = Some(field.read_string()),
                0x02 => msg.token = Some(field.read_bytes()),
                0x03 => msg.status = Some(field.read_u8("AuthToken")?),
                _ => {}
            }
        }
        Ok(msg)
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        if let Some(device) = &self.device {
            codec::write_string(&mut buf, 0x01, device);
        }
        if let Some(token) = &self.token {
            codec::write_field(&mut buf, 0x02, token);
        }
        if let Some(status) = self.status {
            codec::write_u8(&mut buf, 0x03, status);
        }
        buf
    }

    pub fn is_present(&self) -> bool {
        self.status == Some(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meter_status_decode() {
        let payload = [
            0x01, 0x05, b'f', b'l', b'o', b'w', b'0', //
            0x02, 0x04, 0xE8, 0x03, 0x00, 0x00,
        ];
        let m = MeterStatus::decode(&payload).unwrap();
        assert_eq!(m.meter_name.as_deref(), Some("flow0"));
        assert_eq!(m.meter_reading, Some(1000));
    }

    #[test]
    fn temperature_celsius() {
        let t = TemperatureReading {
            sensor_name: Some("thermo-0".into()),
            sensor_reading: Some(-4_250_000),
        };
        assert_eq!(t.celsius(), Some(-4.25));
        assert_eq!(TemperatureReading::decode(&t.encode()).unwrap(), t);
    }

    #[test]
    fn onewire_width_enforced() {
        assert!(OnewirePresence::decode(&[0x01, 0x04, 0, 0, 0, 0]).is_err());
    }

    #[test]
    fn auth_token_presence() {
        let payload = [
            0x01, 0x04, b'r', b'f', b'i', b'd', //
            0x02, 0x03, 0xDE, 0xAD, 0x01, //
            0x03, 0x01, 0x01,
        ];
        let a = AuthToken::decode(&payload).unwrap();
        assert_eq!(a.device.as_deref(), Some("rfid"));
        assert_eq!(a.token, Some(vec![0xDE, 0xAD, 0x01]));
        assert!(a.is_present());
    }

    #[test]
    fn output_status_partial() {
        let o = OutputStatus::decode(&[0x02, 0x04, 0x01, 0x00, 0x00, 0x00]).unwrap();
        assert_eq!(o.output_name, None);
        assert_eq!(o.output_reading, Some(1));
    }
}
