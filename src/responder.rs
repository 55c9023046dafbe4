//! Controller-side dispatch: how a flow-meter board answers the host.
//!
//! The daemon end of the link drains incoming commands and reacts:
//!
//! - `Ping` → reply with `Hello` carrying the board's [`Identity`]
//! - `SetSerialNumber` → adopt the new serial for later Hellos
//! - `SetOutput` → remember the requested output state
//!
//! Everything else is handed back to the caller untouched.

use std::collections::BTreeMap;

use log::{debug, info};

use crate::meter::MeterCounter;
use crate::protocol::{Hello, Message, OutputMode};
use crate::reader::{Reader, ReaderError};
use crate::transport::Connector;

/// What the board reports about itself in a Hello.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Identity {
    pub firmware_version: u16,
    pub protocol_version: u16,
    pub serial_number: String,
}

impl Default for Identity {
    fn default() -> Self {
        Self {
            firmware_version: 1,
            protocol_version: 1,
            serial_number: "flow0".to_string(),
        }
    }
}

impl Identity {
    pub fn hello(&self) -> Hello {
        Hello {
            firmware_version: Some(self.firmware_version),
            protocol_version: Some(self.protocol_version),
            serial_number: Some(self.serial_number.clone()),
        }
    }
}

#[derive(Debug, Default)]
pub struct Responder {
    identity: Identity,
    outputs: BTreeMap<u8, OutputMode>,
}

impl Responder {
    pub fn new(identity: Identity) -> Self {
        Self {
            identity,
            outputs: BTreeMap::new(),
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Last requested mode of `output_id`, if any command named it.
    pub fn output(&self, output_id: u8) -> Option<OutputMode> {
        self.outputs.get(&output_id).copied()
    }

    pub fn outputs(&self) -> &BTreeMap<u8, OutputMode> {
        &self.outputs
    }

    /// Apply one message. Returns the reply to send, if any.
    pub fn handle(&mut self, message: &Message) -> Option<Message> {
        match message {
            Message::Ping => {
                debug!("ping received, answering with hello");
                Some(Message::Hello(self.identity.hello()))
            }
            Message::SetSerialNumber(cmd) => {
                match &cmd.serial_number {
                    Some(serial) => {
                        info!("serial number set to {serial:?}");
                        self.identity.serial_number = serial.clone();
                    }
                    None => debug!("set serial number without a serial, ignored"),
                }
                None
            }
            Message::SetOutput(cmd) => {
                match (cmd.output_id, cmd.output_mode) {
                    (Some(id), Some(mode)) => {
                        info!("output {id} -> {mode:?}");
                        self.outputs.insert(id, mode);
                    }
                    _ => debug!("incomplete set output command ignored: {cmd:?}"),
                }
                None
            }
            _ => None,
        }
    }

    /// Drain the reader, apply every message, and write the replies.
    ///
    /// Returns the drained messages so the caller can react to the ones
    /// this responder does not handle.
    pub fn poll<C: Connector>(&mut self, reader: &mut Reader<C>) -> Result<Vec<Message>, ReaderError> {
        let messages = reader.drain_messages()?;
        for message in &messages {
            if let Some(reply) = self.handle(message) {
                reader.write_message(&reply)?;
            }
        }
        Ok(messages)
    }

    /// Send a MeterStatus report for each meter.
    pub fn report_meters<C: Connector>(
        &self,
        reader: &mut Reader<C>,
        meters: &[&MeterCounter],
    ) -> Result<(), ReaderError> {
        for meter in meters {
            reader.write_message(&meter.status())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{SetOutput, SetSerialNumber};
    use crate::transport::mock::MockDevice;

    fn open_reader() -> (Reader<MockDevice>, MockDevice) {
        let dev = MockDevice::new();
        let mut reader = Reader::new(dev.clone());
        reader.open().unwrap();
        (reader, dev)
    }

    #[test]
    fn ping_gets_hello() {
        let mut r = Responder::default();
        let reply = r.handle(&Message::Ping).unwrap();
        assert_eq!(
            reply,
            Message::Hello(Hello {
                firmware_version: Some(1),
                protocol_version: Some(1),
                serial_number: Some("flow0".into()),
            })
        );
    }

    #[test]
    fn serial_number_used_in_later_hello() {
        let mut r = Responder::default();
        assert_eq!(r.handle(&Message::SetSerialNumber(SetSerialNumber::new("keg-9"))), None);
        match r.handle(&Message::Ping) {
            Some(Message::Hello(h)) => assert_eq!(h.serial_number.as_deref(), Some("keg-9")),
            other => panic!("expected hello, got {other:?}"),
        }
    }

    #[test]
    fn set_output_recorded() {
        let mut r = Responder::default();
        r.handle(&Message::SetOutput(SetOutput::new(3, OutputMode::Enabled)));
        r.handle(&Message::SetOutput(SetOutput::new(3, OutputMode::Disabled)));
        r.handle(&Message::SetOutput(SetOutput {
            output_id: Some(4),
            output_mode: None,
        }));
        assert_eq!(r.output(3), Some(OutputMode::Disabled));
        assert_eq!(r.output(4), None);
        assert_eq!(r.outputs().len(), 1);
    }

    #[test]
    fn poll_replies_over_the_link() {
        let (mut reader, dev) = open_reader();
        dev.push(&Message::Ping.encode().unwrap());
        let mut r = Responder::default();
        let handled = r.poll(&mut reader).unwrap();
        assert_eq!(handled, vec![Message::Ping]);
        assert_eq!(
            dev.written(),
            Message::Hello(Identity::default().hello()).encode().unwrap()
        );
    }

    #[test]
    fn report_meters_writes_status() {
        let (mut reader, dev) = open_reader();
        let m = MeterCounter::new("flow0");
        m.tick();
        Responder::default().report_meters(&mut reader, &[&m]).unwrap();
        assert_eq!(dev.written(), m.status().encode().unwrap());
    }
}
