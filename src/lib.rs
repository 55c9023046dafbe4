pub mod checksum;
pub mod codec;
pub mod config;
pub mod error;
pub mod frame;
pub mod meter;
pub mod protocol;
pub mod reader;
pub mod responder;
pub mod transport;

pub use config::ReaderConfig;
pub use error::WireError;
pub use frame::{AssemblerState, FrameAssembler, RawFrame};
pub use meter::MeterCounter;
pub use protocol::{Hello, Message};
pub use reader::{Reader, ReaderError, ReaderStats};
pub use responder::{Identity, Responder};
pub use transport::{Connector, SerialConnector, Transport};
