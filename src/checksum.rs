//! CRC-16/CCITT frame checksum.
//!
//! The controller firmware uses the reflected CCITT form (polynomial 0x1021,
//! initial value 0, no final XOR), catalogued as CRC-16/KERMIT.

use crc::{CRC_16_KERMIT, Crc};

const CCITT: Crc<u16> = Crc::<u16>::new(&CRC_16_KERMIT);

/// Compute the checksum of `bytes`.
pub fn compute(bytes: &[u8]) -> u16 {
    CCITT.checksum(bytes)
}
