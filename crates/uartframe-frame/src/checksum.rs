//! CRC-16/XMODEM, the integrity check carried by every frame.
//!
//! Poly `0x1021`, init `0x0000`, no reflection, no final xor.

use crc::{Crc, CRC_16_XMODEM};

const XMODEM: Crc<u16> = Crc::<u16>::new(&CRC_16_XMODEM);

/// Checksum of exactly the given payload bytes.
pub fn checksum(payload: &[u8]) -> u16 {
    XMODEM.checksum(payload)
}
