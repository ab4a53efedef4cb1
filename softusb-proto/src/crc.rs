//! Packet checksums.
//!
//! Token packets carry a CRC-5 over their 11 address/endpoint bits, data packets a
//! CRC-16 over the payload. Both are transmitted LSB first and inverted.

use crc::{Crc, CRC_16_USB};

/// CRC-16/USB calculator with lookup table.
const CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_USB);

/// Reflected CRC-5 generator polynomial (x^5 + x^2 + 1).
const CRC5_POLY: u8 = 0x14;

/// Calculate the data packet CRC-16 of a payload.
///
/// The returned value is sent low byte first.
#[inline]
#[must_use]
pub fn crc16(data: &[u8]) -> u16 {
    CRC16.checksum(data)
}

/// Calculate the token CRC-5 of the low 11 bits of `field`.
///
/// `field` is `address | endpoint << 7` for IN/OUT/SETUP tokens, or the frame
/// number for SOF. The `crc` crate only handles byte-aligned input, so this one is
/// computed bitwise.
#[must_use]
pub const fn crc5(field: u16) -> u8 {
    let mut crc: u8 = 0x1F;
    let mut i = 0;
    while i < 11 {
        let bit = ((field >> i) & 1) as u8;
        if (crc ^ bit) & 1 != 0 {
            crc = (crc >> 1) ^ CRC5_POLY;
        } else {
            crc >>= 1;
        }
        i += 1;
    }
    crc ^ 0x1F
}
