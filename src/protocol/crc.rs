//! # CRC16-CCITT Implementation
//!
//! CRC-16/XMODEM checksum used by the CoDrone EDU firmware.
//!
//! **Polynomial**: 0x1021 (x^16 + x^12 + x^5 + 1)
//! **Initial Value**: 0x0000, no reflection, no final XOR

/// CRC-16-CCITT polynomial
const CRC16_POLY: u16 = 0x1021;

/// Precomputed CRC16 lookup table for fast calculation
const CRC16_TABLE: [u16; 256] = generate_crc16_table();

/// Generate CRC16 lookup table at compile time
const fn generate_crc16_table() -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut i = 0;

    while i < 256 {
        let mut crc = (i as u16) << 8;
        let mut j = 0;

        while j < 8 {
            if (crc & 0x8000) != 0 {
                crc = (crc << 1) ^ CRC16_POLY;
            } else {
                crc <<= 1;
            }
            j += 1;
        }

        table[i] = crc;
        i += 1;
    }

    table
}

/// Fold one byte into a running CRC16
///
/// The receiver uses this to checksum a frame while it is still arriving.
#[inline]
pub fn crc16_update(crc: u16, byte: u8) -> u16 {
    (crc << 8) ^ CRC16_TABLE[(((crc >> 8) as u8) ^ byte) as usize]
}

/// Continue a CRC16 over `data`, starting from `crc`
pub fn crc16_extend(crc: u16, data: &[u8]) -> u16 {
    data.iter().fold(crc, |crc, &byte| crc16_update(crc, byte))
}

/// Calculate CRC16-CCITT checksum using lookup table
///
/// # Arguments
///
/// * `data` - Byte slice to calculate CRC for (Header + Payload)
///
/// # Examples
///
/// ```
/// use codrone_link::protocol::crc::crc16_ccitt;
///
/// assert_eq!(crc16_ccitt(b"123456789"), 0x31C3);
/// ```
pub fn crc16_ccitt(data: &[u8]) -> u16 {
    crc16_extend(0, data)
}

/// Bitwise CRC16 (slow, for verifying the table)
#[cfg(test)]
fn crc16_ccitt_slow(data: &[u8]) -> u16 {
    let mut crc: u16 = 0;

    for &byte in data {
        crc ^= (byte as u16) << 8;

        for _ in 0..8 {
            if (crc & 0x8000) != 0 {
                crc = (crc << 1) ^ CRC16_POLY;
            } else {
                crc <<= 1;
            }
        }
    }

    crc
}
