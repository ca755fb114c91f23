//! Sensirion word checksum
//!
//! Every 16-bit word on the wire is followed by a CRC-8 over its two bytes.
//! Polynomial 0x31, initial value 0xFF, no reflection, no final XOR
//! (catalogued as CRC-8/NRSC-5).

use crc::{Algorithm, Crc};

/// CRC-8 used by the SCD4x for every transmitted word.
/// Check value: 0xF7 (for "123456789").
const SENSIRION_CRC: Algorithm<u8> = Algorithm {
    width: 8,
    poly: 0x31,
    init: 0xFF,
    refin: false,
    refout: false,
    xorout: 0x00,
    check: 0xF7,
    residue: 0x00,
};

const CRC_COMPUTER: Crc<u8> = Crc::<u8>::new(&SENSIRION_CRC);

/// Checksum over exactly the two bytes of one word (big-endian).
#[inline]
pub fn word_crc(word: u16) -> u8 {
    CRC_COMPUTER.checksum(&word.to_be_bytes())
}

/// Serialises a word as it appears on the bus: MSB, LSB, CRC.
#[inline]
pub fn encode_word(word: u16) -> [u8; 3] {
    let [msb, lsb] = word.to_be_bytes();
    [msb, lsb, word_crc(word)]
}

/// Decodes one wire triple. Returns the word together with whether its
/// checksum matched; callers decide what a mismatch means.
#[inline]
pub fn decode_word(triple: [u8; 3]) -> (u16, bool) {
    let word = u16::from_be_bytes([triple[0], triple[1]]);
    (word, word_crc(word) == triple[2])
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    /// Bitwise form from the datasheet, kept as the reference.
    fn reference_crc(data: &[u8]) -> u8 {
        let mut crc: u8 = 0xFF;
        for byte in data {
            crc ^= byte;
            for _ in 0..8 {
                crc = if crc & 0x80 != 0 {
                    (crc << 1) ^ 0x31
                } else {
                    crc << 1
                };
            }
        }
        crc
    }

    #[test]
    fn datasheet_example() {
        // Datasheet: CRC(0xBEEF) = 0x92
        assert_eq!(word_crc(0xBEEF), 0x92);
        assert_eq!(encode_word(0xBEEF), [0xBE, 0xEF, 0x92]);
    }

    #[test]
    fn matches_reference_for_every_word() {
        for word in 0..=u16::MAX {
            assert_eq!(word_crc(word), reference_crc(&word.to_be_bytes()));
        }
    }

    #[test]
    fn check_value() {
        assert_eq!(CRC_COMPUTER.checksum(b"123456789"), 0xF7);
        assert_eq!(reference_crc(b"123456789"), 0xF7);
    }

    #[test]
    fn every_single_byte_corruption_is_detected() {
        // An 8-bit CRC catches every burst of up to 8 bits, so for each of the
        // three wire bytes the only undetected pattern is the identity.
        for word in [0x0000, 0x01F4, 0x6667, 0xBEEF, 0xFFFF] {
            let wire = encode_word(word);
            for position in 0..3 {
                let undetected: Vec<u8> = (0..=255u8)
                    .filter(|mask| {
                        let mut corrupted = wire;
                        corrupted[position] ^= mask;
                        decode_word(corrupted).1
                    })
                    .collect();
                assert_eq!(undetected, [0u8], "word {:#06x} byte {}", word, position);
            }
        }
    }

    #[test]
    fn decode_reports_word_and_validity() {
        assert_eq!(decode_word([0xBE, 0xEF, 0x92]), (0xBEEF, true));
        assert_eq!(decode_word([0xBE, 0xEF, 0x93]), (0xBEEF, false));
    }
}
