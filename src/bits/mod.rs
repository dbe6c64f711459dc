use byteorder::{BigEndian, ByteOrder};

use crate::config;
use crate::error::{Result, StegoError};

/// How undecodable UTF-8 sequences are treated when rebuilding a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Utf8Policy {
    /// Substitute U+FFFD for each invalid sequence.
    Replace,
    /// Drop invalid sequences.
    Ignore,
}

/// Expand bytes into bits, MSB first.
///
/// A bitstream holds one bit (0 or 1) per element. Each codec frames its
/// payload with its own convention below.
pub fn to_bits(bytes: &[u8]) -> Vec<u8> {
    let mut bits = Vec::with_capacity(bytes.len() * 8);
    for &byte in bytes {
        for shift in (0..8).rev() {
            bits.push((byte >> shift) & 1);
        }
    }
    bits
}

/// Pack bits into bytes, MSB first. A trailing partial byte is dropped.
pub fn from_bits(bits: &[u8]) -> Vec<u8> {
    bits.chunks_exact(8)
        .map(|chunk| chunk.iter().fold(0u8, |acc, &bit| (acc << 1) | (bit & 1)))
        .collect()
}

/// Decode message bytes as UTF-8 under the given policy.
pub fn decode_text(bytes: &[u8], policy: Utf8Policy) -> String {
    match policy {
        Utf8Policy::Replace => String::from_utf8_lossy(bytes).into_owned(),
        Utf8Policy::Ignore => decode_ignoring_invalid(bytes),
    }
}

fn decode_ignoring_invalid(mut bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    loop {
        match std::str::from_utf8(bytes) {
            Ok(valid) => {
                out.push_str(valid);
                return out;
            }
            Err(e) => {
                let (valid, rest) = bytes.split_at(e.valid_up_to());
                if let Ok(valid) = std::str::from_utf8(valid) {
                    out.push_str(valid);
                }
                match e.error_len() {
                    Some(skip) => bytes = &rest[skip..],
                    // truncated sequence at the very end
                    None => return out,
                }
            }
        }
    }
}

/// Message bits followed by the 16-bit sentinel (LSB-matching, DCT).
pub fn frame_with_sentinel(message: &str) -> Vec<u8> {
    let mut bits = to_bits(message.as_bytes());
    bits.extend_from_slice(&config::SENTINEL_BITS);
    bits
}

/// Bit count of a sentinel-framed message of `message_len` bytes.
pub fn sentinel_framed_len(message_len: usize) -> usize {
    message_len * 8 + config::SENTINEL_BITS.len()
}

/// Index of the first sentinel occurrence, searching from `from`.
pub fn find_sentinel(bits: &[u8], from: usize) -> Option<usize> {
    let sentinel = &config::SENTINEL_BITS;
    bits.get(from..)?
        .windows(sentinel.len())
        .position(|window| window == sentinel)
        .map(|pos| pos + from)
}

/// Even-parity bit: 1 iff `byte` has an odd number of set bits.
pub fn parity_bit(byte: u8) -> u8 {
    (byte.count_ones() % 2) as u8
}

/// Each byte as 8 data bits plus a parity bit, then an all-zero terminator unit (PVD).
pub fn frame_with_parity(message: &str) -> Vec<u8> {
    let bytes = message.as_bytes();
    let mut bits = Vec::with_capacity(parity_framed_len(bytes.len()));
    for &byte in bytes.iter().chain(std::iter::once(&0u8)) {
        bits.extend(to_bits(&[byte]));
        bits.push(parity_bit(byte));
    }
    bits
}

/// Bit count of a parity-framed message of `message_len` bytes.
pub fn parity_framed_len(message_len: usize) -> usize {
    (message_len + 1) * config::PVD_UNIT_BITS
}

/// 32-bit big-endian byte count followed by the raw bytes (ERDE).
pub fn frame_with_length_prefix(message: &str) -> Result<Vec<u8>> {
    let bytes = message.as_bytes();
    let len = u32::try_from(bytes.len())
        .map_err(|_| StegoError::MessageTooLong { bytes: bytes.len() })?;

    let mut prefix = [0u8; 4];
    BigEndian::write_u32(&mut prefix, len);

    let mut bits = to_bits(&prefix);
    bits.extend(to_bits(bytes));
    Ok(bits)
}

/// Bit count of a length-prefixed message of `message_len` bytes.
pub fn length_prefixed_len(message_len: usize) -> usize {
    config::LENGTH_PREFIX_BITS + message_len * 8
}

/// Read the 32-bit big-endian byte count at the start of `bits`.
pub fn read_length_prefix(bits: &[u8]) -> Result<u32> {
    let header = bits
        .get(..config::LENGTH_PREFIX_BITS)
        .ok_or(StegoError::MissingLengthPrefix {
            available: bits.len(),
        })?;
    Ok(BigEndian::read_u32(&from_bits(header)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_bits_msb_first() {
        // 'h' = 0x68, 'i' = 0x69
        assert_eq!(
            to_bits(b"hi"),
            vec![0, 1, 1, 0, 1, 0, 0, 0, 0, 1, 1, 0, 1, 0, 0, 1]
        );
    }

    #[test]
    fn test_from_bits_drops_partial_byte() {
        let mut bits = to_bits(b"A");
        bits.extend_from_slice(&[1, 1, 1]);
        assert_eq!(from_bits(&bits), b"A".to_vec());
    }

    #[test]
    fn test_sentinel_framing() {
        let bits = frame_with_sentinel("hi");
        assert_eq!(bits.len(), sentinel_framed_len(2));
        assert_eq!(bits.len(), 32);
        assert_eq!(find_sentinel(&bits, 0), Some(16));
    }

    #[test]
    fn test_sentinel_not_confused_by_trailing_ones() {
        // 0x7F ends in seven ones, directly followed by the sentinel
        let mut bits = to_bits(&[0x7F]);
        bits.extend_from_slice(&config::SENTINEL_BITS);
        assert_eq!(find_sentinel(&bits, 0), Some(8));
        assert_eq!(find_sentinel(&bits, 9), None);
    }

    #[test]
    fn test_parity_framing() {
        let bits = frame_with_parity("a");
        // 'a' = 0x61 has three set bits -> parity 1, then the zero unit
        assert_eq!(&bits[..9], &[0, 1, 1, 0, 0, 0, 0, 1, 1]);
        assert_eq!(&bits[9..], &[0; 9]);
        assert_eq!(bits.len(), parity_framed_len(1));
    }

    #[test]
    fn test_length_prefix() {
        let bits = frame_with_length_prefix("hey").unwrap();
        assert_eq!(bits.len(), length_prefixed_len(3));
        assert_eq!(read_length_prefix(&bits).unwrap(), 3);
        assert_eq!(from_bits(&bits[32..]), b"hey".to_vec());
    }

    #[test]
    fn test_short_length_prefix() {
        let result = read_length_prefix(&[1; 31]);
        assert!(matches!(
            result,
            Err(StegoError::MissingLengthPrefix { available: 31 })
        ));
    }

    #[test]
    fn test_utf8_policies() {
        let bytes = [b'o', b'k', 0xC3, b'!', 0xE2, 0x82];
        assert_eq!(decode_text(&bytes, Utf8Policy::Ignore), "ok!");
        assert_eq!(
            decode_text(&bytes, Utf8Policy::Replace),
            "ok\u{FFFD}!\u{FFFD}"
        );
        assert_eq!(decode_text("héllo".as_bytes(), Utf8Policy::Ignore), "héllo");
    }
}
