//! CRC32 integrity code appended to every payload.
//!
//! The checksum is the IEEE 802.3 CRC32 (the same value `zlib.crc32`
//! produces) computed over the payload bytes only, and travels as 4
//! big-endian bytes directly after the payload.
//!
//! # Example
//!
//! ```rust
//! use nodelink::Crc32;
//!
//! let frame = Crc32::append(b"hello");
//! assert_eq!(frame.len(), 5 + nodelink::CHECKSUM_SIZE);
//! assert_eq!(Crc32::verify_and_strip(&frame), Some(&b"hello"[..]));
//! ```

/// Size of the encoded checksum in bytes.
pub const CHECKSUM_SIZE: usize = 4;

/// CRC32 checksum codec.
///
/// All methods are pure; the type only groups them.
#[derive(Debug, Clone, Copy)]
pub struct Crc32;

impl Crc32 {
    /// Computes the CRC32 checksum of the given data.
    #[inline]
    pub fn compute(data: &[u8]) -> u32 {
        crc32fast::hash(data)
    }

    /// Verifies that the data matches the expected checksum.
    #[inline]
    pub fn verify(data: &[u8], expected: u32) -> bool {
        Self::compute(data) == expected
    }

    /// Returns `payload` followed by its big-endian CRC32.
    pub fn append(payload: &[u8]) -> Vec<u8> {
        let mut frame = Vec::with_capacity(payload.len() + CHECKSUM_SIZE);
        Self::append_into(&mut frame, payload);
        frame
    }

    /// Appends `payload` and its big-endian CRC32 to `out`.
    pub fn append_into(out: &mut Vec<u8>, payload: &[u8]) {
        out.extend_from_slice(payload);
        out.extend_from_slice(&Self::compute(payload).to_be_bytes());
    }

    /// Splits off the trailing checksum and returns the payload if it matches.
    ///
    /// Returns `None` when the buffer cannot even hold a checksum or when the
    /// recomputed CRC differs from the stored one.
    pub fn verify_and_strip(buf: &[u8]) -> Option<&[u8]> {
        if buf.len() < CHECKSUM_SIZE {
            return None;
        }
        let (payload, crc) = buf.split_at(buf.len() - CHECKSUM_SIZE);
        let stored = u32::from_be_bytes([crc[0], crc[1], crc[2], crc[3]]);
        Self::verify(payload, stored).then_some(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_empty_data() {
        assert_eq!(Crc32::compute(&[]), 0x00000000);
    }

    #[test]
    fn test_known_values() {
        // "123456789" should produce 0xCBF43926
        assert_eq!(Crc32::compute(b"123456789"), 0xCBF43926);
    }

    #[test]
    fn test_append_layout() {
        let frame = Crc32::append(b"123456789");
        assert_eq!(&frame[..9], b"123456789");
        assert_eq!(&frame[9..], &[0xCB, 0xF4, 0x39, 0x26]);
    }

    #[test]
    fn test_empty_payload_round_trip() {
        let frame = Crc32::append(&[]);
        assert_eq!(frame.len(), CHECKSUM_SIZE);
        assert_eq!(Crc32::verify_and_strip(&frame), Some(&[][..]));
    }

    #[test]
    fn test_short_buffer_is_invalid() {
        assert_eq!(Crc32::verify_and_strip(&[]), None);
        assert_eq!(Crc32::verify_and_strip(&[0, 0, 0]), None);
    }

    #[test]
    fn test_corrupt_checksum_byte() {
        let mut frame = Crc32::append(b"cmd:stop");
        let last = frame.len() - 1;
        frame[last] ^= 0x01;
        assert_eq!(Crc32::verify_and_strip(&frame), None);
    }

    proptest! {
        #[test]
        fn prop_round_trip(payload in proptest::collection::vec(any::<u8>(), 0..512)) {
            let frame = Crc32::append(&payload);
            prop_assert_eq!(Crc32::verify_and_strip(&frame), Some(&payload[..]));
        }

        #[test]
        fn prop_single_bit_flip_detected(
            payload in proptest::collection::vec(any::<u8>(), 0..512),
            bit in any::<prop::sample::Index>(),
        ) {
            let mut frame = Crc32::append(&payload);
            let bit = bit.index(frame.len() * 8);
            frame[bit / 8] ^= 1 << (bit % 8);
            prop_assert_eq!(Crc32::verify_and_strip(&frame), None);
        }
    }
}
