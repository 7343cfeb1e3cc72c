//! Stream frame encoding and incremental decoding.
//!
//! # Frame Format
//!
//! ```text
//! 0                   1                   2                   3
//! 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                     Length (payload + 4)                      |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                          Payload...                           |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                     CRC32 of the payload                      |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! All integers are big-endian.

use std::io::{self, Read};

use super::checksum::{CHECKSUM_SIZE, Crc32};
use crate::error::{Error, Result};
use crate::io::{Fill, fill_to};

/// Size of the length prefix in bytes.
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Smallest valid value of the length prefix (an empty payload).
pub const MIN_FRAME_LENGTH: usize = CHECKSUM_SIZE;

/// Default upper bound on the length prefix (1 MiB).
pub const DEFAULT_MAX_FRAME_SIZE: usize = 1024 * 1024;

/// Why a stream frame was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorruptFrame {
    /// The length prefix cannot even hold a checksum.
    Undersized {
        /// Decoded length prefix.
        length: u32,
    },
    /// The length prefix exceeds the configured maximum frame size.
    Oversized {
        /// Decoded length prefix.
        length: u32,
    },
    /// The CRC stored in the frame does not match its payload.
    Checksum,
}

/// Outcome of one decode attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// A complete, verified payload.
    Payload(Vec<u8>),
    /// The reader timed out; partial bytes are retained.
    Pending,
    /// The peer closed the stream.
    Closed,
    /// The frame was discarded.
    Corrupt(CorruptFrame),
}

/// Builds the on-wire stream frame for `payload`.
///
/// Fails with [`Error::PayloadTooLarge`] when the length prefix would exceed
/// `max_frame_size`.
pub fn encode(payload: &[u8], max_frame_size: usize) -> Result<Vec<u8>> {
    let length = payload.len() + CHECKSUM_SIZE;
    if length > max_frame_size || u32::try_from(length).is_err() {
        return Err(Error::PayloadTooLarge {
            size: payload.len(),
            max: max_frame_size.saturating_sub(CHECKSUM_SIZE),
        });
    }

    let mut frame = Vec::with_capacity(LENGTH_PREFIX_SIZE + length);
    frame.extend_from_slice(&(length as u32).to_be_bytes());
    Crc32::append_into(&mut frame, payload);
    Ok(frame)
}

/// Incremental stream frame decoder.
///
/// Holds the bytes of a frame that is still arriving, so a read timeout in
/// the middle of a frame does not lose data: the next call picks up exactly
/// where the previous one stopped.
#[derive(Debug)]
pub struct FrameReader {
    max_frame_size: usize,
    buf: Vec<u8>,
    /// Length prefix of the frame in progress, once the header is complete.
    body_len: Option<usize>,
}

impl FrameReader {
    /// Creates a decoder accepting length prefixes up to `max_frame_size`.
    pub fn new(max_frame_size: usize) -> Self {
        Self {
            max_frame_size,
            buf: Vec::with_capacity(LENGTH_PREFIX_SIZE),
            body_len: None,
        }
    }

    /// Reads from `src` until one frame is complete, the read times out, the
    /// peer closes, or the frame turns out to be corrupt.
    pub fn read_frame<R: Read + ?Sized>(&mut self, src: &mut R) -> io::Result<Decoded> {
        let body_len = match self.body_len {
            Some(len) => len,
            None => {
                match fill_to(src, &mut self.buf, LENGTH_PREFIX_SIZE)? {
                    Fill::Complete => {}
                    Fill::TimedOut => return Ok(Decoded::Pending),
                    Fill::Closed => return Ok(Decoded::Closed),
                }
                let length = u32::from_be_bytes([self.buf[0], self.buf[1], self.buf[2], self.buf[3]]);
                self.buf.clear();

                let len = length as usize;
                if len < MIN_FRAME_LENGTH {
                    return Ok(Decoded::Corrupt(CorruptFrame::Undersized { length }));
                }
                if len > self.max_frame_size {
                    return Ok(Decoded::Corrupt(CorruptFrame::Oversized { length }));
                }
                self.buf.reserve(len);
                self.body_len = Some(len);
                len
            }
        };

        match fill_to(src, &mut self.buf, body_len)? {
            Fill::Complete => {}
            Fill::TimedOut => return Ok(Decoded::Pending),
            Fill::Closed => return Ok(Decoded::Closed),
        }

        self.body_len = None;
        let body = std::mem::take(&mut self.buf);
        match Crc32::verify_and_strip(&body) {
            Some(payload) => {
                let len = payload.len();
                let mut payload = body;
                payload.truncate(len);
                Ok(Decoded::Payload(payload))
            }
            None => Ok(Decoded::Corrupt(CorruptFrame::Checksum)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::testing::{ScriptedReader, Step};

    fn frame(payload: &[u8]) -> Vec<u8> {
        encode(payload, DEFAULT_MAX_FRAME_SIZE).unwrap()
    }

    #[test]
    fn test_encode_layout() {
        let bytes = frame(b"cmd:stop");
        assert_eq!(&bytes[..4], &12u32.to_be_bytes());
        assert_eq!(&bytes[4..12], b"cmd:stop");
        assert_eq!(&bytes[12..], &Crc32::compute(b"cmd:stop").to_be_bytes());
    }

    #[test]
    fn test_encode_rejects_oversized_payload() {
        let err = encode(&[0u8; 17], 20).unwrap_err();
        assert!(matches!(err, Error::PayloadTooLarge { size: 17, max: 16 }));
        assert!(encode(&[0u8; 16], 20).is_ok());
    }

    #[test]
    fn test_decode_single_frame() {
        let mut src = ScriptedReader::new([Step::Data(frame(b"cmd:stop"))]);
        let mut reader = FrameReader::new(DEFAULT_MAX_FRAME_SIZE);
        assert_eq!(
            reader.read_frame(&mut src).unwrap(),
            Decoded::Payload(b"cmd:stop".to_vec())
        );
        assert!(reader.buf.is_empty());
        assert_eq!(reader.body_len, None);
    }

    #[test]
    fn test_decode_byte_by_byte() {
        let bytes = frame(b"split everywhere");
        let mut src = ScriptedReader::new(bytes.iter().map(|b| Step::Data(vec![*b])));
        let mut reader = FrameReader::new(DEFAULT_MAX_FRAME_SIZE);
        assert_eq!(
            reader.read_frame(&mut src).unwrap(),
            Decoded::Payload(b"split everywhere".to_vec())
        );
    }

    #[test]
    fn test_timeout_mid_frame_resumes() {
        let bytes = frame(b"resume me");
        let mut src = ScriptedReader::new([
            Step::Data(bytes[..2].to_vec()),
            Step::Timeout,
            Step::Data(bytes[2..7].to_vec()),
            Step::Timeout,
            Step::Data(bytes[7..].to_vec()),
        ]);
        let mut reader = FrameReader::new(DEFAULT_MAX_FRAME_SIZE);

        assert_eq!(reader.read_frame(&mut src).unwrap(), Decoded::Pending);
        assert_eq!(reader.buf, bytes[..2].to_vec());
        assert_eq!(reader.read_frame(&mut src).unwrap(), Decoded::Pending);
        assert_eq!(
            reader.read_frame(&mut src).unwrap(),
            Decoded::Payload(b"resume me".to_vec())
        );
    }

    #[test]
    fn test_back_to_back_frames() {
        let mut bytes = frame(b"one");
        bytes.extend(frame(b""));
        bytes.extend(frame(b"three"));
        let mut src = ScriptedReader::new([Step::Data(bytes)]);
        let mut reader = FrameReader::new(DEFAULT_MAX_FRAME_SIZE);

        assert_eq!(reader.read_frame(&mut src).unwrap(), Decoded::Payload(b"one".to_vec()));
        assert_eq!(reader.read_frame(&mut src).unwrap(), Decoded::Payload(Vec::new()));
        assert_eq!(reader.read_frame(&mut src).unwrap(), Decoded::Payload(b"three".to_vec()));
        assert_eq!(reader.read_frame(&mut src).unwrap(), Decoded::Closed);
    }

    #[test]
    fn test_undersized_length_never_reaches_checksum() {
        // Length 3 followed by bytes that would be a valid CRC of nothing.
        let mut bytes = 3u32.to_be_bytes().to_vec();
        bytes.extend_from_slice(&Crc32::compute(&[]).to_be_bytes());
        let mut src = ScriptedReader::new([Step::Data(bytes)]);
        let mut reader = FrameReader::new(DEFAULT_MAX_FRAME_SIZE);

        assert_eq!(
            reader.read_frame(&mut src).unwrap(),
            Decoded::Corrupt(CorruptFrame::Undersized { length: 3 })
        );
        assert!(reader.buf.is_empty());
        assert_eq!(reader.body_len, None);
    }

    #[test]
    fn test_oversized_length_rejected() {
        let mut src = ScriptedReader::new([Step::Data(u32::MAX.to_be_bytes().to_vec())]);
        let mut reader = FrameReader::new(64);
        assert_eq!(
            reader.read_frame(&mut src).unwrap(),
            Decoded::Corrupt(CorruptFrame::Oversized { length: u32::MAX })
        );
    }

    #[test]
    fn test_bad_checksum() {
        let mut bytes = frame(b"cmd:stop");
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        let mut src = ScriptedReader::new([Step::Data(bytes)]);
        let mut reader = FrameReader::new(DEFAULT_MAX_FRAME_SIZE);
        assert_eq!(
            reader.read_frame(&mut src).unwrap(),
            Decoded::Corrupt(CorruptFrame::Checksum)
        );
    }

    #[test]
    fn test_close_mid_payload() {
        let bytes = frame(b"truncated");
        let mut src = ScriptedReader::new([Step::Data(bytes[..6].to_vec())]);
        let mut reader = FrameReader::new(DEFAULT_MAX_FRAME_SIZE);
        assert_eq!(reader.read_frame(&mut src).unwrap(), Decoded::Closed);
    }
}
