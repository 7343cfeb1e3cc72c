//! Core wire-level building blocks.
//!
//! - Checksum: CRC32 appended to every datagram and stream payload
//! - Frame: length-prefixed stream framing and its incremental decoder

mod checksum;
mod frame;

pub use checksum::{CHECKSUM_SIZE, Crc32};
pub use frame::{
    CorruptFrame, DEFAULT_MAX_FRAME_SIZE, Decoded, FrameReader, LENGTH_PREFIX_SIZE,
    MIN_FRAME_LENGTH, encode,
};
