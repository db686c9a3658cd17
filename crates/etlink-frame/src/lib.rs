//! Sync-byte framing with XOR checksum for serial links.
//!
//! Every payload travels as:
//! - two sync bytes `0x06 0x85`
//! - a one-byte payload length
//! - the payload (at most 255 bytes)
//! - a one-byte checksum: the length XORed with every payload byte
//!
//! The assemblers recover frame boundaries from an arbitrary byte stream,
//! dropping noise and corrupted frames without losing the ones that follow.

pub mod assembler;
pub mod codec;
pub mod error;
pub mod reader;
pub mod writer;

#[cfg(feature = "async")]
pub mod tokio_codec;

pub use assembler::{AssemblerStats, FrameAssembler, RecordAssembler};
pub use codec::{
    build_frame, checksum, encode_frame, FrameConfig, DEFAULT_MAX_BUFFERED, FRAME_OVERHEAD,
    HEADER_SIZE, MAX_FRAME_SIZE, MAX_PAYLOAD, SYNC,
};
pub use error::{FrameError, Result};
pub use reader::FrameReader;
pub use writer::FrameWriter;

#[cfg(feature = "async")]
pub use tokio_codec::{Assembled, FrameCodec};
