use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Sync bytes that open every frame.
pub const SYNC: [u8; 2] = [0x06, 0x85];

/// Sync (2) + length (1).
pub const HEADER_SIZE: usize = 3;

/// Bytes a frame adds around its payload: sync, length, checksum.
pub const FRAME_OVERHEAD: usize = HEADER_SIZE + 1;

/// Largest payload the one-byte length can describe.
pub const MAX_PAYLOAD: usize = u8::MAX as usize;

/// Largest possible frame on the wire.
pub const MAX_FRAME_SIZE: usize = MAX_PAYLOAD + FRAME_OVERHEAD;

/// Default cap on unsynchronized receive-buffer bytes.
pub const DEFAULT_MAX_BUFFERED: usize = 1024;

/// Frame checksum: the length byte XORed with every payload byte in order.
///
/// Callers must ensure `payload.len() <= MAX_PAYLOAD`; the length is truncated
/// to a byte exactly like the firmware does.
pub fn checksum(payload: &[u8]) -> u8 {
    payload
        .iter()
        .fold(payload.len() as u8, |acc, byte| acc ^ byte)
}

/// Append a frame carrying `payload` to `dst`.
///
/// Wire format:
/// ```text
/// ┌───────────┬─────────┬─────────────────┬──────────┐
/// │ Sync (2B) │ Len (1B)│ Payload         │ Checksum │
/// │ 0x06 0x85 │         │ (Len bytes)     │ (1B XOR) │
/// └───────────┴─────────┴─────────────────┴──────────┘
/// ```
pub fn encode_frame(payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    if payload.len() > MAX_PAYLOAD {
        return Err(FrameError::PayloadTooLarge {
            size: payload.len(),
            max: MAX_PAYLOAD,
        });
    }
    dst.reserve(FRAME_OVERHEAD + payload.len());
    dst.put_slice(&SYNC);
    dst.put_u8(payload.len() as u8);
    dst.put_slice(payload);
    dst.put_u8(checksum(payload));
    Ok(())
}

/// Build a complete frame around `payload`.
pub fn build_frame(payload: &[u8]) -> Result<Bytes> {
    let mut buf = BytesMut::with_capacity(FRAME_OVERHEAD + payload.len());
    encode_frame(payload, &mut buf)?;
    Ok(buf.freeze())
}

/// Configuration for frame assembly.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Receive-buffer bytes kept while no sync sequence is found. Clamped to
    /// at least [`MAX_FRAME_SIZE`]. Default: 1024.
    pub max_buffered: usize,
    /// Bytes requested per transport read. Default: 256.
    pub read_chunk_size: usize,
}

impl FrameConfig {
    pub(crate) fn buffer_cap(&self) -> usize {
        self.max_buffered.max(MAX_FRAME_SIZE)
    }
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_buffered: DEFAULT_MAX_BUFFERED,
            read_chunk_size: 256,
        }
    }
}
