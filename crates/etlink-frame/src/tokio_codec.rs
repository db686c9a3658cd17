//! `tokio_util` codec adapter.
//!
//! Items are [`Assembled`] values rather than codec errors so a corrupted frame
//! does not end a `FramedRead` stream. Only I/O errors are returned as `Err`.

use bytes::{Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::assembler::{next_frame, AssemblerStats};
use crate::codec::{encode_frame, FrameConfig};
use crate::error::FrameError;

/// One decoder event: a verified payload or a non-fatal frame error.
pub type Assembled = std::result::Result<Bytes, FrameError>;

/// Frame codec for `FramedRead`/`FramedWrite`.
#[derive(Debug, Clone)]
pub struct FrameCodec {
    cap: usize,
    stats: AssemblerStats,
}

impl FrameCodec {
    pub fn new() -> Self {
        Self::with_config(&FrameConfig::default())
    }

    pub fn with_config(config: &FrameConfig) -> Self {
        Self {
            cap: config.buffer_cap(),
            stats: AssemblerStats::default(),
        }
    }

    pub fn stats(&self) -> AssemblerStats {
        self.stats
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for FrameCodec {
    type Item = Assembled;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        Ok(next_frame(src, self.cap, &mut self.stats))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(item) => Ok(Some(item)),
            None => {
                if !src.is_empty() {
                    tracing::debug!(remaining = src.len(), "discarding partial frame at EOF");
                    src.clear();
                }
                Ok(None)
            }
        }
    }
}

impl Encoder<Bytes> for FrameCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<(), Self::Error> {
        encode_frame(&item, dst)
    }
}

impl Encoder<&[u8]> for FrameCodec {
    type Error = FrameError;

    fn encode(&mut self, item: &[u8], dst: &mut BytesMut) -> Result<(), Self::Error> {
        encode_frame(item, dst)
    }
}
