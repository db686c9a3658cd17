use std::io::{ErrorKind, Read};
use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use etlink_schema::{decode, Record, RecordSchema};
use etlink_transport::{LinkStream, TransportError};

use crate::assembler::{AssemblerStats, FrameAssembler};
use crate::codec::FrameConfig;
use crate::error::{FrameError, Result};

/// Reads complete frames from any `Read` stream.
///
/// Handles partial reads and resynchronization internally. Non-fatal problems
/// (checksum mismatch, undecodable payload, overflow) are returned as errors
/// for which [`FrameError::is_recoverable`] is true; the next call continues
/// with the following frame.
pub struct FrameReader<T> {
    inner: T,
    assembler: FrameAssembler,
    config: FrameConfig,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            assembler: FrameAssembler::with_config(&config),
            config,
        }
    }

    /// Read the next verified payload (blocking).
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` when EOF is reached; a
    /// trailing partial frame is discarded.
    pub fn read_payload(&mut self) -> Result<Bytes> {
        let mut chunk = vec![0u8; self.config.read_chunk_size.max(1)];
        loop {
            if let Some(item) = self.assembler.next_event() {
                return item;
            }

            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                self.assembler.clear();
                return Err(FrameError::ConnectionClosed);
            }

            self.assembler.buffer_mut().extend_from_slice(&chunk[..read]);
        }
    }

    /// Read the next frame and decode it with `schema` (blocking).
    pub fn read_record(&mut self, schema: &Arc<RecordSchema>) -> Result<Record> {
        let payload = self.read_payload()?;
        decode(schema, &payload).map_err(|err| self.assembler.reject_payload(err))
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Assembly counters so far.
    pub fn stats(&self) -> AssemblerStats {
        self.assembler.stats()
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl FrameReader<LinkStream> {
    /// Open a link by path and read frames from it.
    pub fn open(path: impl AsRef<Path>, config: FrameConfig) -> Result<Self> {
        let stream = LinkStream::open(path).map_err(transport_to_frame_error)?;
        Ok(Self::with_config(stream, config))
    }
}

pub(crate) fn transport_to_frame_error(err: TransportError) -> FrameError {
    match err {
        TransportError::Io(io) | TransportError::Open { source: io, .. } => FrameError::Io(io),
        TransportError::Closed => FrameError::ConnectionClosed,
    }
}
