//! Stream resynchronization and frame extraction.
//!
//! The assembler owns a receive buffer. Each `feed` appends the new bytes and
//! drains every complete frame currently buffered:
//!
//! 1. Search for the sync bytes. Anything in front of them is discarded.
//! 2. Wait for the length byte, then for `3 + len + 1` bytes. The window is
//!    never searched for another sync sequence.
//! 3. Verify the checksum. Either way the whole window is consumed.

use std::sync::Arc;

use bytes::{Buf, Bytes, BytesMut};
use etlink_schema::{decode, Record, RecordSchema, SchemaError};
use tracing::{debug, trace, warn};

use crate::codec::{checksum, FrameConfig, FRAME_OVERHEAD, HEADER_SIZE, SYNC};
use crate::error::{FrameError, Result};

/// Counters kept by an assembler across its lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssemblerStats {
    /// Frames whose checksum verified.
    pub frames: u64,
    /// Frames dropped for a checksum mismatch.
    pub checksum_errors: u64,
    /// Verified frames whose payload length did not match the schema.
    pub length_errors: u64,
    /// Bytes skipped while searching for sync or dropped on overflow.
    pub discarded_bytes: u64,
}

/// Extract the next event from `buf`, or `None` when more bytes are needed.
pub(crate) fn next_frame(
    buf: &mut BytesMut,
    cap: usize,
    stats: &mut AssemblerStats,
) -> Option<Result<Bytes>> {
    match buf.windows(SYNC.len()).position(|w| w == SYNC) {
        None => {
            if buf.len() <= cap {
                return None;
            }
            // A trailing first sync byte may still begin a frame.
            let keep = usize::from(buf.last() == Some(&SYNC[0]));
            let dropped = buf.len() - keep;
            buf.advance(dropped);
            stats.discarded_bytes += dropped as u64;
            warn!(dropped, "no sync in receive buffer, dropping oldest bytes");
            return Some(Err(FrameError::BufferOverflow { dropped }));
        }
        Some(0) => {}
        Some(skip) => {
            buf.advance(skip);
            stats.discarded_bytes += skip as u64;
            trace!(skip, "resynchronized");
        }
    }

    if buf.len() < HEADER_SIZE {
        return None;
    }
    let len = buf[2];
    let total = FRAME_OVERHEAD + usize::from(len);
    if buf.len() < total {
        return None;
    }

    let frame = buf.split_to(total).freeze();
    let payload = frame.slice(HEADER_SIZE..total - 1);
    let received = frame[total - 1];
    let expected = checksum(&payload);
    if expected != received {
        stats.checksum_errors += 1;
        return Some(Err(FrameError::ChecksumMismatch {
            expected,
            received,
            len,
        }));
    }

    stats.frames += 1;
    Some(Ok(payload))
}

/// Payload-level assembler.
///
/// Push bytes in any fragmentation; get back one item per complete frame in
/// arrival order. Errors in the output are non-fatal.
#[derive(Debug)]
pub struct FrameAssembler {
    buf: BytesMut,
    cap: usize,
    stats: AssemblerStats,
}

impl FrameAssembler {
    pub fn new() -> Self {
        Self::with_config(&FrameConfig::default())
    }

    pub fn with_config(config: &FrameConfig) -> Self {
        let cap = config.buffer_cap();
        Self {
            buf: BytesMut::with_capacity(cap),
            cap,
            stats: AssemblerStats::default(),
        }
    }

    /// Append `bytes` and drain every complete frame.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Result<Bytes>> {
        self.buf.extend_from_slice(bytes);
        let mut out = Vec::new();
        while let Some(item) = self.next_event() {
            out.push(item);
        }
        out
    }

    pub(crate) fn buffer_mut(&mut self) -> &mut BytesMut {
        &mut self.buf
    }

    pub(crate) fn next_event(&mut self) -> Option<Result<Bytes>> {
        let item = next_frame(&mut self.buf, self.cap, &mut self.stats)?;
        if let Err(err @ FrameError::ChecksumMismatch { .. }) = &item {
            warn!(error = %err, "dropping corrupted frame");
        }
        Some(item)
    }

    pub(crate) fn reject_payload(&mut self, err: SchemaError) -> FrameError {
        if matches!(err, SchemaError::LengthMismatch { .. }) {
            self.stats.length_errors += 1;
        }
        warn!(error = %err, "dropping frame with unexpected payload");
        FrameError::Record(err)
    }

    /// Bytes buffered but not yet part of a complete frame.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Drop everything buffered, e.g. after the link was reopened.
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    pub fn stats(&self) -> AssemblerStats {
        self.stats
    }
}

impl Default for FrameAssembler {
    fn default() -> Self {
        Self::new()
    }
}

/// Record-level assembler bound to one schema.
///
/// A verified payload whose length differs from the schema's record size is
/// reported as [`FrameError::Record`] and counted in `length_errors`.
#[derive(Debug)]
pub struct RecordAssembler {
    frames: FrameAssembler,
    schema: Arc<RecordSchema>,
}

impl RecordAssembler {
    pub fn new(schema: Arc<RecordSchema>) -> Self {
        Self::with_config(schema, &FrameConfig::default())
    }

    pub fn with_config(schema: Arc<RecordSchema>, config: &FrameConfig) -> Self {
        Self {
            frames: FrameAssembler::with_config(config),
            schema,
        }
    }

    /// Append `bytes` and decode every complete frame.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Result<Record>> {
        self.frames.buffer_mut().extend_from_slice(bytes);
        let mut out = Vec::new();
        while let Some(item) = self.next_event() {
            out.push(item);
        }
        out
    }

    pub(crate) fn next_event(&mut self) -> Option<Result<Record>> {
        let payload = match self.frames.next_event()? {
            Ok(payload) => payload,
            Err(err) => return Some(Err(err)),
        };
        match decode(&self.schema, &payload) {
            Ok(record) => {
                debug!(schema = self.schema.name(), len = payload.len(), "frame decoded");
                Some(Ok(record))
            }
            Err(err) => Some(Err(self.frames.reject_payload(err))),
        }
    }

    pub fn schema(&self) -> &Arc<RecordSchema> {
        &self.schema
    }

    pub fn buffered(&self) -> usize {
        self.frames.buffered()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }

    pub fn stats(&self) -> AssemblerStats {
        self.frames.stats()
    }
}

#[cfg(test)]
mod tests {
    use etlink_schema::{FieldType, FieldValue};

    use super::*;
    use crate::codec::build_frame;

    fn payloads(items: Vec<Result<Bytes>>) -> Vec<Vec<u8>> {
        items
            .into_iter()
            .map(|item| item.expect("frame").to_vec())
            .collect()
    }

    fn sensor_schema() -> Arc<RecordSchema> {
        RecordSchema::builder("sensor")
            .field("time_ms", FieldType::U32)
            .field("temp_c", FieldType::F32)
            .field("flag", FieldType::Bool)
            .build_shared()
            .unwrap()
    }

    #[test]
    fn single_frame_one_call() {
        let mut asm = FrameAssembler::new();
        let out = asm.feed(&build_frame(b"hello").unwrap());
        assert_eq!(payloads(out), vec![b"hello".to_vec()]);
        assert_eq!(asm.buffered(), 0);
        assert_eq!(asm.stats().frames, 1);
    }

    #[test]
    fn byte_at_a_time_matches_single_call() {
        let mut wire = Vec::new();
        wire.extend_from_slice(&build_frame(b"one").unwrap());
        wire.extend_from_slice(&[0xFF, 0x06, 0x00]);
        wire.extend_from_slice(&build_frame(b"two").unwrap());

        let mut whole = FrameAssembler::new();
        let expected = payloads(whole.feed(&wire));

        let mut split = FrameAssembler::new();
        let mut got = Vec::new();
        for byte in &wire {
            got.extend(payloads(split.feed(std::slice::from_ref(byte))));
        }

        assert_eq!(expected, vec![b"one".to_vec(), b"two".to_vec()]);
        assert_eq!(got, expected);
        assert_eq!(whole.stats(), split.stats());
    }

    #[test]
    fn burst_yields_every_frame_in_order() {
        let mut wire = Vec::new();
        for i in 0..10u8 {
            wire.extend_from_slice(&build_frame(&[i, i, i]).unwrap());
        }
        let mut asm = FrameAssembler::new();
        let out = payloads(asm.feed(&wire));
        assert_eq!(out.len(), 10);
        for (i, payload) in out.iter().enumerate() {
            assert_eq!(payload, &vec![i as u8; 3]);
        }
    }

    #[test]
    fn garbage_before_sync_discarded() {
        let mut wire = vec![0x00, 0x12, 0x85, 0x06];
        wire.extend_from_slice(&build_frame(b"ok").unwrap());
        let mut asm = FrameAssembler::new();
        assert_eq!(payloads(asm.feed(&wire)), vec![b"ok".to_vec()]);
        assert_eq!(asm.stats().discarded_bytes, 4);
    }

    #[test]
    fn corrupted_frame_skipped_and_next_accepted() {
        let mut bad = build_frame(b"abc").unwrap().to_vec();
        bad[4] ^= 0x40;
        let mut wire = bad;
        wire.extend_from_slice(&build_frame(b"xyz").unwrap());

        let mut asm = FrameAssembler::new();
        let out = asm.feed(&wire);
        assert_eq!(out.len(), 2);
        assert!(matches!(
            out[0],
            Err(FrameError::ChecksumMismatch { len: 3, .. })
        ));
        assert_eq!(out[1].as_ref().unwrap().as_ref(), b"xyz");
        assert_eq!(asm.stats().checksum_errors, 1);
        assert_eq!(asm.stats().frames, 1);
    }

    #[test]
    fn sync_inside_payload_is_not_a_frame_start() {
        let payload = [0x06, 0x85, 0x01, 0x02];
        let mut asm = FrameAssembler::new();
        let out = payloads(asm.feed(&build_frame(&payload).unwrap()));
        assert_eq!(out, vec![payload.to_vec()]);
        assert_eq!(asm.buffered(), 0);
    }

    #[test]
    fn partial_frame_waits() {
        let frame = build_frame(b"partial").unwrap();
        let mut asm = FrameAssembler::new();
        assert!(asm.feed(&frame[..2]).is_empty());
        assert!(asm.feed(&frame[2..5]).is_empty());
        assert_eq!(asm.buffered(), 5);
        let out = payloads(asm.feed(&frame[5..]));
        assert_eq!(out, vec![b"partial".to_vec()]);
    }

    #[test]
    fn garbage_without_sync_capped() {
        let cfg = FrameConfig {
            max_buffered: 300,
            ..FrameConfig::default()
        };
        let mut asm = FrameAssembler::with_config(&cfg);
        assert!(asm.feed(&[0x11; 300]).is_empty());

        let out = asm.feed(&[0x11; 10]);
        assert_eq!(out.len(), 1);
        assert!(matches!(out[0], Err(FrameError::BufferOverflow { dropped: 310 })));
        assert_eq!(asm.buffered(), 0);
        assert_eq!(asm.stats().discarded_bytes, 310);

        let out = payloads(asm.feed(&build_frame(b"after").unwrap()));
        assert_eq!(out, vec![b"after".to_vec()]);
    }

    #[test]
    fn overflow_keeps_trailing_sync_byte() {
        let cfg = FrameConfig {
            max_buffered: 0,
            ..FrameConfig::default()
        };
        let mut asm = FrameAssembler::with_config(&cfg);
        let mut garbage = vec![0x22; 400];
        garbage.push(0x06);
        let out = asm.feed(&garbage);
        assert!(matches!(out[0], Err(FrameError::BufferOverflow { dropped: 400 })));
        assert_eq!(asm.buffered(), 1);

        let frame = build_frame(b"k").unwrap();
        let out = payloads(asm.feed(&frame[1..]));
        assert_eq!(out, vec![b"k".to_vec()]);
    }

    #[test]
    fn record_assembler_decodes_concrete_example() {
        let schema = sensor_schema();
        let mut wire = vec![0x06, 0x85, 0x09];
        let mut payload = Vec::new();
        payload.extend_from_slice(&1000u32.to_le_bytes());
        payload.extend_from_slice(&23.5f32.to_le_bytes());
        payload.push(0x01);
        wire.extend_from_slice(&payload);
        wire.push(checksum(&payload));

        let mut asm = RecordAssembler::new(Arc::clone(&schema));
        let out = asm.feed(&wire);
        assert_eq!(out.len(), 1);
        let record = out.into_iter().next().unwrap().unwrap();
        assert_eq!(record.get("time_ms"), Some(FieldValue::U32(1000)));
        assert_eq!(record.get("temp_c"), Some(FieldValue::F32(23.5)));
        assert_eq!(record.get("flag"), Some(FieldValue::Bool(true)));
    }

    #[test]
    fn record_assembler_rejects_wrong_length() {
        let schema = sensor_schema();
        let mut wire = build_frame(&[0u8; 4]).unwrap().to_vec();
        wire.extend_from_slice(&build_frame(&[0u8; 9]).unwrap());

        let mut asm = RecordAssembler::new(schema);
        let out = asm.feed(&wire);
        assert_eq!(out.len(), 2);
        assert!(matches!(
            out[0],
            Err(FrameError::Record(SchemaError::LengthMismatch { actual: 4, .. }))
        ));
        assert!(out[1].is_ok());
        assert_eq!(asm.stats().length_errors, 1);
        assert_eq!(asm.stats().frames, 2);
    }

    #[test]
    fn clear_drops_partial_frame() {
        let frame = build_frame(b"abc").unwrap();
        let mut asm = FrameAssembler::new();
        asm.feed(&frame[..4]);
        asm.clear();
        assert_eq!(asm.buffered(), 0);
        assert!(asm.feed(&frame[4..]).is_empty());
    }
}
