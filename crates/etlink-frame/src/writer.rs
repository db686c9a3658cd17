use std::io::{ErrorKind, Write};
use std::path::Path;

use bytes::BytesMut;
use etlink_schema::{encode, Record};
use etlink_transport::LinkStream;

use crate::codec::{encode_frame, MAX_FRAME_SIZE};
use crate::error::{FrameError, Result};
use crate::reader::transport_to_frame_error;

/// Writes complete frames to any `Write` stream.
pub struct FrameWriter<T> {
    inner: T,
    buf: BytesMut,
}

impl<T: Write> FrameWriter<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(MAX_FRAME_SIZE),
        }
    }

    /// Frame and send a raw payload (blocking). Flushes before returning.
    pub fn send_payload(&mut self, payload: &[u8]) -> Result<()> {
        self.buf.clear();
        encode_frame(payload, &mut self.buf)?;

        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }

        self.flush()
    }

    /// Encode `record` with its own schema and send it.
    ///
    /// Nothing is written if encoding fails.
    pub fn send_record(&mut self, record: &Record) -> Result<()> {
        let payload = encode(record.schema(), record)?;
        self.send_payload(&payload)
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl FrameWriter<LinkStream> {
    /// Open a link by path and write frames to it.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let stream = LinkStream::open(path).map_err(transport_to_frame_error)?;
        Ok(Self::new(stream))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use etlink_schema::{FieldType, RecordSchema};

    use super::*;
    use crate::assembler::FrameAssembler;

    fn decode_all(wire: &[u8]) -> Vec<Vec<u8>> {
        FrameAssembler::new()
            .feed(wire)
            .into_iter()
            .map(|item| item.unwrap().to_vec())
            .collect()
    }

    #[test]
    fn write_single_frame() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));
        writer.send_payload(b"hello").unwrap();

        let wire = writer.into_inner().into_inner();
        assert_eq!(&wire[..3], &[0x06, 0x85, 0x05]);
        assert_eq!(decode_all(&wire), vec![b"hello".to_vec()]);
    }

    #[test]
    fn write_multiple_frames() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));
        writer.send_payload(b"one").unwrap();
        writer.send_payload(b"two").unwrap();
        writer.send_payload(b"three").unwrap();

        let wire = writer.into_inner().into_inner();
        assert_eq!(
            decode_all(&wire),
            vec![b"one".to_vec(), b"two".to_vec(), b"three".to_vec()]
        );
    }

    #[test]
    fn payload_too_large_rejected() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));
        let err = writer.send_payload(&[0u8; 256]).unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { .. }));
        assert!(writer.into_inner().into_inner().is_empty());
    }

    #[test]
    fn send_record_encodes_with_record_schema() {
        let schema = RecordSchema::builder("cmd")
            .field("speed", FieldType::I16)
            .field("enable", FieldType::Bool)
            .build_shared()
            .unwrap();
        let record = etlink_schema::Record::new(schema)
            .with("speed", -2i16)
            .unwrap()
            .with("enable", true)
            .unwrap();

        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));
        writer.send_record(&record).unwrap();

        let wire = writer.into_inner().into_inner();
        assert_eq!(decode_all(&wire), vec![vec![0xFE, 0xFF, 0x01]]);
    }

    #[test]
    fn flush_propagates() {
        let sink = FlushTrackingWriter::default();
        let flag = Arc::clone(&sink.flushed);
        let mut writer = FrameWriter::new(sink);

        writer.send_payload(b"x").unwrap();

        assert!(flag.load(Ordering::SeqCst));
    }

    #[test]
    fn accessors_and_into_inner() {
        let cursor = Cursor::new(Vec::<u8>::new());
        let mut writer = FrameWriter::new(cursor);

        let _ = writer.get_ref();
        let _ = writer.get_mut();
        let _inner = writer.into_inner();
    }

    #[test]
    fn handles_interrupted_write_and_flush() {
        let writer_impl = InterruptedWriteThenFlush {
            wrote_once: false,
            flush_interrupted: false,
            data: Vec::new(),
        };

        let mut writer = FrameWriter::new(writer_impl);
        writer.send_payload(b"retry").unwrap();

        let inner = writer.into_inner();
        assert_eq!(decode_all(&inner.data), vec![b"retry".to_vec()]);
    }

    #[test]
    fn handles_would_block_write_and_flush() {
        let writer_impl = WouldBlockWriteThenFlush {
            wrote_once: false,
            flush_would_block: false,
            data: Vec::new(),
        };

        let mut writer = FrameWriter::new(writer_impl);
        writer.send_payload(b"retry").unwrap();

        let inner = writer.into_inner();
        assert!(!inner.data.is_empty());
    }

    #[test]
    fn connection_closed_when_write_returns_zero() {
        let mut writer = FrameWriter::new(ZeroWriter);
        let err = writer.send_payload(b"x").unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[derive(Default)]
    struct FlushTrackingWriter {
        flushed: Arc<AtomicBool>,
        data: Vec<u8>,
    }

    impl Write for FlushTrackingWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            self.flushed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    struct InterruptedWriteThenFlush {
        wrote_once: bool,
        flush_interrupted: bool,
        data: Vec<u8>,
    }

    impl Write for InterruptedWriteThenFlush {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if !self.wrote_once {
                self.wrote_once = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            if !self.flush_interrupted {
                self.flush_interrupted = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            Ok(())
        }
    }

    struct WouldBlockWriteThenFlush {
        wrote_once: bool,
        flush_would_block: bool,
        data: Vec<u8>,
    }

    impl Write for WouldBlockWriteThenFlush {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if !self.wrote_once {
                self.wrote_once = true;
                return Err(std::io::Error::from(ErrorKind::WouldBlock));
            }
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            if !self.flush_would_block {
                self.flush_would_block = true;
                return Err(std::io::Error::from(ErrorKind::WouldBlock));
            }
            Ok(())
        }
    }

    struct ZeroWriter;

    impl Write for ZeroWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Ok(0)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn written_bytes_read_back() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));
        writer.send_payload(b"z").unwrap();

        let wire = writer.into_inner().into_inner();
        let mut framed = crate::reader::FrameReader::new(Cursor::new(wire));
        assert_eq!(framed.read_payload().unwrap().as_ref(), b"z");
    }
}
