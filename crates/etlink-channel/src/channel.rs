use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use etlink_frame::{build_frame, AssemblerStats, FrameConfig, RecordAssembler};
use etlink_schema::{encode, Record, RecordSchema};
use etlink_transport::TransportError;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::{ChannelConfig, ChannelMode};
use crate::error::{ChannelError, Result};
use crate::recording::{lock_recording, RecordingBuffer, SharedRecording};

/// Received and sent records are logged once per this many.
const LOG_EVERY: u64 = 100;

type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Snapshot of a channel's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelStats {
    /// Frame assembly counters from the listen loop.
    pub assembler: AssemblerStats,
    /// Records decoded and queued.
    pub records_received: u64,
    /// Records written by `send`.
    pub records_sent: u64,
    /// Records appended to the recording buffer.
    pub records_recorded: u64,
}

/// State shared between the channel handle and its listen loop.
struct Shared {
    name: String,
    recording: Option<SharedRecording>,
    recording_enabled: AtomicBool,
    stats: Mutex<ChannelStats>,
}

impl Shared {
    fn stats(&self) -> std::sync::MutexGuard<'_, ChannelStats> {
        self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Handle one decoded record: record it if enabled, then queue it.
    fn on_frame_assembled(&self, record: Record, arrivals: &mpsc::UnboundedSender<Record>) {
        if self.recording_enabled.load(Ordering::Acquire) {
            if let Some(recording) = &self.recording {
                let mut buffer = lock_recording(recording);
                match buffer.append(&record) {
                    Ok(()) => {
                        self.stats().records_recorded += 1;
                        if buffer.len() as u64 % LOG_EVERY == 0 {
                            debug!(channel = %self.name, recorded = buffer.len(), "recording");
                        }
                    }
                    Err(err) => {
                        self.recording_enabled.store(false, Ordering::Release);
                        error!(channel = %self.name, error = %err, "recording stopped");
                    }
                }
            }
        }

        let received = {
            let mut stats = self.stats();
            stats.records_received += 1;
            stats.records_received
        };
        if received % LOG_EVERY == 0 {
            debug!(channel = %self.name, received, "records received");
        }

        // The receiver lives as long as the channel handle.
        let _ = arrivals.send(record);
    }
}

/// A schema-bound session over one serial link.
///
/// Reading channels run a listen task that assembles frames, decodes them with
/// the read schema, optionally records them, and queues them for [`recv`].
/// Writing channels encode records with the write schema in [`send`].
///
/// [`recv`]: Channel::recv
/// [`send`]: Channel::send
pub struct Channel {
    mode: ChannelMode,
    read_schema: Option<Arc<RecordSchema>>,
    write_schema: Option<Arc<RecordSchema>>,
    shared: Arc<Shared>,
    writer: tokio::sync::Mutex<Option<BoxedWriter>>,
    arrivals: tokio::sync::Mutex<mpsc::UnboundedReceiver<Record>>,
    cancel: CancellationToken,
    listener: Mutex<Option<JoinHandle<Result<()>>>>,
}

impl Channel {
    /// Bind `config` to transport halves and start listening if the mode reads.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<R, W>(reader: R, writer: W, config: ChannelConfig) -> Result<Self>
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        config.validate()?;

        let recording = match (config.recording_capacity, &config.read_schema) {
            (Some(capacity), Some(schema)) => {
                Some(RecordingBuffer::shared(Arc::clone(schema), capacity))
            }
            _ => None,
        };
        let shared = Arc::new(Shared {
            name: config.name.clone(),
            recording,
            recording_enabled: AtomicBool::new(false),
            stats: Mutex::new(ChannelStats::default()),
        });

        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let listener = match (&config.read_schema, config.mode.reads()) {
            (Some(schema), true) => {
                let assembler = RecordAssembler::with_config(Arc::clone(schema), &config.frame);
                Some(tokio::spawn(listen(
                    reader,
                    assembler,
                    config.frame.clone(),
                    Arc::clone(&shared),
                    tx,
                    cancel.clone(),
                )))
            }
            _ => {
                drop(tx);
                None
            }
        };

        info!(channel = %config.name, mode = %config.mode, "channel opened");

        let writer: Option<BoxedWriter> = if config.mode.writes() {
            Some(Box::new(writer))
        } else {
            None
        };

        Ok(Self {
            mode: config.mode,
            read_schema: config.read_schema,
            write_schema: config.write_schema,
            shared,
            writer: tokio::sync::Mutex::new(writer),
            arrivals: tokio::sync::Mutex::new(rx),
            cancel,
            listener: Mutex::new(listener),
        })
    }

    /// Split a single duplex stream and bind it.
    pub fn open<S>(stream: S, config: ChannelConfig) -> Result<Self>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (reader, writer) = tokio::io::split(stream);
        Self::spawn(reader, writer, config)
    }

    /// Open a serial device or socket by path and bind it.
    pub async fn connect(path: impl AsRef<Path>, config: ChannelConfig) -> Result<Self> {
        let (reader, writer) = etlink_transport::open_split(path).await?;
        Self::spawn(reader, writer, config)
    }

    /// Encode `record` with the write schema and write it as one frame.
    ///
    /// The record's schema must equal the write schema field for field.
    /// Nothing is written when it does not. A write still pending when
    /// [`close`](Channel::close) is called is abandoned with `Closed`.
    pub async fn send(&self, record: &Record) -> Result<()> {
        let schema = match (&self.write_schema, self.mode.writes()) {
            (Some(schema), true) => schema,
            _ => return Err(ChannelError::NotWritable(self.shared.name.clone())),
        };
        if !Arc::ptr_eq(record.schema(), schema) && **record.schema() != **schema {
            return Err(ChannelError::SchemaMismatch {
                expected: schema.name().to_string(),
                actual: record.schema().name().to_string(),
            });
        }

        let payload = encode(schema, record)?;
        let frame = build_frame(&payload)?;

        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or(ChannelError::Closed)?;
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(ChannelError::Closed),
            written = async {
                writer.write_all(&frame).await?;
                writer.flush().await
            } => written.map_err(TransportError::Io)?,
        }
        drop(guard);

        let sent = {
            let mut stats = self.shared.stats();
            stats.records_sent += 1;
            stats.records_sent
        };
        if sent % LOG_EVERY == 0 {
            debug!(channel = %self.shared.name, sent, "records sent");
        }
        Ok(())
    }

    /// Next received record in arrival order.
    ///
    /// Returns `None` once the listen loop has ended and every queued record
    /// was taken. Any number of tasks may wait here concurrently.
    pub async fn recv(&self) -> Option<Record> {
        self.arrivals.lock().await.recv().await
    }

    /// Take a queued record without waiting.
    ///
    /// Returns `None` while another task is parked in [`recv`](Channel::recv):
    /// that task holds the queue and receives the next record itself.
    pub fn try_recv(&self) -> Option<Record> {
        self.arrivals.try_lock().ok()?.try_recv().ok()
    }

    /// Append incoming records to the recording buffer.
    pub fn start_recording(&self) -> Result<()> {
        if self.shared.recording.is_none() {
            return Err(ChannelError::NoRecording(self.shared.name.clone()));
        }
        self.shared.recording_enabled.store(true, Ordering::Release);
        info!(channel = %self.shared.name, "recording started");
        Ok(())
    }

    pub fn stop_recording(&self) {
        if self.shared.recording_enabled.swap(false, Ordering::AcqRel) {
            info!(channel = %self.shared.name, "recording stopped");
        }
    }

    pub fn is_recording(&self) -> bool {
        self.shared.recording_enabled.load(Ordering::Acquire)
    }

    /// Handle to the recording buffer, if one was configured.
    pub fn recording(&self) -> Option<SharedRecording> {
        self.shared.recording.clone()
    }

    pub fn stats(&self) -> ChannelStats {
        *self.shared.stats()
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn mode(&self) -> ChannelMode {
        self.mode
    }

    pub fn read_schema(&self) -> Option<&Arc<RecordSchema>> {
        self.read_schema.as_ref()
    }

    pub fn write_schema(&self) -> Option<&Arc<RecordSchema>> {
        self.write_schema.as_ref()
    }

    /// True once the listen loop has ended (or never ran).
    pub fn is_finished(&self) -> bool {
        self.listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_none_or(JoinHandle::is_finished)
    }

    /// Stop the listen loop, wait for it, and shut the writer down.
    ///
    /// Returns the error that ended the listen loop, if any. Queued records
    /// remain available to [`recv`](Channel::recv). Calling `close` again is a
    /// no-op.
    pub async fn close(&self) -> Result<()> {
        self.cancel.cancel();

        let handle = self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let listen_result = match handle {
            Some(handle) => match handle.await {
                Ok(result) => result,
                Err(err) => Err(ChannelError::Task(err.to_string())),
            },
            None => Ok(()),
        };

        let writer = self.writer.lock().await.take();
        if let Some(mut writer) = writer {
            if let Err(err) = writer.shutdown().await {
                debug!(channel = %self.shared.name, error = %err, "writer shutdown failed");
            }
        }

        info!(channel = %self.shared.name, "channel closed");
        listen_result
    }
}

impl Drop for Channel {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("name", &self.shared.name)
            .field("mode", &self.mode)
            .field("recording", &self.is_recording())
            .finish()
    }
}

/// Read chunks until cancelled, EOF, or a read error; handle every assembled
/// frame inline.
async fn listen<R>(
    mut reader: R,
    mut assembler: RecordAssembler,
    config: FrameConfig,
    shared: Arc<Shared>,
    arrivals: mpsc::UnboundedSender<Record>,
    cancel: CancellationToken,
) -> Result<()>
where
    R: AsyncRead + Send + Unpin,
{
    let mut chunk = vec![0u8; config.read_chunk_size.max(1)];
    debug!(channel = %shared.name, schema = assembler.schema().name(), "listen loop started");

    loop {
        let read = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(channel = %shared.name, "listen loop cancelled");
                return Ok(());
            }
            read = reader.read(&mut chunk) => read,
        };

        let n = match read {
            Ok(0) => {
                info!(channel = %shared.name, "link closed by peer");
                return Ok(());
            }
            Ok(n) => n,
            Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(err) => {
                warn!(channel = %shared.name, error = %err, "link read failed");
                return Err(TransportError::Io(err).into());
            }
        };

        for item in assembler.feed(&chunk[..n]) {
            match item {
                Ok(record) => shared.on_frame_assembled(record, &arrivals),
                // Rejected frames are logged and counted by the assembler.
                Err(err) if err.is_recoverable() => {}
                Err(err) => return Err(err.into()),
            }
        }
        shared.stats().assembler = assembler.stats();
    }
}
