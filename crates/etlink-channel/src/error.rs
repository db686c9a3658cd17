use etlink_frame::FrameError;
use etlink_schema::SchemaError;
use etlink_transport::TransportError;

use crate::config::ChannelMode;

/// Errors that can occur in channel operations.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// Record encoding or schema error.
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Recording buffer error.
    #[error("recording error: {0}")]
    Recording(#[from] RecordingError),

    /// The channel mode requires a schema that was not configured.
    #[error("channel '{channel}' in {mode} mode needs a {direction} schema")]
    MissingSchema {
        channel: String,
        mode: ChannelMode,
        direction: &'static str,
    },

    /// `send` on a channel that does not write.
    #[error("channel '{0}' is not writable")]
    NotWritable(String),

    /// The record was built from a different schema than the channel writes.
    #[error("record schema '{actual}' does not match write schema '{expected}'")]
    SchemaMismatch { expected: String, actual: String },

    /// The channel has no recording buffer configured.
    #[error("channel '{0}' has no recording buffer")]
    NoRecording(String),

    /// The channel was closed.
    #[error("channel closed")]
    Closed,

    /// The listen task panicked or was aborted.
    #[error("listen task failed: {0}")]
    Task(String),
}

/// Errors from the recording buffer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordingError {
    /// The buffer is full or frozen; nothing was written.
    #[error("recording buffer full ({capacity} records)")]
    CapacityExceeded { capacity: usize },

    /// No record has been written yet.
    #[error("recording buffer is empty")]
    Empty,

    /// The requested range is not within the written records.
    #[error("range {start}..{end} out of bounds for {len} recorded records")]
    OutOfRange { start: usize, end: usize, len: usize },

    /// The record does not belong to the buffer's schema.
    #[error("record schema '{actual}' does not match recording schema '{expected}'")]
    SchemaMismatch { expected: String, actual: String },
}

pub type Result<T> = std::result::Result<T, ChannelError>;
