use etlink_schema::SchemaError;

/// Errors that can occur during frame building, assembly, and I/O.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The payload does not fit the one-byte length field.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The trailing checksum does not match the frame contents.
    #[error("checksum mismatch on {len}-byte frame (expected {expected:#04x}, received {received:#04x})")]
    ChecksumMismatch { expected: u8, received: u8, len: u8 },

    /// A valid frame carried a payload the bound schema cannot decode.
    #[error("record error: {0}")]
    Record(#[from] SchemaError),

    /// No sync sequence was found and the oldest bytes were dropped.
    #[error("receive buffer overflow, dropped {dropped} bytes")]
    BufferOverflow { dropped: usize },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The link was closed.
    #[error("connection closed")]
    ConnectionClosed,
}

impl FrameError {
    /// True for per-frame problems after which assembly simply continues.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            FrameError::ChecksumMismatch { .. }
                | FrameError::Record(_)
                | FrameError::BufferOverflow { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
