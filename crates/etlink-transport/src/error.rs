use std::path::PathBuf;

/// Errors that can occur on a serial link.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to open the device node or connect to the socket.
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    /// An I/O error occurred on the link.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The link has been closed.
    #[error("transport closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, TransportError>;
