//! Tokio halves of a serial link.
//!
//! Device nodes are opened as two independent file handles: tokio's `File`
//! serializes operations on one handle, so a pending read would otherwise
//! hold back every write.

use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tracing::debug;

use crate::error::{Result, TransportError};
use crate::stream::open_device;

/// Read half of an async link.
pub struct LinkReader {
    inner: ReaderInner,
}

enum ReaderInner {
    Device(tokio::fs::File),
    #[cfg(unix)]
    Socket(tokio::net::unix::OwnedReadHalf),
}

/// Write half of an async link.
pub struct LinkWriter {
    inner: WriterInner,
}

enum WriterInner {
    Device(tokio::fs::File),
    #[cfg(unix)]
    Socket(tokio::net::unix::OwnedWriteHalf),
}

/// Open `path` and split it into independent read and write halves.
pub async fn open_split(path: impl AsRef<Path>) -> Result<(LinkReader, LinkWriter)> {
    let path = path.as_ref().to_path_buf();

    #[cfg(unix)]
    {
        use std::os::unix::fs::FileTypeExt;

        let metadata = tokio::fs::metadata(&path)
            .await
            .map_err(|e| TransportError::Open {
                path: path.clone(),
                source: e,
            })?;
        if metadata.file_type().is_socket() {
            let stream = tokio::net::UnixStream::connect(&path)
                .await
                .map_err(|e| TransportError::Open {
                    path: path.clone(),
                    source: e,
                })?;
            debug!(?path, "connected to link socket");
            return Ok(split_unix(stream));
        }
    }

    let (read_file, write_file) = open_device_pair(path.clone()).await?;
    debug!(?path, "opened link device");
    Ok((
        LinkReader {
            inner: ReaderInner::Device(tokio::fs::File::from_std(read_file)),
        },
        LinkWriter {
            inner: WriterInner::Device(tokio::fs::File::from_std(write_file)),
        },
    ))
}

/// Split a connected tokio Unix socket.
#[cfg(unix)]
pub fn split_unix(stream: tokio::net::UnixStream) -> (LinkReader, LinkWriter) {
    let (read, write) = stream.into_split();
    (
        LinkReader {
            inner: ReaderInner::Socket(read),
        },
        LinkWriter {
            inner: WriterInner::Socket(write),
        },
    )
}

async fn open_device_pair(path: PathBuf) -> Result<(std::fs::File, std::fs::File)> {
    // Opening a tty can block until the line is ready.
    tokio::task::spawn_blocking(move || -> Result<(std::fs::File, std::fs::File)> {
        let read_file = open_device(&path)?;
        let write_file = read_file.try_clone()?;
        Ok((read_file, write_file))
    })
    .await
    .map_err(|err| TransportError::Io(io::Error::other(err)))?
}

impl AsyncRead for LinkReader {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match &mut self.get_mut().inner {
            ReaderInner::Device(file) => Pin::new(file).poll_read(cx, buf),
            #[cfg(unix)]
            ReaderInner::Socket(half) => Pin::new(half).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for LinkWriter {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match &mut self.get_mut().inner {
            WriterInner::Device(file) => Pin::new(file).poll_write(cx, buf),
            #[cfg(unix)]
            WriterInner::Socket(half) => Pin::new(half).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match &mut self.get_mut().inner {
            WriterInner::Device(file) => Pin::new(file).poll_flush(cx),
            #[cfg(unix)]
            WriterInner::Socket(half) => Pin::new(half).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match &mut self.get_mut().inner {
            WriterInner::Device(file) => Pin::new(file).poll_shutdown(cx),
            #[cfg(unix)]
            WriterInner::Socket(half) => Pin::new(half).poll_shutdown(cx),
        }
    }
}

impl std::fmt::Debug for LinkReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match &self.inner {
            ReaderInner::Device(_) => "device",
            #[cfg(unix)]
            ReaderInner::Socket(_) => "unix-socket",
        };
        f.debug_struct("LinkReader").field("type", &kind).finish()
    }
}

impl std::fmt::Debug for LinkWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match &self.inner {
            WriterInner::Device(_) => "device",
            #[cfg(unix)]
            WriterInner::Socket(_) => "unix-socket",
        };
        f.debug_struct("LinkWriter").field("type", &kind).finish()
    }
}
