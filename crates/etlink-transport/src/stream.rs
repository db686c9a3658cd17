use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Result, TransportError};

/// A connected serial link, readable and writable.
///
/// On Unix the path may name a device node (`/dev/ttyACM0`, a pty from
/// `socat`) or a Unix socket bridged to the port. Line settings such as
/// baud rate are left to whoever configured the port.
pub struct LinkStream {
    inner: LinkStreamInner,
    path: PathBuf,
}

enum LinkStreamInner {
    Device(File),
    #[cfg(unix)]
    Socket(std::os::unix::net::UnixStream),
}

impl LinkStream {
    /// Open a device node or connect to a socket at `path` (blocking).
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        #[cfg(unix)]
        {
            use std::os::unix::fs::FileTypeExt;

            let metadata = std::fs::metadata(&path).map_err(|e| TransportError::Open {
                path: path.clone(),
                source: e,
            })?;
            if metadata.file_type().is_socket() {
                let stream = std::os::unix::net::UnixStream::connect(&path).map_err(|e| {
                    TransportError::Open {
                        path: path.clone(),
                        source: e,
                    }
                })?;
                debug!(?path, "connected to link socket");
                return Ok(Self {
                    inner: LinkStreamInner::Socket(stream),
                    path,
                });
            }
        }

        let file = open_device(&path)?;
        debug!(?path, "opened link device");
        Ok(Self {
            inner: LinkStreamInner::Device(file),
            path,
        })
    }

    /// Wrap a connected Unix socket (used for in-process bridges and tests).
    #[cfg(unix)]
    pub fn from_unix(stream: std::os::unix::net::UnixStream) -> Self {
        Self {
            inner: LinkStreamInner::Socket(stream),
            path: PathBuf::new(),
        }
    }

    /// Path this link was opened from (empty for wrapped sockets).
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Transport name for diagnostics.
    pub fn kind(&self) -> &'static str {
        match &self.inner {
            LinkStreamInner::Device(_) => "device",
            #[cfg(unix)]
            LinkStreamInner::Socket(_) => "unix-socket",
        }
    }

    /// Try to clone this stream (creates a new file descriptor).
    pub fn try_clone(&self) -> Result<Self> {
        let inner = match &self.inner {
            LinkStreamInner::Device(file) => LinkStreamInner::Device(file.try_clone()?),
            #[cfg(unix)]
            LinkStreamInner::Socket(stream) => LinkStreamInner::Socket(stream.try_clone()?),
        };
        Ok(Self {
            inner,
            path: self.path.clone(),
        })
    }
}

/// Open a device node read-write without making it the controlling terminal.
pub(crate) fn open_device(path: &Path) -> Result<File> {
    let mut options = OpenOptions::new();
    options.read(true).write(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.custom_flags(libc::O_NOCTTY);
    }

    options.open(path).map_err(|e| TransportError::Open {
        path: path.to_path_buf(),
        source: e,
    })
}

impl Read for LinkStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            LinkStreamInner::Device(file) => file.read(buf),
            #[cfg(unix)]
            LinkStreamInner::Socket(stream) => stream.read(buf),
        }
    }
}

impl Write for LinkStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            LinkStreamInner::Device(file) => file.write(buf),
            #[cfg(unix)]
            LinkStreamInner::Socket(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.inner {
            LinkStreamInner::Device(file) => file.flush(),
            #[cfg(unix)]
            LinkStreamInner::Socket(stream) => stream.flush(),
        }
    }
}

impl std::fmt::Debug for LinkStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkStream")
            .field("type", &self.kind())
            .field("path", &self.path)
            .finish()
    }
}
