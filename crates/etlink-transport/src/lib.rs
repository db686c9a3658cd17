//! Serial link transport.
//!
//! Opens the byte stream a microcontroller talks on:
//! - a device node (`/dev/ttyACM0`, `/dev/ttyUSB0`, a pty)
//! - a Unix socket bridged to a port (e.g. by `socat`)
//!
//! This is the lowest layer of etlink. Port line settings (baud rate,
//! parity) are configured outside this crate.

pub mod error;
pub mod stream;

#[cfg(feature = "async")]
pub mod async_link;

pub use error::{Result, TransportError};
pub use stream::LinkStream;

#[cfg(feature = "async")]
pub use async_link::{open_split, LinkReader, LinkWriter};
