//! Schema-driven binary record exchange with microcontrollers over serial links.
//!
//! etlink speaks the sync-byte framed protocol used by EasyTransfer-style
//! firmware: fixed-layout records, packed in a declared byte order, wrapped in
//! `0x06 0x85 <len> <payload> <xor checksum>` frames.
//!
//! # Crate Structure
//!
//! - [`schema`]: record schemas, typed values, and the payload codec
//! - [`transport`]: serial device and Unix socket links
//! - [`frame`]: frame building, stream resynchronization, blocking reader/writer
//! - [`channel`]: async schema-bound sessions with recording (behind `channel` feature)

/// Re-export schema types.
pub mod schema {
    pub use etlink_schema::*;
}

/// Re-export transport types.
pub mod transport {
    pub use etlink_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use etlink_frame::*;
}

/// Re-export channel types (requires `channel` feature).
#[cfg(feature = "channel")]
pub mod channel {
    pub use etlink_channel::*;
}
