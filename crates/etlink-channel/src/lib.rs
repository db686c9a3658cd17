//! Schema-bound channels over a serial link.
//!
//! A [`Channel`] owns one link: it decodes incoming frames with its read
//! schema, queues them in arrival order, optionally keeps a columnar
//! [`RecordingBuffer`] of them, and sends records encoded with its write schema.

pub mod channel;
pub mod config;
pub mod error;
pub mod recording;

pub use channel::{Channel, ChannelStats};
pub use config::{ChannelConfig, ChannelMode};
pub use error::{ChannelError, RecordingError, Result};
pub use recording::{lock_recording, Column, RecordingBuffer, SharedRecording};
