use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use etlink_frame::FrameConfig;
use etlink_schema::RecordSchema;
use serde::{Deserialize, Serialize};

use crate::error::{ChannelError, Result};

/// Which directions a channel carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChannelMode {
    #[serde(alias = "input")]
    ReadOnly,
    #[serde(alias = "output")]
    WriteOnly,
    #[default]
    Both,
}

impl ChannelMode {
    pub fn reads(self) -> bool {
        matches!(self, ChannelMode::ReadOnly | ChannelMode::Both)
    }

    pub fn writes(self) -> bool {
        matches!(self, ChannelMode::WriteOnly | ChannelMode::Both)
    }

    pub fn name(self) -> &'static str {
        match self {
            ChannelMode::ReadOnly => "read-only",
            ChannelMode::WriteOnly => "write-only",
            ChannelMode::Both => "both",
        }
    }
}

impl fmt::Display for ChannelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ChannelMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "read-only" | "read" | "input" => Ok(ChannelMode::ReadOnly),
            "write-only" | "write" | "output" => Ok(ChannelMode::WriteOnly),
            "both" => Ok(ChannelMode::Both),
            other => Err(format!(
                "unknown channel mode '{other}' (expected read-only, write-only or both)"
            )),
        }
    }
}

/// Channel configuration.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Name used in logs and errors.
    pub name: String,
    pub mode: ChannelMode,
    /// Schema for incoming records. Required when the mode reads.
    pub read_schema: Option<Arc<RecordSchema>>,
    /// Schema for outgoing records. Required when the mode writes.
    pub write_schema: Option<Arc<RecordSchema>>,
    /// Allocate a recording buffer of this many records.
    pub recording_capacity: Option<usize>,
    /// Assembly limits and read chunk size for the listen loop.
    pub frame: FrameConfig,
}

impl ChannelConfig {
    pub fn new(name: impl Into<String>, mode: ChannelMode) -> Self {
        Self {
            name: name.into(),
            mode,
            ..Self::default()
        }
    }

    pub fn with_read_schema(mut self, schema: Arc<RecordSchema>) -> Self {
        self.read_schema = Some(schema);
        self
    }

    pub fn with_write_schema(mut self, schema: Arc<RecordSchema>) -> Self {
        self.write_schema = Some(schema);
        self
    }

    pub fn with_recording_capacity(mut self, capacity: usize) -> Self {
        self.recording_capacity = Some(capacity);
        self
    }

    pub fn with_frame_config(mut self, frame: FrameConfig) -> Self {
        self.frame = frame;
        self
    }

    /// Check that every schema the mode needs is present.
    ///
    /// A recording buffer records incoming records, so it needs a read schema too.
    pub fn validate(&self) -> Result<()> {
        let reads = self.mode.reads() || self.recording_capacity.is_some();
        if reads && self.read_schema.is_none() {
            return Err(self.missing("read"));
        }
        if self.mode.writes() && self.write_schema.is_none() {
            return Err(self.missing("write"));
        }
        Ok(())
    }

    fn missing(&self, direction: &'static str) -> ChannelError {
        ChannelError::MissingSchema {
            channel: self.name.clone(),
            mode: self.mode,
            direction,
        }
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            name: "etlink".to_string(),
            mode: ChannelMode::Both,
            read_schema: None,
            write_schema: None,
            recording_capacity: None,
            frame: FrameConfig::default(),
        }
    }
}
