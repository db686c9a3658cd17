//! Fixed-capacity columnar history of received records.
//!
//! One column per schema field, allocated up front. Appends move a single
//! cursor forward; nothing is ever overwritten. A full or frozen buffer
//! rejects appends without touching any column.

use std::ops::Range;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use etlink_schema::{FieldType, FieldValue, Record, RecordSchema};
use serde::Serialize;

use crate::error::RecordingError;

pub type Result<T> = std::result::Result<T, RecordingError>;

/// Recording buffer shared between a listen loop and its readers.
pub type SharedRecording = Arc<Mutex<RecordingBuffer>>;

/// Lock a shared recording, recovering the data if a holder panicked.
pub fn lock_recording(recording: &SharedRecording) -> MutexGuard<'_, RecordingBuffer> {
    recording.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Values of one field, in arrival order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Column {
    Bool(Vec<bool>),
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
    I8(Vec<i8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
    F32(Vec<f32>),
}

impl Column {
    fn with_capacity(field_type: FieldType, capacity: usize) -> Self {
        match field_type {
            FieldType::Bool => Column::Bool(Vec::with_capacity(capacity)),
            FieldType::U8 => Column::U8(Vec::with_capacity(capacity)),
            FieldType::U16 => Column::U16(Vec::with_capacity(capacity)),
            FieldType::U32 => Column::U32(Vec::with_capacity(capacity)),
            FieldType::I8 => Column::I8(Vec::with_capacity(capacity)),
            FieldType::I16 => Column::I16(Vec::with_capacity(capacity)),
            FieldType::I32 => Column::I32(Vec::with_capacity(capacity)),
            FieldType::F32 => Column::F32(Vec::with_capacity(capacity)),
        }
    }

    pub fn field_type(&self) -> FieldType {
        match self {
            Column::Bool(_) => FieldType::Bool,
            Column::U8(_) => FieldType::U8,
            Column::U16(_) => FieldType::U16,
            Column::U32(_) => FieldType::U32,
            Column::I8(_) => FieldType::I8,
            Column::I16(_) => FieldType::I16,
            Column::I32(_) => FieldType::I32,
            Column::F32(_) => FieldType::F32,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Column::Bool(v) => v.len(),
            Column::U8(v) => v.len(),
            Column::U16(v) => v.len(),
            Column::U32(v) => v.len(),
            Column::I8(v) => v.len(),
            Column::I16(v) => v.len(),
            Column::I32(v) => v.len(),
            Column::F32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<FieldValue> {
        match self {
            Column::Bool(v) => v.get(index).copied().map(FieldValue::Bool),
            Column::U8(v) => v.get(index).copied().map(FieldValue::U8),
            Column::U16(v) => v.get(index).copied().map(FieldValue::U16),
            Column::U32(v) => v.get(index).copied().map(FieldValue::U32),
            Column::I8(v) => v.get(index).copied().map(FieldValue::I8),
            Column::I16(v) => v.get(index).copied().map(FieldValue::I16),
            Column::I32(v) => v.get(index).copied().map(FieldValue::I32),
            Column::F32(v) => v.get(index).copied().map(FieldValue::F32),
        }
    }

    fn slice(&self, range: Range<usize>) -> Column {
        match self {
            Column::Bool(v) => Column::Bool(v[range].to_vec()),
            Column::U8(v) => Column::U8(v[range].to_vec()),
            Column::U16(v) => Column::U16(v[range].to_vec()),
            Column::U32(v) => Column::U32(v[range].to_vec()),
            Column::I8(v) => Column::I8(v[range].to_vec()),
            Column::I16(v) => Column::I16(v[range].to_vec()),
            Column::I32(v) => Column::I32(v[range].to_vec()),
            Column::F32(v) => Column::F32(v[range].to_vec()),
        }
    }

    /// Append a value already checked against `field_type()`.
    fn push(&mut self, value: FieldValue) {
        match (self, value) {
            (Column::Bool(v), FieldValue::Bool(x)) => v.push(x),
            (Column::U8(v), FieldValue::U8(x)) => v.push(x),
            (Column::U16(v), FieldValue::U16(x)) => v.push(x),
            (Column::U32(v), FieldValue::U32(x)) => v.push(x),
            (Column::I8(v), FieldValue::I8(x)) => v.push(x),
            (Column::I16(v), FieldValue::I16(x)) => v.push(x),
            (Column::I32(v), FieldValue::I32(x)) => v.push(x),
            (Column::F32(v), FieldValue::F32(x)) => v.push(x),
            (column, value) => debug_assert_eq!(column.field_type(), value.field_type()),
        }
    }
}

/// Preallocated per-field history with a monotonic write cursor.
#[derive(Debug, Clone)]
pub struct RecordingBuffer {
    schema: Arc<RecordSchema>,
    columns: Vec<Column>,
    capacity: usize,
    len: usize,
    frozen: bool,
}

impl RecordingBuffer {
    pub fn new(schema: Arc<RecordSchema>, capacity: usize) -> Self {
        let columns = schema
            .fields()
            .iter()
            .map(|field| Column::with_capacity(field.field_type, capacity))
            .collect();
        Self {
            schema,
            columns,
            capacity,
            len: 0,
            frozen: false,
        }
    }

    /// Create a buffer already wrapped for sharing.
    pub fn shared(schema: Arc<RecordSchema>, capacity: usize) -> SharedRecording {
        Arc::new(Mutex::new(Self::new(schema, capacity)))
    }

    /// Write every field of `record` at the cursor and advance it.
    pub fn append(&mut self, record: &Record) -> Result<()> {
        if self.frozen || self.len >= self.capacity {
            return Err(RecordingError::CapacityExceeded {
                capacity: self.capacity,
            });
        }
        let matches = record
            .values()
            .iter()
            .map(FieldValue::field_type)
            .eq(self.columns.iter().map(Column::field_type));
        if !matches {
            return Err(RecordingError::SchemaMismatch {
                expected: self.schema.name().to_string(),
                actual: record.schema().name().to_string(),
            });
        }

        for (column, value) in self.columns.iter_mut().zip(record.values()) {
            column.push(*value);
        }
        self.len += 1;
        Ok(())
    }

    /// The most recently written record.
    pub fn last(&self) -> Result<Record> {
        let index = self.len.checked_sub(1).ok_or(RecordingError::Empty)?;
        Ok(self.record_at(index))
    }

    /// Record at `index`, if written.
    pub fn get(&self, index: usize) -> Option<Record> {
        (index < self.len).then(|| self.record_at(index))
    }

    fn record_at(&self, index: usize) -> Record {
        let mut record = Record::new(Arc::clone(&self.schema));
        for (field, column) in self.schema.fields().iter().zip(&self.columns) {
            if let Some(value) = column.get(index) {
                // Column types mirror the schema, so this cannot fail.
                let _ = record.set(&field.name, value);
            }
        }
        record
    }

    /// Copies of every column for records `start..end`.
    pub fn slice(&self, start: usize, end: usize) -> Result<Vec<(String, Column)>> {
        if start > end || end > self.len {
            return Err(RecordingError::OutOfRange {
                start,
                end,
                len: self.len,
            });
        }
        Ok(self
            .schema
            .fields()
            .iter()
            .zip(&self.columns)
            .map(|(field, column)| (field.name.clone(), column.slice(start..end)))
            .collect())
    }

    /// All written values of one field.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.schema.field_index(name).map(|index| &self.columns[index])
    }

    pub fn schema(&self) -> &Arc<RecordSchema> {
        &self.schema
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.len >= self.capacity
    }

    /// Reject every further append.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }
}
