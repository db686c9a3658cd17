use std::collections::HashSet;
use std::sync::Arc;

use crate::error::{Result, SchemaError};
use crate::types::{ByteOrder, FieldType};

/// Largest encoded record that fits the one-byte frame length.
pub const MAX_RECORD_SIZE: usize = u8::MAX as usize;

/// One named, typed field at a fixed byte offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub field_type: FieldType,
    pub offset: usize,
}

impl Field {
    pub fn width(&self) -> usize {
        self.field_type.width()
    }
}

/// Ordered field layout shared with the firmware.
///
/// Field order and widths are the contract: they must match the C struct
/// on the other end of the link byte for byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSchema {
    name: String,
    fields: Vec<Field>,
    byte_order: ByteOrder,
    total_size: usize,
}

impl RecordSchema {
    /// Start building a schema.
    pub fn builder(name: impl Into<String>) -> RecordSchemaBuilder {
        RecordSchemaBuilder {
            name: name.into(),
            fields: Vec::new(),
            byte_order: ByteOrder::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    /// Encoded size in bytes (sum of field widths).
    pub fn total_size(&self) -> usize {
        self.total_size
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Position of a field in schema order.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|field| field.name == name)
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.name == name)
    }
}

/// Builder for [`RecordSchema`].
#[derive(Debug, Clone)]
pub struct RecordSchemaBuilder {
    name: String,
    fields: Vec<(String, FieldType)>,
    byte_order: ByteOrder,
}

impl RecordSchemaBuilder {
    /// Append a field. Fields are laid out in call order.
    pub fn field(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.fields.push((name.into(), field_type));
        self
    }

    pub fn byte_order(mut self, byte_order: ByteOrder) -> Self {
        self.byte_order = byte_order;
        self
    }

    /// Validate and freeze the layout.
    pub fn build(self) -> Result<RecordSchema> {
        if self.fields.is_empty() {
            return Err(SchemaError::EmptySchema(self.name));
        }

        let mut seen = HashSet::with_capacity(self.fields.len());
        let mut fields = Vec::with_capacity(self.fields.len());
        let mut offset = 0usize;
        for (name, field_type) in self.fields {
            if !seen.insert(name.clone()) {
                return Err(SchemaError::DuplicateField(name));
            }
            fields.push(Field {
                name,
                field_type,
                offset,
            });
            offset += field_type.width();
        }

        if offset > MAX_RECORD_SIZE {
            return Err(SchemaError::SchemaTooLarge {
                name: self.name,
                size: offset,
                max: MAX_RECORD_SIZE,
            });
        }

        Ok(RecordSchema {
            name: self.name,
            fields,
            byte_order: self.byte_order,
            total_size: offset,
        })
    }

    /// Build and wrap in an `Arc` for sharing between records and channels.
    pub fn build_shared(self) -> Result<Arc<RecordSchema>> {
        self.build().map(Arc::new)
    }
}
