use std::sync::Arc;

use crate::error::{Result, SchemaError};
use crate::schema::RecordSchema;
use crate::types::FieldValue;

/// A typed instance of a [`RecordSchema`].
///
/// Every field is always present. Values are stored in schema order.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    schema: Arc<RecordSchema>,
    values: Vec<FieldValue>,
}

impl Record {
    /// Create a record with every field at its zero value.
    pub fn new(schema: Arc<RecordSchema>) -> Self {
        let values = schema
            .fields()
            .iter()
            .map(|field| FieldValue::zero(field.field_type))
            .collect();
        Self { schema, values }
    }

    /// Build a record from values already in schema order.
    pub(crate) fn from_values(schema: Arc<RecordSchema>, values: Vec<FieldValue>) -> Self {
        debug_assert_eq!(schema.len(), values.len());
        Self { schema, values }
    }

    pub fn schema(&self) -> &Arc<RecordSchema> {
        &self.schema
    }

    pub fn get(&self, name: &str) -> Option<FieldValue> {
        self.schema.field_index(name).map(|index| self.values[index])
    }

    /// Set a field, checking its declared type.
    pub fn set(&mut self, name: &str, value: impl Into<FieldValue>) -> Result<()> {
        let value = value.into();
        let index = self
            .schema
            .field_index(name)
            .ok_or_else(|| SchemaError::UnknownField(name.to_string()))?;
        let expected = self.schema.fields()[index].field_type;
        if value.field_type() != expected {
            return Err(SchemaError::TypeMismatch {
                field: name.to_string(),
                expected,
                actual: value.field_type(),
            });
        }
        self.values[index] = value;
        Ok(())
    }

    /// Builder-style [`Record::set`].
    pub fn with(mut self, name: &str, value: impl Into<FieldValue>) -> Result<Self> {
        self.set(name, value)?;
        Ok(self)
    }

    /// Values in schema order.
    pub fn values(&self) -> &[FieldValue] {
        &self.values
    }

    /// `(name, value)` pairs in schema order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, FieldValue)> + '_ {
        self.schema
            .fields()
            .iter()
            .zip(self.values.iter())
            .map(|(field, value)| (field.name.as_str(), *value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FieldType;

    fn schema() -> Arc<RecordSchema> {
        RecordSchema::builder("out")
            .field("pc_time_ms", FieldType::U32)
            .field("hello_flag", FieldType::Bool)
            .build_shared()
            .unwrap()
    }

    #[test]
    fn new_record_is_zeroed() {
        let record = Record::new(schema());
        assert_eq!(record.get("pc_time_ms"), Some(FieldValue::U32(0)));
        assert_eq!(record.get("hello_flag"), Some(FieldValue::Bool(false)));
        assert_eq!(record.get("missing"), None);
    }

    #[test]
    fn set_checks_type() {
        let mut record = Record::new(schema());
        record.set("hello_flag", true).unwrap();
        assert_eq!(record.get("hello_flag"), Some(FieldValue::Bool(true)));

        let err = record.set("hello_flag", 1.5f32).unwrap_err();
        assert!(matches!(
            err,
            SchemaError::TypeMismatch {
                expected: FieldType::Bool,
                actual: FieldType::F32,
                ..
            }
        ));
    }

    #[test]
    fn set_unknown_field() {
        let mut record = Record::new(schema());
        assert!(matches!(
            record.set("nope", 1u8),
            Err(SchemaError::UnknownField(_))
        ));
    }

    #[test]
    fn iter_preserves_schema_order() {
        let record = Record::new(schema())
            .with("pc_time_ms", 42u32)
            .unwrap()
            .with("hello_flag", true)
            .unwrap();
        let names: Vec<&str> = record.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["pc_time_ms", "hello_flag"]);
    }
}
