//! Record <-> payload bytes.
//!
//! Payload layout is the schema's fields back to back, no padding, each in
//! the schema's byte order.

use std::sync::Arc;

use crate::error::{Result, SchemaError};
use crate::record::Record;
use crate::schema::RecordSchema;
use crate::types::FieldValue;

/// Encode `record` with the layout of `schema`.
///
/// Values are looked up by field name, so a record of a different schema
/// encodes as long as every field exists with the same type.
pub fn encode(schema: &RecordSchema, record: &Record) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(schema.total_size());
    for field in schema.fields() {
        let value = record
            .get(&field.name)
            .ok_or_else(|| SchemaError::UnknownField(field.name.clone()))?;
        if value.field_type() != field.field_type {
            return Err(SchemaError::TypeMismatch {
                field: field.name.clone(),
                expected: field.field_type,
                actual: value.field_type(),
            });
        }
        value.write_to(schema.byte_order(), &mut out);
    }
    Ok(out)
}

/// Decode a payload into a record of `schema`.
pub fn decode(schema: &Arc<RecordSchema>, bytes: &[u8]) -> Result<Record> {
    if bytes.len() != schema.total_size() {
        return Err(SchemaError::LengthMismatch {
            schema: schema.name().to_string(),
            expected: schema.total_size(),
            actual: bytes.len(),
        });
    }

    let values = schema
        .fields()
        .iter()
        .map(|field| {
            let raw = &bytes[field.offset..field.offset + field.width()];
            FieldValue::read_from(field.field_type, schema.byte_order(), raw)
        })
        .collect();

    Ok(Record::from_values(Arc::clone(schema), values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ByteOrder, FieldType};

    fn sensor_schema(order: ByteOrder) -> Arc<RecordSchema> {
        RecordSchema::builder("sensor")
            .field("time_ms", FieldType::U32)
            .field("temp_c", FieldType::F32)
            .field("flag", FieldType::Bool)
            .byte_order(order)
            .build_shared()
            .unwrap()
    }

    #[test]
    fn encodes_little_endian_layout() {
        let schema = sensor_schema(ByteOrder::LittleEndian);
        let record = Record::new(Arc::clone(&schema))
            .with("time_ms", 1000u32)
            .unwrap()
            .with("temp_c", 23.5f32)
            .unwrap()
            .with("flag", true)
            .unwrap();

        let bytes = encode(&schema, &record).unwrap();
        let mut expected = Vec::new();
        expected.extend_from_slice(&1000u32.to_le_bytes());
        expected.extend_from_slice(&23.5f32.to_le_bytes());
        expected.push(1);
        assert_eq!(bytes, expected);

        let decoded = decode(&schema, &bytes).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn encodes_big_endian_layout() {
        let schema = RecordSchema::builder("be")
            .field("a", FieldType::U16)
            .field("b", FieldType::I32)
            .byte_order(ByteOrder::Network)
            .build_shared()
            .unwrap();
        let record = Record::new(Arc::clone(&schema))
            .with("a", 0x0102u16)
            .unwrap()
            .with("b", -2i32)
            .unwrap();

        let bytes = encode(&schema, &record).unwrap();
        assert_eq!(bytes, vec![0x01, 0x02, 0xFF, 0xFF, 0xFF, 0xFE]);
        assert_eq!(decode(&schema, &bytes).unwrap(), record);
    }

    #[test]
    fn decode_rejects_wrong_length() {
        let schema = sensor_schema(ByteOrder::LittleEndian);
        let err = decode(&schema, &[0u8; 8]).unwrap_err();
        assert!(matches!(
            err,
            SchemaError::LengthMismatch {
                expected: 9,
                actual: 8,
                ..
            }
        ));
    }

    #[test]
    fn encode_rejects_type_mismatch_across_schemas() {
        let wire = RecordSchema::builder("wire")
            .field("flag", FieldType::Bool)
            .build_shared()
            .unwrap();
        let local = RecordSchema::builder("local")
            .field("flag", FieldType::F32)
            .build_shared()
            .unwrap();
        let record = Record::new(local).with("flag", 1.0f32).unwrap();

        let err = encode(&wire, &record).unwrap_err();
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
    fn encode_rejects_missing_field() {
        let wire = sensor_schema(ByteOrder::LittleEndian);
        let other = RecordSchema::builder("other")
            .field("time_ms", FieldType::U32)
            .build_shared()
            .unwrap();
        let record = Record::new(other);
        assert!(matches!(
            encode(&wire, &record),
            Err(SchemaError::UnknownField(name)) if name == "temp_c"
        ));
    }

    #[test]
    fn every_type_survives_decode() {
        let schema = RecordSchema::builder("all")
            .field("b", FieldType::Bool)
            .field("u8", FieldType::U8)
            .field("u16", FieldType::U16)
            .field("u32", FieldType::U32)
            .field("i8", FieldType::I8)
            .field("i16", FieldType::I16)
            .field("i32", FieldType::I32)
            .field("f32", FieldType::F32)
            .build_shared()
            .unwrap();
        let record = Record::new(Arc::clone(&schema))
            .with("b", true)
            .unwrap()
            .with("u8", u8::MAX)
            .unwrap()
            .with("u16", u16::MAX)
            .unwrap()
            .with("u32", u32::MAX)
            .unwrap()
            .with("i8", i8::MIN)
            .unwrap()
            .with("i16", i16::MIN)
            .unwrap()
            .with("i32", i32::MIN)
            .unwrap()
            .with("f32", -0.25f32)
            .unwrap();

        let bytes = encode(&schema, &record).unwrap();
        assert_eq!(bytes.len(), schema.total_size());
        assert_eq!(decode(&schema, &bytes).unwrap(), record);
    }
}
