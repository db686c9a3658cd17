use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::LoadLimits;
use crate::error::{Result, SchemaError};
use crate::schema::RecordSchema;
use crate::types::{ByteOrder, FieldType};

/// Serialized form of a schema, as written in definition files.
///
/// ```json
/// {
///   "name": "sensor",
///   "byte_order": "little-endian",
///   "fields": [
///     { "name": "time_ms", "type": "u32" },
///     { "name": "temp_c", "type": "f32" }
///   ]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDef {
    pub name: String,
    #[serde(default)]
    pub byte_order: ByteOrder,
    pub fields: Vec<FieldDef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
}

impl RecordSchema {
    /// Build a schema from its definition.
    pub fn from_def(def: &SchemaDef) -> Result<Self> {
        def.fields
            .iter()
            .fold(
                RecordSchema::builder(def.name.clone()).byte_order(def.byte_order),
                |builder, field| builder.field(field.name.clone(), field.field_type),
            )
            .build()
    }

    /// Parse a JSON definition.
    pub fn from_json(json: &str) -> Result<Self> {
        let def: SchemaDef = serde_json::from_str(json)?;
        Self::from_def(&def)
    }

    /// Definition equivalent to this schema.
    pub fn to_def(&self) -> SchemaDef {
        SchemaDef {
            name: self.name().to_string(),
            byte_order: self.byte_order(),
            fields: self
                .fields()
                .iter()
                .map(|field| FieldDef {
                    name: field.name.clone(),
                    field_type: field.field_type,
                })
                .collect(),
        }
    }
}

/// Load a schema definition file with default limits.
pub fn load_schema_file(path: &Path) -> Result<Arc<RecordSchema>> {
    load_schema_file_with_limits(path, LoadLimits::default())
}

/// Load a schema definition file.
pub fn load_schema_file_with_limits(path: &Path, limits: LoadLimits) -> Result<Arc<RecordSchema>> {
    let file = std::fs::File::open(path).map_err(|err| {
        SchemaError::LoadFailed(format!("failed opening schema {}: {err}", path.display()))
    })?;
    let metadata = file
        .metadata()
        .map_err(|err| SchemaError::LoadFailed(err.to_string()))?;
    if !metadata.is_file() {
        return Err(SchemaError::LoadFailed(format!(
            "not a regular file: {}",
            path.display()
        )));
    }
    if metadata.len() > limits.max_file_size as u64 {
        return Err(SchemaError::LoadFailed(format!(
            "schema file too large ({} bytes): {}",
            metadata.len(),
            path.display()
        )));
    }

    let read_limit = u64::try_from(limits.max_file_size.saturating_add(1)).unwrap_or(u64::MAX);
    let mut content = String::new();
    file.take(read_limit)
        .read_to_string(&mut content)
        .map_err(|err| {
            SchemaError::LoadFailed(format!("failed reading schema {}: {err}", path.display()))
        })?;
    if content.len() > limits.max_file_size {
        return Err(SchemaError::LoadFailed(format!(
            "schema file too large while reading: {}",
            path.display()
        )));
    }

    let schema = RecordSchema::from_json(&content)?;
    debug!(
        path = %path.display(),
        schema = schema.name(),
        fields = schema.len(),
        size = schema.total_size(),
        "loaded schema"
    );
    Ok(Arc::new(schema))
}
