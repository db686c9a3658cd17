//! Fixed-layout record schemas and the binary record codec.
//!
//! A [`RecordSchema`] is the host-side copy of a firmware struct: an ordered
//! list of named primitive fields and a byte order. [`Record`]s hold one typed
//! value per field; [`encode`] and [`decode`] move them to and from the packed
//! payload bytes carried inside a frame.

pub mod codec;
pub mod config;
pub mod error;
pub mod loader;
pub mod record;
pub mod schema;
pub mod types;

pub use codec::{decode, encode};
pub use config::LoadLimits;
pub use error::{Result, SchemaError};
pub use loader::{load_schema_file, load_schema_file_with_limits, FieldDef, SchemaDef};
pub use record::Record;
pub use schema::{Field, RecordSchema, RecordSchemaBuilder, MAX_RECORD_SIZE};
pub use types::{ByteOrder, FieldType, FieldValue};
