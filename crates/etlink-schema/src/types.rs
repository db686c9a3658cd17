use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SchemaError};

/// Primitive kinds a record field can have.
///
/// Widths match the firmware's C types (`bool`, `uint8_t` ... `float`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Bool,
    U8,
    U16,
    U32,
    I8,
    I16,
    I32,
    F32,
}

impl FieldType {
    /// Encoded width in bytes.
    pub const fn width(self) -> usize {
        match self {
            FieldType::Bool | FieldType::U8 | FieldType::I8 => 1,
            FieldType::U16 | FieldType::I16 => 2,
            FieldType::U32 | FieldType::I32 | FieldType::F32 => 4,
        }
    }

    /// Lowercase name used in schema definitions.
    pub const fn name(self) -> &'static str {
        match self {
            FieldType::Bool => "bool",
            FieldType::U8 => "u8",
            FieldType::U16 => "u16",
            FieldType::U32 => "u32",
            FieldType::I8 => "i8",
            FieldType::I16 => "i16",
            FieldType::I32 => "i32",
            FieldType::F32 => "f32",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FieldType {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bool" => Ok(FieldType::Bool),
            "u8" => Ok(FieldType::U8),
            "u16" => Ok(FieldType::U16),
            "u32" => Ok(FieldType::U32),
            "i8" => Ok(FieldType::I8),
            "i16" => Ok(FieldType::I16),
            "i32" => Ok(FieldType::I32),
            "f32" => Ok(FieldType::F32),
            other => Err(SchemaError::LoadFailed(format!(
                "unsupported field type: {other}"
            ))),
        }
    }
}

/// Byte order of multi-byte fields on the wire.
///
/// `Native` follows the host and is packed (no alignment padding between fields).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ByteOrder {
    #[default]
    #[serde(alias = "little-endian-no-alignment")]
    LittleEndian,
    BigEndian,
    Network,
    Native,
}

impl ByteOrder {
    /// True when multi-byte values are written most significant byte first.
    pub fn is_big_endian(self) -> bool {
        match self {
            ByteOrder::LittleEndian => false,
            ByteOrder::BigEndian | ByteOrder::Network => true,
            ByteOrder::Native => cfg!(target_endian = "big"),
        }
    }
}

/// A typed field value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    U8(u8),
    U16(u16),
    U32(u32),
    I8(i8),
    I16(i16),
    I32(i32),
    F32(f32),
}

impl FieldValue {
    /// The zero value for a field type.
    pub fn zero(field_type: FieldType) -> Self {
        match field_type {
            FieldType::Bool => FieldValue::Bool(false),
            FieldType::U8 => FieldValue::U8(0),
            FieldType::U16 => FieldValue::U16(0),
            FieldType::U32 => FieldValue::U32(0),
            FieldType::I8 => FieldValue::I8(0),
            FieldType::I16 => FieldValue::I16(0),
            FieldType::I32 => FieldValue::I32(0),
            FieldType::F32 => FieldValue::F32(0.0),
        }
    }

    /// The kind of this value.
    pub fn field_type(&self) -> FieldType {
        match self {
            FieldValue::Bool(_) => FieldType::Bool,
            FieldValue::U8(_) => FieldType::U8,
            FieldValue::U16(_) => FieldType::U16,
            FieldValue::U32(_) => FieldType::U32,
            FieldValue::I8(_) => FieldType::I8,
            FieldValue::I16(_) => FieldType::I16,
            FieldValue::I32(_) => FieldType::I32,
            FieldValue::F32(_) => FieldType::F32,
        }
    }

    /// Parse text into a value of the given type.
    ///
    /// Bools accept `true`/`false`/`1`/`0`. Integers are range checked.
    pub fn parse(field_type: FieldType, text: &str) -> Result<Self> {
        let text = text.trim();
        let invalid = || SchemaError::InvalidValue {
            field_type,
            value: text.to_string(),
        };

        let value = match field_type {
            FieldType::Bool => match text.to_ascii_lowercase().as_str() {
                "true" | "1" => FieldValue::Bool(true),
                "false" | "0" => FieldValue::Bool(false),
                _ => return Err(invalid()),
            },
            FieldType::U8 => FieldValue::U8(text.parse().map_err(|_| invalid())?),
            FieldType::U16 => FieldValue::U16(text.parse().map_err(|_| invalid())?),
            FieldType::U32 => FieldValue::U32(text.parse().map_err(|_| invalid())?),
            FieldType::I8 => FieldValue::I8(text.parse().map_err(|_| invalid())?),
            FieldType::I16 => FieldValue::I16(text.parse().map_err(|_| invalid())?),
            FieldType::I32 => FieldValue::I32(text.parse().map_err(|_| invalid())?),
            FieldType::F32 => FieldValue::F32(text.parse().map_err(|_| invalid())?),
        };
        Ok(value)
    }

    /// Append the encoded bytes of this value to `dst`.
    pub(crate) fn write_to(&self, order: ByteOrder, dst: &mut Vec<u8>) {
        let big = order.is_big_endian();
        macro_rules! put {
            ($v:expr) => {
                if big {
                    dst.extend_from_slice(&$v.to_be_bytes())
                } else {
                    dst.extend_from_slice(&$v.to_le_bytes())
                }
            };
        }

        match *self {
            FieldValue::Bool(v) => dst.push(u8::from(v)),
            FieldValue::U8(v) => dst.push(v),
            FieldValue::I8(v) => put!(v),
            FieldValue::U16(v) => put!(v),
            FieldValue::I16(v) => put!(v),
            FieldValue::U32(v) => put!(v),
            FieldValue::I32(v) => put!(v),
            FieldValue::F32(v) => put!(v),
        }
    }

    /// Decode a value from exactly `field_type.width()` bytes.
    pub(crate) fn read_from(field_type: FieldType, order: ByteOrder, src: &[u8]) -> Self {
        debug_assert_eq!(src.len(), field_type.width());
        let big = order.is_big_endian();
        macro_rules! get {
            ($t:ty, $n:literal) => {{
                let mut raw = [0u8; $n];
                raw.copy_from_slice(&src[..$n]);
                if big {
                    <$t>::from_be_bytes(raw)
                } else {
                    <$t>::from_le_bytes(raw)
                }
            }};
        }

        match field_type {
            FieldType::Bool => FieldValue::Bool(src[0] != 0),
            FieldType::U8 => FieldValue::U8(src[0]),
            FieldType::I8 => FieldValue::I8(src[0] as i8),
            FieldType::U16 => FieldValue::U16(get!(u16, 2)),
            FieldType::I16 => FieldValue::I16(get!(i16, 2)),
            FieldType::U32 => FieldValue::U32(get!(u32, 4)),
            FieldType::I32 => FieldValue::I32(get!(i32, 4)),
            FieldType::F32 => FieldValue::F32(get!(f32, 4)),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Bool(v) => write!(f, "{v}"),
            FieldValue::U8(v) => write!(f, "{v}"),
            FieldValue::U16(v) => write!(f, "{v}"),
            FieldValue::U32(v) => write!(f, "{v}"),
            FieldValue::I8(v) => write!(f, "{v}"),
            FieldValue::I16(v) => write!(f, "{v}"),
            FieldValue::I32(v) => write!(f, "{v}"),
            FieldValue::F32(v) => write!(f, "{v:.3}"),
        }
    }
}

macro_rules! impl_from_primitive {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$t> for FieldValue {
                fn from(value: $t) -> Self {
                    FieldValue::$variant(value)
                }
            }
        )*
    };
}

impl_from_primitive! {
    bool => Bool,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    f32 => F32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widths_match_c_types() {
        assert_eq!(FieldType::Bool.width(), 1);
        assert_eq!(FieldType::U8.width(), 1);
        assert_eq!(FieldType::I8.width(), 1);
        assert_eq!(FieldType::U16.width(), 2);
        assert_eq!(FieldType::I16.width(), 2);
        assert_eq!(FieldType::U32.width(), 4);
        assert_eq!(FieldType::I32.width(), 4);
        assert_eq!(FieldType::F32.width(), 4);
    }

    #[test]
    fn field_type_parses_names() {
        assert_eq!("u16".parse::<FieldType>().unwrap(), FieldType::U16);
        assert_eq!(" F32 ".parse::<FieldType>().unwrap(), FieldType::F32);
        assert!("f64".parse::<FieldType>().is_err());
    }

    #[test]
    fn network_order_is_big_endian() {
        assert!(ByteOrder::Network.is_big_endian());
        assert!(ByteOrder::BigEndian.is_big_endian());
        assert!(!ByteOrder::LittleEndian.is_big_endian());
        assert_eq!(
            ByteOrder::Native.is_big_endian(),
            cfg!(target_endian = "big")
        );
    }

    #[test]
    fn byte_order_config_names() {
        let order: ByteOrder = serde_json::from_str("\"little-endian\"").unwrap();
        assert_eq!(order, ByteOrder::LittleEndian);
        let order: ByteOrder = serde_json::from_str("\"network\"").unwrap();
        assert_eq!(order, ByteOrder::Network);
        let order: ByteOrder =
            serde_json::from_str("\"little-endian-no-alignment\"").unwrap();
        assert_eq!(order, ByteOrder::LittleEndian);
    }

    #[test]
    fn parse_values() {
        assert_eq!(
            FieldValue::parse(FieldType::Bool, "1").unwrap(),
            FieldValue::Bool(true)
        );
        assert_eq!(
            FieldValue::parse(FieldType::I16, "-300").unwrap(),
            FieldValue::I16(-300)
        );
        assert_eq!(
            FieldValue::parse(FieldType::F32, "23.5").unwrap(),
            FieldValue::F32(23.5)
        );
        assert!(matches!(
            FieldValue::parse(FieldType::U8, "256"),
            Err(SchemaError::InvalidValue { .. })
        ));
        assert!(FieldValue::parse(FieldType::Bool, "yes").is_err());
    }

    #[test]
    fn write_and_read_respect_byte_order() {
        let mut le = Vec::new();
        FieldValue::U32(0x0102_0304).write_to(ByteOrder::LittleEndian, &mut le);
        assert_eq!(le, [0x04, 0x03, 0x02, 0x01]);

        let mut be = Vec::new();
        FieldValue::U32(0x0102_0304).write_to(ByteOrder::BigEndian, &mut be);
        assert_eq!(be, [0x01, 0x02, 0x03, 0x04]);

        assert_eq!(
            FieldValue::read_from(FieldType::U32, ByteOrder::BigEndian, &be),
            FieldValue::U32(0x0102_0304)
        );
    }

    #[test]
    fn nonzero_byte_decodes_as_true() {
        assert_eq!(
            FieldValue::read_from(FieldType::Bool, ByteOrder::LittleEndian, &[0x02]),
            FieldValue::Bool(true)
        );
    }

    #[test]
    fn json_output_is_plain() {
        let json = serde_json::to_string(&FieldValue::U16(7)).unwrap();
        assert_eq!(json, "7");
        let json = serde_json::to_string(&FieldValue::Bool(true)).unwrap();
        assert_eq!(json, "true");
    }
}
