//! Logical schema types: the field → column mapping, element encodings, and
//! the per-column descriptor resolved at setup. Pure data; no store access.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Closed set of element types the reader can decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
}

impl DataType {
    /// Width of one element in bytes.
    pub const fn byte_width(self) -> usize {
        match self {
            DataType::Int8 | DataType::UInt8 => 1,
            DataType::Int16 | DataType::UInt16 => 2,
            DataType::Int32 | DataType::UInt32 | DataType::Float32 => 4,
            DataType::Int64 | DataType::UInt64 | DataType::Float64 => 8,
        }
    }

    pub const fn is_float(self) -> bool {
        matches!(self, DataType::Float32 | DataType::Float64)
    }

    pub const fn is_signed(self) -> bool {
        matches!(
            self,
            DataType::Int8
                | DataType::Int16
                | DataType::Int32
                | DataType::Int64
                | DataType::Float32
                | DataType::Float64
        )
    }

    pub const fn name(self) -> &'static str {
        match self {
            DataType::Int8 => "int8",
            DataType::Int16 => "int16",
            DataType::Int32 => "int32",
            DataType::Int64 => "int64",
            DataType::UInt8 => "uint8",
            DataType::UInt16 => "uint16",
            DataType::UInt32 => "uint32",
            DataType::UInt64 => "uint64",
            DataType::Float32 => "float32",
            DataType::Float64 => "float64",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ByteOrder {
    Little,
    Big,
}

impl ByteOrder {
    pub const fn native() -> Self {
        if cfg!(target_endian = "big") {
            ByteOrder::Big
        } else {
            ByteOrder::Little
        }
    }
}

/// Storage class of a column's elements as reported by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Integer,
    Float,
    Compound,
    Text,
    Opaque,
}

/// Element encoding metadata as reported by the store, before resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementType {
    pub kind: ElementKind,
    #[serde(default)]
    pub signed: bool,
    pub bit_width: u32,
    pub byte_order: ByteOrder,
}

impl ElementType {
    pub const fn int(signed: bool, bit_width: u32, byte_order: ByteOrder) -> Self {
        Self {
            kind: ElementKind::Integer,
            signed,
            bit_width,
            byte_order,
        }
    }

    pub const fn float(bit_width: u32, byte_order: ByteOrder) -> Self {
        Self {
            kind: ElementKind::Float,
            signed: true,
            bit_width,
            byte_order,
        }
    }

    /// The store-side encoding of a resolved data type.
    pub const fn from_data_type(data_type: DataType, byte_order: ByteOrder) -> Self {
        let bit_width = data_type.byte_width() as u32 * 8;
        if data_type.is_float() {
            Self::float(bit_width, byte_order)
        } else {
            Self::int(data_type.is_signed(), bit_width, byte_order)
        }
    }

    /// Bytes per element, when the width is a whole number of bytes.
    pub const fn byte_width(&self) -> Option<usize> {
        if self.bit_width > 0 && self.bit_width % 8 == 0 {
            Some(self.bit_width as usize / 8)
        } else {
            None
        }
    }

    /// Resolve into the closed `DataType` set. Anything else is unsupported.
    pub fn resolve(&self, column: &str) -> Result<DataType> {
        let unsupported = |detail: String| Error::UnsupportedType {
            column: column.to_string(),
            detail,
        };
        match (self.kind, self.signed, self.bit_width) {
            (ElementKind::Integer, true, 8) => Ok(DataType::Int8),
            (ElementKind::Integer, true, 16) => Ok(DataType::Int16),
            (ElementKind::Integer, true, 32) => Ok(DataType::Int32),
            (ElementKind::Integer, true, 64) => Ok(DataType::Int64),
            (ElementKind::Integer, false, 8) => Ok(DataType::UInt8),
            (ElementKind::Integer, false, 16) => Ok(DataType::UInt16),
            (ElementKind::Integer, false, 32) => Ok(DataType::UInt32),
            (ElementKind::Integer, false, 64) => Ok(DataType::UInt64),
            (ElementKind::Float, _, 32) => Ok(DataType::Float32),
            (ElementKind::Float, _, 64) => Ok(DataType::Float64),
            (ElementKind::Integer | ElementKind::Float, _, bits) => Err(unsupported(format!(
                "{:?} elements of {bits} bits are not supported",
                self.kind
            ))),
            (ElementKind::Compound, _, _) => {
                Err(unsupported("compound types are not supported".into()))
            }
            (kind, _, _) => Err(unsupported(format!("{kind:?} elements are not supported"))),
        }
    }
}

/// Where a column's chunk size came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkSource {
    /// Read from the store's chunking metadata.
    Native,
    /// Column is stored contiguously; the configured fallback is used.
    Fallback,
}

/// Fully resolved description of one mapped column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    /// Logical field name.
    pub name: String,
    /// Physical column identifier inside the store.
    pub column: String,
    pub data_type: DataType,
    pub byte_order: ByteOrder,
    pub element_size: usize,
    pub chunk_size: u64,
    pub chunk_source: ChunkSource,
}

impl ColumnDescriptor {
    pub fn new(
        name: impl Into<String>,
        column: impl Into<String>,
        data_type: DataType,
        byte_order: ByteOrder,
        chunk_size: u64,
        chunk_source: ChunkSource,
    ) -> Result<Self> {
        let column = column.into();
        if chunk_size == 0 {
            return Err(Error::Invariant(format!(
                "column '{column}' declares a chunk size of 0"
            )));
        }
        Ok(Self {
            name: name.into(),
            column,
            data_type,
            byte_order,
            element_size: data_type.byte_width(),
            chunk_size,
            chunk_source,
        })
    }

    /// Bytes needed to hold one full chunk.
    pub fn chunk_bytes(&self) -> usize {
        self.chunk_size as usize * self.element_size
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub data_type: DataType,
}

impl Field {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub fields: Vec<Field>,
}

impl Schema {
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    pub fn field(&self, idx: usize) -> Option<&Field> {
        self.fields.get(idx)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}

/// Validated logical field name → physical column id mapping.
///
/// Entries iterate in ascending logical-name order; that order is the column
/// order of every reader built from the mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "serde_json::Value", into = "BTreeMap<String, String>")]
pub struct SchemaMapping {
    entries: BTreeMap<String, String>,
}

impl SchemaMapping {
    pub fn new(entries: BTreeMap<String, String>) -> Result<Self> {
        if entries.is_empty() {
            return Err(Error::Config(
                "option 'dimensions' must map at least one field to a column".into(),
            ));
        }
        for (name, column) in &entries {
            if name.is_empty() {
                return Err(Error::Config(
                    "option 'dimensions' contains an empty field name".into(),
                ));
            }
            if column.is_empty() {
                return Err(Error::Config(format!(
                    "field '{name}' maps to an empty column identifier"
                )));
            }
        }
        Ok(Self { entries })
    }

    /// Build from a `(field, column)` list.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::new(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Validate a structured JSON option value.
    pub fn from_json_value(value: &serde_json::Value) -> Result<Self> {
        let object = match value {
            serde_json::Value::Null => {
                return Err(Error::Config("Required option 'dimensions' was not set".into()))
            }
            serde_json::Value::Object(object) => object,
            other => {
                return Err(Error::Config(format!(
                    "Option 'dimensions' must be a JSON object, not a {}",
                    json_type_name(other)
                )))
            }
        };

        let mut entries = BTreeMap::new();
        for (name, column) in object {
            match column {
                serde_json::Value::String(column) => {
                    entries.insert(name.clone(), column.clone());
                }
                other => {
                    return Err(Error::Config(format!(
                        "Every value in 'dimensions' must be a string. Key '{name}' has value with type '{}'",
                        json_type_name(other)
                    )))
                }
            }
        }
        Self::new(entries)
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(s)?;
        Self::from_json_value(&value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn column_of(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    /// `(logical name, physical column)` in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, column)| (name.as_str(), column.as_str()))
    }
}

impl TryFrom<serde_json::Value> for SchemaMapping {
    type Error = Error;

    fn try_from(value: serde_json::Value) -> Result<Self> {
        Self::from_json_value(&value)
    }
}

impl From<SchemaMapping> for BTreeMap<String, String> {
    fn from(mapping: SchemaMapping) -> Self {
        mapping.entries
    }
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
