//! Convenient re-exports for downstream crates.

pub use crate::config::{ReaderConfig, DEFAULT_BATCH_SIZE, DEFAULT_FALLBACK_CHUNK_SIZE};
pub use crate::error::{Error, Result};
pub use crate::id::{ColumnIndex, FieldId};
pub use crate::schema::{
    ByteOrder, ChunkSource, ColumnDescriptor, DataType, ElementKind, ElementType, Field, Schema,
    SchemaMapping,
};
pub use crate::types::{Column, RowBatch, Scalar};
