#![forbid(unsafe_code)]
//! colstream-reader: row-at-a-time and bulk reads over chunked columns.
//!
//! A `ColumnReader` binds a `SchemaMapping` to a `ColumnStore`, registers
//! each field in a caller's `FieldLayout`, then materializes rows into any
//! `RowSink`. Each column keeps one chunk buffer, refilled only when the
//! row cursor crosses into that column's next chunk.

pub mod chunk;
pub mod handle;
pub mod materializer;
pub mod sink;
pub mod stats;
pub mod stream;

pub use handle::ColumnStoreHandle;
pub use materializer::RowMaterializer;
pub use sink::{FieldLayout, RowRecord, RowSink};
pub use stats::{ColumnStats, ReadStats};
pub use stream::{Batches, ColumnReader, StreamState};
