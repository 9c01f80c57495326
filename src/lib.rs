#![forbid(unsafe_code)]
//! colstream: chunk-aware multi-column row reader.
//!
//! Facade over the workspace crates. Most users want [`ColumnReader`] and a
//! store from [`colstream_io`].

pub use colstream_core;
pub use colstream_io;
pub use colstream_reader;

pub use colstream_core::config::ReaderConfig;
pub use colstream_core::{Error, Result};
pub use colstream_reader::{ColumnReader, RowRecord};
