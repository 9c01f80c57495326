#![forbid(unsafe_code)]
//! colstream-io: column store adapters and streaming writers.
//!
//! The reader only talks to the `ColumnStore`/`ColumnSource` traits in
//! `store`. Two backends ship here: an in-memory store for tests and
//! embedding, and a directory of raw column files described by a JSON
//! manifest. Writers turn decoded `RowBatch`es into NDJSON or CSV.

pub mod dir_store;
pub mod memory_store;
pub mod store;
pub mod writers;

pub use dir_store::DirColumnStore;
pub use memory_store::{MemoryColumn, MemoryColumnStore};
pub use store::{open_store, Chunking, ColumnSource, ColumnStore};
