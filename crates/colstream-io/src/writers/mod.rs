//! Streaming writers for decoded row batches.

pub mod csv;
pub mod jsonl;

pub use self::csv::CsvWriter;
pub use self::jsonl::JsonlWriter;
