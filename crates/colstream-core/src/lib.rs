#![forbid(unsafe_code)]
//! colstream-core: shared vocabulary for the chunked column reader.
//!
//! Pure data: errors, the logical-field → physical-column mapping, the closed
//! set of element data types, decoded scalars, row batches, and reader
//! configuration. Store access lives in `colstream-io`, the engine in
//! `colstream-reader`.

pub mod config;
pub mod error;
pub mod hash;
pub mod id;
pub mod prelude;
pub mod schema;
pub mod types;

pub use error::{Error, Result};
