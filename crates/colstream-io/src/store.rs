//! The column store interface consumed by the reader.
//!
//! - `dir_store`: raw column files + `columns.json` manifest (default).
//! - `memory_store`: in-memory columns (tests, embedding).
//!
//! `open_store` picks a backend from the store location
//! (e.g. `file:///data/points` or a bare path).

use colstream_core::error::{Error, Result};
use colstream_core::schema::ElementType;

use crate::dir_store::DirColumnStore;

/// Native chunk layout reported for a column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Chunking {
    /// Stored as one contiguous run; no chunking metadata.
    Contiguous,
    /// Chunk extent per dimension.
    Chunked(Vec<u64>),
}

impl Chunking {
    pub fn is_chunked(&self) -> bool {
        matches!(self, Chunking::Chunked(_))
    }

    pub fn dimensionality(&self) -> usize {
        match self {
            Chunking::Contiguous => 0,
            Chunking::Chunked(dims) => dims.len(),
        }
    }
}

/// One opened column.
pub trait ColumnSource: Send {
    /// Physical column identifier.
    fn id(&self) -> &str;

    /// Number of elements in the column.
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn chunking(&self) -> Chunking;

    fn element_type(&self) -> ElementType;

    /// Read `count` elements starting at element `offset` into the front of
    /// `dest`. `dest` must hold at least `count` elements.
    fn read_range(&mut self, offset: u64, count: usize, dest: &mut [u8]) -> Result<()>;
}

/// An opened, read-only column store.
pub trait ColumnStore: Send {
    /// Location the store was opened from (diagnostics).
    fn location(&self) -> &str;

    /// Open a column by physical identifier.
    fn open_column(&mut self, id: &str) -> Result<Box<dyn ColumnSource>>;

    /// Release the store. Further calls fail with `Error::ClosedHandle`.
    fn close(&mut self) -> Result<()>;
}

/// Open the store backend matching `location`.
pub fn open_store(location: &str) -> Result<Box<dyn ColumnStore>> {
    let scheme = location
        .split_once("://")
        .map(|(scheme, _)| scheme.trim())
        .filter(|s| !s.is_empty());

    match scheme {
        Some("file") => {
            let path = file_uri_to_path(location).ok_or_else(|| Error::Open {
                location: location.to_string(),
                reason: "malformed file URI".into(),
            })?;
            Ok(Box::new(DirColumnStore::open(&path)?))
        }
        // Treat a bare path as a directory store.
        None => Ok(Box::new(DirColumnStore::open(location)?)),
        Some(other) => Err(Error::Config(format!(
            "unsupported store scheme '{other}'"
        ))),
    }
}

fn file_uri_to_path(uri: &str) -> Option<String> {
    let stripped = uri.strip_prefix("file://")?;
    if stripped.is_empty() {
        None
    } else if stripped.starts_with('/') {
        Some(stripped.to_string())
    } else {
        Some(format!("/{}", stripped))
    }
}
