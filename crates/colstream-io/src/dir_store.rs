//! Directory-backed column store.
//!
//! Layout:
//! ```text
//! <root>/columns.json      manifest (see `DirManifest`)
//! <root>/<file>            raw elements, one file per column
//! ```
//!
//! Manifest example:
//! ```json
//! { "columns": {
//!     "/points/x": { "file": "x.bin", "kind": "float", "bit_width": 64,
//!                    "byte_order": "little", "length": 1000, "chunks": [256] },
//!     "/points/i": { "file": "i.bin", "kind": "integer", "signed": false,
//!                    "bit_width": 16, "byte_order": "big", "length": 1000,
//!                    "blake3": "…64 hex chars…" } } }
//! ```
//! `chunks` absent means the column is stored contiguously.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use blake3::Hasher;
use serde::{Deserialize, Serialize};

use colstream_core::error::{Error, Result};
use colstream_core::schema::{ElementKind, ElementType};

use crate::store::{Chunking, ColumnSource, ColumnStore};

pub const MANIFEST_FILE: &str = "columns.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirManifest {
    pub columns: BTreeMap<String, DirColumnEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirColumnEntry {
    /// File name relative to the store root.
    pub file: String,
    #[serde(flatten)]
    pub element: ElementType,
    pub length: u64,
    #[serde(default)]
    pub chunks: Option<Vec<u64>>,
    /// Optional blake3 hex digest of the column file.
    #[serde(default)]
    pub blake3: Option<String>,
}

/// Read-only store over a directory of raw column files.
#[derive(Debug)]
pub struct DirColumnStore {
    location: String,
    root: PathBuf,
    manifest: DirManifest,
    closed: bool,
}

impl DirColumnStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let root = path.as_ref().to_path_buf();
        let location = root.display().to_string();
        let open_err = |reason: String| Error::Open {
            location: location.clone(),
            reason,
        };

        if !root.is_dir() {
            return Err(open_err("not a directory".into()));
        }
        let raw = fs::read(root.join(MANIFEST_FILE))
            .map_err(|e| open_err(format!("read {MANIFEST_FILE}: {e}")))?;
        let manifest: DirManifest = serde_json::from_slice(&raw)
            .map_err(|e| open_err(format!("parse {MANIFEST_FILE}: {e}")))?;

        tracing::debug!(
            store = %location,
            columns = manifest.columns.len(),
            "opened directory store"
        );
        Ok(Self {
            location,
            root,
            manifest,
            closed: false,
        })
    }

    pub fn manifest(&self) -> &DirManifest {
        &self.manifest
    }
}

impl ColumnStore for DirColumnStore {
    fn location(&self) -> &str {
        &self.location
    }

    fn open_column(&mut self, id: &str) -> Result<Box<dyn ColumnSource>> {
        if self.closed {
            return Err(Error::ClosedHandle);
        }
        let entry = self
            .manifest
            .columns
            .get(id)
            .cloned()
            .ok_or_else(|| Error::MissingColumn {
                column: id.to_string(),
            })?;
        let io_err = |what: &str, e: std::io::Error| Error::Io {
            column: id.to_string(),
            reason: format!("{what}: {e}"),
        };

        let path = self.root.join(&entry.file);
        let mut file = File::open(&path).map_err(|e| io_err("open", e))?;

        // Size can only be checked for fixed-width numeric elements.
        if matches!(entry.element.kind, ElementKind::Integer | ElementKind::Float) {
            if let Some(width) = entry.element.byte_width() {
                let actual = file.metadata().map_err(|e| io_err("stat", e))?.len();
                let expected = entry.length * width as u64;
                if actual != expected {
                    return Err(Error::Io {
                        column: id.to_string(),
                        reason: format!(
                            "file '{}' holds {actual} bytes, expected {expected}",
                            entry.file
                        ),
                    });
                }
            }
        }

        if let Some(expected) = entry.blake3.as_deref() {
            let mut h = Hasher::new();
            std::io::copy(&mut file, &mut h).map_err(|e| io_err("hash", e))?;
            let actual = h.finalize().to_hex().to_string();
            if !actual.eq_ignore_ascii_case(expected) {
                return Err(Error::Io {
                    column: id.to_string(),
                    reason: format!("checksum mismatch for '{}'", entry.file),
                });
            }
        }

        Ok(Box::new(DirColumnSource {
            id: id.to_string(),
            entry,
            file,
        }))
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Err(Error::ClosedHandle);
        }
        self.closed = true;
        Ok(())
    }
}

struct DirColumnSource {
    id: String,
    entry: DirColumnEntry,
    file: File,
}

impl DirColumnSource {
    fn io_err(&self, reason: String) -> Error {
        Error::Io {
            column: self.id.clone(),
            reason,
        }
    }
}

impl ColumnSource for DirColumnSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn len(&self) -> u64 {
        self.entry.length
    }

    fn chunking(&self) -> Chunking {
        match &self.entry.chunks {
            Some(dims) => Chunking::Chunked(dims.clone()),
            None => Chunking::Contiguous,
        }
    }

    fn element_type(&self) -> ElementType {
        self.entry.element
    }

    fn read_range(&mut self, offset: u64, count: usize, dest: &mut [u8]) -> Result<()> {
        let width = self
            .entry
            .element
            .byte_width()
            .ok_or_else(|| self.io_err("element width is not a whole number of bytes".into()))?;
        if offset + count as u64 > self.entry.length {
            return Err(self.io_err(format!(
                "range {offset}+{count} exceeds column length {}",
                self.entry.length
            )));
        }
        let len = count * width;
        if dest.len() < len {
            return Err(self.io_err(format!("destination too small for {count} elements")));
        }
        self.file
            .seek(SeekFrom::Start(offset * width as u64))
            .map_err(|e| self.io_err(format!("seek: {e}")))?;
        self.file
            .read_exact(&mut dest[..len])
            .map_err(|e| self.io_err(format!("read: {e}")))?;
        Ok(())
    }
}
