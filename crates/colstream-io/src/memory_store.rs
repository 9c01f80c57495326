//! In-memory column store for tests and embedding.
//!
//! Columns are registered up front as raw bytes plus metadata. The store also
//! keeps a log of opened columns and range reads so callers can check how the
//! reader drove it.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use colstream_core::error::{Error, Result};
use colstream_core::schema::{ByteOrder, DataType, ElementType};
use colstream_core::types::Scalar;

use crate::store::{Chunking, ColumnSource, ColumnStore};

/// One in-memory column: metadata plus its raw element bytes.
#[derive(Debug, Clone)]
pub struct MemoryColumn {
    pub element_type: ElementType,
    pub chunking: Chunking,
    pub len: u64,
    bytes: Arc<Vec<u8>>,
}

impl MemoryColumn {
    /// Column with explicit metadata. `bytes` is not checked against `len`
    /// so that broken stores can be modelled.
    pub fn new(element_type: ElementType, chunking: Chunking, len: u64, bytes: Vec<u8>) -> Self {
        Self {
            element_type,
            chunking,
            len,
            bytes: Arc::new(bytes),
        }
    }

    /// Encode `values` in `order`. Every value must be of `data_type`.
    pub fn from_scalars(
        data_type: DataType,
        order: ByteOrder,
        chunking: Chunking,
        values: &[Scalar],
    ) -> Result<Self> {
        let mut bytes = Vec::with_capacity(values.len() * data_type.byte_width());
        for v in values {
            if v.data_type() != data_type {
                return Err(Error::Invariant(format!(
                    "expected {data_type} values, got {}",
                    v.data_type()
                )));
            }
            v.write_bytes(order, &mut bytes);
        }
        Ok(Self::new(
            ElementType::from_data_type(data_type, order),
            chunking,
            values.len() as u64,
            bytes,
        ))
    }

    pub fn byte_len(&self) -> usize {
        self.bytes.len()
    }
}

/// A range read issued against one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeRead {
    pub offset: u64,
    pub count: usize,
}

#[derive(Default)]
struct MemoryInner {
    columns: HashMap<String, MemoryColumn>,
    opened: Vec<String>,
    reads: HashMap<String, Vec<RangeRead>>,
    failing: HashSet<String>,
    closed: bool,
}

/// Thread-safe in-memory store. Clones share the same columns and logs.
#[derive(Clone)]
pub struct MemoryColumnStore {
    location: String,
    inner: Arc<Mutex<MemoryInner>>,
}

impl MemoryColumnStore {
    pub fn new() -> Self {
        Self {
            location: "memory://".to_string(),
            inner: Arc::new(Mutex::new(MemoryInner::default())),
        }
    }

    /// Register (or replace) a column.
    pub fn insert(&self, id: impl Into<String>, column: MemoryColumn) {
        self.state().columns.insert(id.into(), column);
    }

    /// Make every subsequent range read on `id` fail with an I/O error.
    pub fn fail_reads(&self, id: impl Into<String>) {
        self.state().failing.insert(id.into());
    }

    /// Undo [`fail_reads`](Self::fail_reads) for `id`.
    pub fn restore_reads(&self, id: &str) {
        self.state().failing.remove(id);
    }

    /// Column ids in the order they were opened.
    pub fn opened_columns(&self) -> Vec<String> {
        self.state().opened.clone()
    }

    /// Range reads issued against `id`, in order.
    pub fn reads(&self, id: &str) -> Vec<RangeRead> {
        self.state().reads.get(id).cloned().unwrap_or_default()
    }

    pub fn read_count(&self, id: &str) -> usize {
        self.state().reads.get(id).map(Vec::len).unwrap_or(0)
    }

    pub fn is_closed(&self) -> bool {
        self.state().closed
    }

    // Diagnostics keep working on a poisoned lock; the logs are plain data.
    fn state(&self) -> MutexGuard<'_, MemoryInner> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl Default for MemoryColumnStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ColumnStore for MemoryColumnStore {
    fn location(&self) -> &str {
        &self.location
    }

    fn open_column(&mut self, id: &str) -> Result<Box<dyn ColumnSource>> {
        let mut state = self.state();
        if state.closed {
            return Err(Error::ClosedHandle);
        }
        let column = state
            .columns
            .get(id)
            .cloned()
            .ok_or_else(|| Error::MissingColumn {
                column: id.to_string(),
            })?;
        state.opened.push(id.to_string());
        Ok(Box::new(MemoryColumnSource {
            id: id.to_string(),
            column,
            inner: Arc::clone(&self.inner),
        }))
    }

    fn close(&mut self) -> Result<()> {
        let mut state = self.state();
        if state.closed {
            return Err(Error::ClosedHandle);
        }
        state.closed = true;
        Ok(())
    }
}

struct MemoryColumnSource {
    id: String,
    column: MemoryColumn,
    inner: Arc<Mutex<MemoryInner>>,
}

impl ColumnSource for MemoryColumnSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn len(&self) -> u64 {
        self.column.len
    }

    fn chunking(&self) -> Chunking {
        self.column.chunking.clone()
    }

    fn element_type(&self) -> ElementType {
        self.column.element_type
    }

    fn read_range(&mut self, offset: u64, count: usize, dest: &mut [u8]) -> Result<()> {
        let io_err = |reason: String| Error::Io {
            column: self.id.clone(),
            reason,
        };
        let mut state = self
            .inner
            .lock()
            .map_err(|_| io_err("store lock poisoned".into()))?;
        if state.closed {
            return Err(Error::ClosedHandle);
        }
        if state.failing.contains(&self.id) {
            return Err(io_err(format!("injected read failure at element {offset}")));
        }

        let width = self
            .column
            .element_type
            .byte_width()
            .ok_or_else(|| io_err("element width is not a whole number of bytes".into()))?;
        let start = offset as usize * width;
        let end = start + count * width;
        if offset + count as u64 > self.column.len || end > self.column.bytes.len() {
            return Err(io_err(format!(
                "range {offset}+{count} exceeds column length {}",
                self.column.len
            )));
        }
        let out = dest
            .get_mut(..end - start)
            .ok_or_else(|| io_err(format!("destination too small for {count} elements")))?;
        out.copy_from_slice(&self.column.bytes[start..end]);

        state
            .reads
            .entry(self.id.clone())
            .or_default()
            .push(RangeRead { offset, count });
        Ok(())
    }
}
