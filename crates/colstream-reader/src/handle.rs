//! Column store handle: binds a schema mapping to open columns, checks that
//! they agree on length, and resolves chunk size and element type once.

use tracing::{debug, info, warn};

use colstream_core::error::{Error, Result};
use colstream_core::id::ColumnIndex;
use colstream_core::schema::{ChunkSource, ColumnDescriptor, SchemaMapping};
use colstream_io::store::{open_store, Chunking, ColumnSource, ColumnStore};

use crate::chunk::ChunkBuffer;

/// One bound column: descriptor, open source and its chunk buffer.
pub(crate) struct ColumnSlot {
    pub descriptor: ColumnDescriptor,
    pub source: Option<Box<dyn ColumnSource>>,
    pub chunk: ChunkBuffer,
}

pub struct ColumnStoreHandle {
    store: Box<dyn ColumnStore>,
    slots: Vec<ColumnSlot>,
    total_rows: u64,
    closed: bool,
}

impl std::fmt::Debug for ColumnStoreHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ColumnStoreHandle")
            .field("store", &self.store.location())
            .field("columns", &self.slots.len())
            .field("total_rows", &self.total_rows)
            .field("closed", &self.closed)
            .finish()
    }
}

impl ColumnStoreHandle {
    /// Open the store at `location` and bind `mapping` to it.
    pub fn open(location: &str, mapping: &SchemaMapping, fallback_chunk_size: u64) -> Result<Self> {
        let store = open_store(location)?;
        Self::initialize(store, mapping, fallback_chunk_size)
    }

    /// Bind `mapping` to an already opened store.
    ///
    /// Columns are opened in mapping order and each is checked before the
    /// next is opened. On any failure the store is closed before the error
    /// is returned.
    pub fn initialize(
        mut store: Box<dyn ColumnStore>,
        mapping: &SchemaMapping,
        fallback_chunk_size: u64,
    ) -> Result<Self> {
        match bind_columns(store.as_mut(), mapping, fallback_chunk_size) {
            Ok((slots, total_rows)) => {
                info!(
                    store = store.location(),
                    columns = slots.len(),
                    rows = total_rows,
                    "column store bound"
                );
                Ok(Self {
                    store,
                    slots,
                    total_rows,
                    closed: false,
                })
            }
            Err(e) => {
                if let Err(close_err) = store.close() {
                    warn!(error = %close_err, "closing store after failed setup");
                }
                Err(e)
            }
        }
    }

    /// Rows shared by every mapped column.
    pub fn total_rows(&self) -> u64 {
        self.total_rows
    }

    pub fn num_columns(&self) -> usize {
        self.slots.len()
    }

    pub fn location(&self) -> &str {
        self.store.location()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Resolved descriptors in mapping order. Still available after close.
    pub fn descriptors(&self) -> impl Iterator<Item = &ColumnDescriptor> + '_ {
        self.slots.iter().map(|s| &s.descriptor)
    }

    pub fn descriptor(&self, index: ColumnIndex) -> Option<&ColumnDescriptor> {
        self.slots.get(index.index()).map(|s| &s.descriptor)
    }

    /// Read the next chunk of column `index` into its buffer.
    pub fn get_next_chunk(&mut self, index: ColumnIndex) -> Result<&[u8]> {
        if self.closed {
            return Err(Error::ClosedHandle);
        }
        let total_rows = self.total_rows;
        let slot = self
            .slots
            .get_mut(index.index())
            .ok_or_else(|| Error::Invariant(format!("no column at {index}")))?;
        let source = slot.source.as_mut().ok_or(Error::ClosedHandle)?;
        let chunk_size = slot.descriptor.chunk_size;
        debug!(
            column = %slot.descriptor.column,
            from_row = slot.chunk.fetch_cursor(),
            chunk_size,
            "fetching chunk"
        );
        slot.chunk.fill(source.as_mut(), total_rows, chunk_size)
    }

    /// Restart every column at row 0.
    pub fn rewind(&mut self) -> Result<()> {
        if self.closed {
            return Err(Error::ClosedHandle);
        }
        self.slots.iter_mut().for_each(|s| s.chunk.rewind());
        Ok(())
    }

    /// Release every column and the store. A second close is an error.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Err(Error::ClosedHandle);
        }
        self.closed = true;
        for slot in &mut self.slots {
            slot.source = None;
            slot.chunk.release();
        }
        self.store.close()?;
        info!(store = self.store.location(), "column store closed");
        Ok(())
    }

    pub(crate) fn slot(&self, index: usize) -> Result<&ColumnSlot> {
        if self.closed {
            return Err(Error::ClosedHandle);
        }
        self.slots
            .get(index)
            .ok_or_else(|| Error::Invariant(format!("no column at index {index}")))
    }

    pub(crate) fn slots(&self) -> &[ColumnSlot] {
        &self.slots
    }
}

impl Drop for ColumnStoreHandle {
    fn drop(&mut self) {
        if !self.closed {
            if let Err(e) = self.close() {
                warn!(error = %e, "closing column store on drop");
            }
        }
    }
}

fn bind_columns(
    store: &mut dyn ColumnStore,
    mapping: &SchemaMapping,
    fallback_chunk_size: u64,
) -> Result<(Vec<ColumnSlot>, u64)> {
    if mapping.is_empty() {
        return Err(Error::Config(
            "'dimensions' must map at least one field".into(),
        ));
    }
    if fallback_chunk_size == 0 {
        return Err(Error::Config("fallback chunk size must be positive".into()));
    }

    let mut slots = Vec::with_capacity(mapping.len());
    let mut total_rows: Option<u64> = None;

    for (name, column) in mapping.iter() {
        info!(field = name, column, "opening column");
        let source = store.open_column(column)?;

        let rows = source.len();
        match total_rows {
            None => total_rows = Some(rows),
            Some(expected) if expected != rows => {
                return Err(Error::SchemaMismatch {
                    column: column.to_string(),
                    expected,
                    found: rows,
                });
            }
            Some(_) => {}
        }

        let (chunk_size, chunk_source) = match source.chunking() {
            Chunking::Contiguous => {
                warn!(
                    column,
                    fallback_chunk_size, "column is not chunked; using the fallback chunk size"
                );
                (fallback_chunk_size, ChunkSource::Fallback)
            }
            Chunking::Chunked(dims) if dims.len() != 1 => {
                return Err(Error::Dimensionality {
                    column: column.to_string(),
                    dims: dims.len(),
                });
            }
            Chunking::Chunked(dims) => (dims[0], ChunkSource::Native),
        };

        let element = source.element_type();
        let data_type = element.resolve(column)?;
        let descriptor = ColumnDescriptor::new(
            name,
            column,
            data_type,
            element.byte_order,
            chunk_size,
            chunk_source,
        )?;
        info!(
            field = name,
            column,
            data_type = %data_type,
            chunk_size,
            rows,
            "column bound"
        );

        // No selection ever exceeds the column length, so the buffer never
        // needs more than that many elements.
        let capacity = chunk_size.min(rows) as usize;
        let chunk = ChunkBuffer::new(capacity, descriptor.element_size);
        slots.push(ColumnSlot {
            descriptor,
            source: Some(source),
            chunk,
        });
    }

    Ok((slots, total_rows.unwrap_or(0)))
}
