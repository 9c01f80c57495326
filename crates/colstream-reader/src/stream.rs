//! Stream driver: bulk and single-record pull consumption over one shared
//! row cursor.
//!
//! ```text
//! initialize ──> Ready ──read/pull──> Streaming ──done──> Closed
//!                  ^                      │
//!                  └──────── ready ───────┘
//! ```
//! Bulk reads and pulls can be interleaved; both advance the same cursor and
//! share each column's chunk buffer, so switching modes never re-reads data.

use serde::Serialize;
use tracing::{debug, info};

use colstream_core::config::ReaderConfig;
use colstream_core::error::{Error, Result};
use colstream_core::id::FieldId;
use colstream_core::schema::{ColumnDescriptor, Field, Schema};
use colstream_core::types::RowBatch;
use colstream_io::store::{open_store, ColumnStore};

use crate::handle::ColumnStoreHandle;
use crate::materializer::RowMaterializer;
use crate::sink::{BatchSink, FieldLayout, RowSink};
use crate::stats::{ColumnStats, ReadStats};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StreamState {
    Ready,
    Streaming,
    Closed,
}

#[derive(Debug)]
pub struct ColumnReader {
    materializer: RowMaterializer,
    cursor: u64,
    state: StreamState,
    rows_materialized: u64,
    batch_size: u64,
}

impl ColumnReader {
    /// Open `config.store` and bind it, registering every field in `layout`.
    pub fn open(config: &ReaderConfig, layout: &mut dyn FieldLayout) -> Result<Self> {
        config.validate()?;
        let store = open_store(config.store_location()?)?;
        Self::initialize(store, config, layout)
    }

    /// Bind an already opened store.
    pub fn initialize(
        store: Box<dyn ColumnStore>,
        config: &ReaderConfig,
        layout: &mut dyn FieldLayout,
    ) -> Result<Self> {
        let handle =
            ColumnStoreHandle::initialize(store, &config.dimensions, config.fallback_chunk_size)?;

        // Dropping the handle on a registration failure closes the store.
        let fields = handle
            .descriptors()
            .map(|d| layout.register_field(&d.name, d.data_type))
            .collect::<Result<Vec<FieldId>>>()?;

        Ok(Self {
            materializer: RowMaterializer::new(handle, fields)?,
            cursor: 0,
            state: StreamState::Ready,
            rows_materialized: 0,
            batch_size: config.batch_size.max(1),
        })
    }

    /// Start a fresh pass: cursor and every column rewind to row 0.
    pub fn ready(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.materializer.handle_mut().rewind()?;
        self.cursor = 0;
        self.state = StreamState::Ready;
        Ok(())
    }

    /// Materialize up to `count` rows into `sink`, appended after the rows
    /// it already holds in this reader's fields. Returns the number of rows
    /// written.
    pub fn read(&mut self, sink: &mut dyn RowSink, count: u64) -> Result<u64> {
        self.ensure_open()?;
        let n = count.min(self.remaining());
        let base = sink.row_count(self.materializer.fields());
        self.state = StreamState::Streaming;
        for i in 0..n {
            self.materializer
                .materialize_row(self.cursor, base + i, sink)?;
            self.cursor += 1;
            self.rows_materialized += 1;
        }
        debug!(rows = n, cursor = self.cursor, "bulk read");
        Ok(n)
    }

    /// Materialize the row at the cursor into `record`.
    ///
    /// Returns `false` once every row has been produced; the record is then
    /// left untouched.
    pub fn pull(&mut self, record: &mut dyn RowSink) -> Result<bool> {
        self.ensure_open()?;
        if self.cursor >= self.total_rows() {
            return Ok(false);
        }
        self.state = StreamState::Streaming;
        self.materializer
            .materialize_row(self.cursor, self.cursor, record)?;
        self.cursor += 1;
        self.rows_materialized += 1;
        Ok(true)
    }

    /// Up to `max_rows` rows as a batch in field order, or `None` at the end.
    pub fn next_batch(&mut self, max_rows: u64) -> Result<Option<RowBatch>> {
        self.ensure_open()?;
        if self.remaining() == 0 {
            return Ok(None);
        }
        let schema = self.schema();
        let mut batch = RowBatch::with_schema(&schema);
        let fields = self.materializer.fields().to_vec();
        let n = max_rows.min(self.remaining());
        self.state = StreamState::Streaming;
        let base_row = self.cursor;
        let mut sink = BatchSink {
            batch: &mut batch,
            fields: &fields,
            base_row,
        };
        for _ in 0..n {
            self.materializer
                .materialize_row(self.cursor, self.cursor, &mut sink)?;
            self.cursor += 1;
            self.rows_materialized += 1;
        }
        Ok(Some(batch))
    }

    /// Drain the remaining rows in batches of the configured batch size.
    pub fn read_all(&mut self) -> Result<Vec<RowBatch>> {
        let mut batches = Vec::new();
        while let Some(batch) = self.next_batch(self.batch_size)? {
            batches.push(batch);
        }
        Ok(batches)
    }

    /// Iterator over the remaining rows in batches of `batch_size`.
    pub fn batches(&mut self) -> Batches<'_> {
        let size = self.batch_size;
        Batches {
            reader: self,
            size,
            failed: false,
        }
    }

    /// Close the store. The reader only answers diagnostics afterwards.
    pub fn done(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.state = StreamState::Closed;
        self.stats().emit();
        self.materializer.handle_mut().close()?;
        info!(rows = self.rows_materialized, "reader done");
        Ok(())
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    pub fn total_rows(&self) -> u64 {
        self.materializer.handle().total_rows()
    }

    pub fn remaining(&self) -> u64 {
        self.total_rows().saturating_sub(self.cursor)
    }

    pub fn batch_size(&self) -> u64 {
        self.batch_size
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &ColumnDescriptor> + '_ {
        self.materializer.handle().descriptors()
    }

    /// Field ids in column order, as handed out by the layout.
    pub fn fields(&self) -> &[FieldId] {
        self.materializer.fields()
    }

    /// Fields in column order.
    pub fn schema(&self) -> Schema {
        Schema::new(
            self.descriptors()
                .map(|d| Field::new(d.name.clone(), d.data_type))
                .collect(),
        )
    }

    pub fn stats(&self) -> ReadStats {
        let refills = self.materializer.refills();
        ReadStats {
            total_rows: self.total_rows(),
            rows_materialized: self.rows_materialized,
            cursor: self.cursor,
            columns: self
                .descriptors()
                .zip(refills)
                .map(|(d, refills)| ColumnStats {
                    name: d.name.clone(),
                    column: d.column.clone(),
                    chunk_size: d.chunk_size,
                    chunk_source: d.chunk_source,
                    refills,
                })
                .collect(),
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.state == StreamState::Closed {
            return Err(Error::ClosedHandle);
        }
        Ok(())
    }
}

/// See [`ColumnReader::batches`]. Stops after the first error.
pub struct Batches<'a> {
    reader: &'a mut ColumnReader,
    size: u64,
    failed: bool,
}

impl Iterator for Batches<'_> {
    type Item = Result<RowBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.reader.next_batch(self.size) {
            Ok(batch) => batch.map(Ok),
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}
