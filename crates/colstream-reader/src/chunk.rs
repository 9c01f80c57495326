//! Per-column chunk buffer: the raw bytes of the most recently fetched chunk
//! plus the absolute row the next fetch starts at.

use colstream_core::error::{Error, Result};
use colstream_io::store::ColumnSource;

#[derive(Debug)]
pub struct ChunkBuffer {
    bytes: Vec<u8>,
    element_size: usize,
    /// First row held in `bytes`.
    start_row: u64,
    /// Rows currently held; 0 when nothing is loaded.
    rows: usize,
    /// Next absolute row to fetch.
    fetch_cursor: u64,
    refills: u64,
}

impl ChunkBuffer {
    /// Buffer able to hold `capacity` elements of `element_size` bytes.
    pub fn new(capacity: usize, element_size: usize) -> Self {
        Self {
            bytes: vec![0u8; capacity * element_size],
            element_size,
            start_row: 0,
            rows: 0,
            fetch_cursor: 0,
            refills: 0,
        }
    }

    pub fn fetch_cursor(&self) -> u64 {
        self.fetch_cursor
    }

    pub fn start_row(&self) -> u64 {
        self.start_row
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn refills(&self) -> u64 {
        self.refills
    }

    pub fn capacity_bytes(&self) -> usize {
        self.bytes.len()
    }

    /// True when `row` is inside the loaded chunk.
    pub fn contains(&self, row: u64) -> bool {
        row >= self.start_row && row < self.start_row + self.rows as u64
    }

    /// Read the next chunk from `source`.
    ///
    /// Reads `min(total_rows - fetch_cursor, chunk_size)` elements and
    /// advances the fetch cursor by the elements actually read, so the
    /// cursor stops at `total_rows` after the tail chunk.
    pub fn fill(
        &mut self,
        source: &mut dyn ColumnSource,
        total_rows: u64,
        chunk_size: u64,
    ) -> Result<&[u8]> {
        let remaining = total_rows.saturating_sub(self.fetch_cursor);
        if remaining == 0 {
            return Err(Error::Invariant(format!(
                "column '{}' has no rows left to fetch at row {}",
                source.id(),
                self.fetch_cursor
            )));
        }
        let selection = remaining.min(chunk_size) as usize;
        let len = selection * self.element_size;
        if len > self.bytes.len() {
            return Err(Error::Invariant(format!(
                "chunk of {selection} elements does not fit a {} byte buffer",
                self.bytes.len()
            )));
        }

        // A failed read must not leave the previous chunk looking valid.
        self.rows = 0;
        source.read_range(self.fetch_cursor, selection, &mut self.bytes[..len])?;

        self.start_row = self.fetch_cursor;
        self.rows = selection;
        self.fetch_cursor += selection as u64;
        self.refills += 1;
        Ok(&self.bytes[..len])
    }

    /// Raw bytes of the element at absolute `row`.
    #[inline]
    pub fn element(&self, row: u64) -> Result<&[u8]> {
        if !self.contains(row) {
            return Err(Error::Invariant(format!(
                "row {row} is outside the loaded chunk [{}, {})",
                self.start_row,
                self.start_row + self.rows as u64
            )));
        }
        let offset = (row - self.start_row) as usize * self.element_size;
        Ok(&self.bytes[offset..offset + self.element_size])
    }

    /// Forget the loaded chunk and start fetching from row 0 again.
    pub fn rewind(&mut self) {
        self.start_row = 0;
        self.rows = 0;
        self.fetch_cursor = 0;
    }

    /// Drop the buffer memory (on close).
    pub fn release(&mut self) {
        self.rewind();
        self.bytes = Vec::new();
    }
}
