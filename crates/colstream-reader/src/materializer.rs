//! Row materializer: decodes one row across every bound column, refilling a
//! column's chunk buffer when the row crosses into its next chunk.

use tracing::trace;

use colstream_core::error::{Error, Result};
use colstream_core::id::{ColumnIndex, FieldId};
use colstream_core::types::Scalar;

use crate::handle::ColumnStoreHandle;
use crate::sink::RowSink;

#[derive(Debug)]
pub struct RowMaterializer {
    handle: ColumnStoreHandle,
    /// Field id of each column, in handle order.
    fields: Vec<FieldId>,
    /// Decoded values of the row in progress.
    scratch: Vec<Scalar>,
}

impl RowMaterializer {
    pub fn new(handle: ColumnStoreHandle, fields: Vec<FieldId>) -> Result<Self> {
        if fields.len() != handle.num_columns() {
            return Err(Error::Invariant(format!(
                "{} field ids for {} columns",
                fields.len(),
                handle.num_columns()
            )));
        }
        let scratch = Vec::with_capacity(fields.len());
        Ok(Self {
            handle,
            fields,
            scratch,
        })
    }

    pub fn handle(&self) -> &ColumnStoreHandle {
        &self.handle
    }

    pub fn handle_mut(&mut self) -> &mut ColumnStoreHandle {
        &mut self.handle
    }

    pub fn fields(&self) -> &[FieldId] {
        &self.fields
    }

    /// Write row `row` of every column into `sink` at `dest_row`.
    ///
    /// A column refills exactly when `row` is a multiple of its chunk size
    /// and that chunk is not already loaded. The refill must start at the
    /// column's fetch cursor; anything else means rows were skipped.
    ///
    /// Every column is decoded before the first write, so a failed refill
    /// leaves `sink` untouched for this row.
    pub fn materialize_row(
        &mut self,
        row: u64,
        dest_row: u64,
        sink: &mut dyn RowSink,
    ) -> Result<()> {
        if self.handle.is_closed() {
            return Err(Error::ClosedHandle);
        }
        if row >= self.handle.total_rows() {
            return Err(Error::Invariant(format!(
                "row {row} is past the end ({} rows)",
                self.handle.total_rows()
            )));
        }

        self.scratch.clear();
        for i in 0..self.fields.len() {
            let slot = self.handle.slot(i)?;
            let chunk_size = slot.descriptor.chunk_size;
            if row % chunk_size == 0 && !slot.chunk.contains(row) {
                let cursor = slot.chunk.fetch_cursor();
                if cursor != row {
                    return Err(Error::Invariant(format!(
                        "column '{}' would refill at row {row} but its fetch cursor is {cursor}",
                        slot.descriptor.column
                    )));
                }
                trace!(column = %slot.descriptor.column, row, "chunk boundary");
                self.handle.get_next_chunk(ColumnIndex::new(i as u32))?;
            }

            let slot = self.handle.slot(i)?;
            let d = &slot.descriptor;
            let value = Scalar::decode(d.data_type, d.byte_order, slot.chunk.element(row)?)?;
            self.scratch.push(value);
        }

        for (field, value) in self.fields.iter().zip(&self.scratch) {
            sink.set_field(*field, dest_row, *value)?;
        }
        Ok(())
    }

    /// Refills performed per column since setup, in handle order.
    pub fn refills(&self) -> Vec<u64> {
        self.handle.slots().iter().map(|s| s.chunk.refills()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use colstream_core::schema::{ByteOrder, DataType, SchemaMapping};
    use colstream_io::memory_store::{MemoryColumn, MemoryColumnStore};
    use colstream_io::store::Chunking;

    use crate::sink::RowRecord;

    fn materializer(chunk: u64) -> (MemoryColumnStore, RowMaterializer) {
        let store = MemoryColumnStore::new();
        let values: Vec<Scalar> = (1..=5).map(Scalar::I32).collect();
        store.insert(
            "/v",
            MemoryColumn::from_scalars(
                DataType::Int32,
                ByteOrder::Big,
                Chunking::Chunked(vec![chunk]),
                &values,
            )
            .unwrap(),
        );
        let mapping = SchemaMapping::from_pairs([("v", "/v")]).unwrap();
        let handle =
            ColumnStoreHandle::initialize(Box::new(store.clone()), &mapping, 1024).unwrap();
        let m = RowMaterializer::new(handle, vec![FieldId::new(0)]).unwrap();
        (store, m)
    }

    #[test]
    fn refills_only_at_chunk_boundaries() {
        let (store, mut m) = materializer(2);
        let mut rec = RowRecord::new();
        for row in 0..5 {
            m.materialize_row(row, row, &mut rec).unwrap();
            assert_eq!(rec.get(FieldId::new(0)), Some(Scalar::I32(row as i32 + 1)));
        }
        let offsets: Vec<u64> = store.reads("/v").iter().map(|r| r.offset).collect();
        assert_eq!(offsets, vec![0, 2, 4]);
        assert_eq!(m.refills(), vec![3]);
    }

    #[test]
    fn skipping_a_chunk_is_an_invariant_error() {
        let (_store, mut m) = materializer(2);
        let mut rec = RowRecord::new();
        m.materialize_row(0, 0, &mut rec).unwrap();
        // Row 2 opens the second chunk; row 4 would skip it.
        assert!(matches!(
            m.materialize_row(4, 4, &mut rec),
            Err(Error::Invariant(_))
        ));
        // Row 3 sits inside a chunk that was never loaded.
        assert!(matches!(
            m.materialize_row(3, 3, &mut rec),
            Err(Error::Invariant(_))
        ));
    }

    #[test]
    fn repeating_a_boundary_row_does_not_reread() {
        let (store, mut m) = materializer(2);
        let mut rec = RowRecord::new();
        m.materialize_row(0, 0, &mut rec).unwrap();
        m.materialize_row(0, 0, &mut rec).unwrap();
        assert_eq!(store.read_count("/v"), 1);
    }

    #[test]
    fn rows_past_the_end_are_rejected() {
        let (_store, mut m) = materializer(2);
        let mut rec = RowRecord::new();
        assert!(matches!(
            m.materialize_row(5, 0, &mut rec),
            Err(Error::Invariant(_))
        ));
    }

    #[test]
    fn closed_handle_rejects_rows() {
        let (_store, mut m) = materializer(2);
        m.handle_mut().close().unwrap();
        let mut rec = RowRecord::new();
        assert!(matches!(
            m.materialize_row(0, 0, &mut rec),
            Err(Error::ClosedHandle)
        ));
    }
}
