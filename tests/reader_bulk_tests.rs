mod test_data_gen;

use colstream_core::prelude::*;
use colstream_io::memory_store::MemoryColumnStore;
use colstream_reader::{ColumnReader, RowRecord, StreamState};

use test_data_gen::{f64_values, i32_values, xy_config, xy_store};

fn open_xy(len: usize, chunk: u64) -> (MemoryColumnStore, ColumnReader) {
    let store = xy_store(len, chunk);
    let mut layout = RowBatch::new();
    let reader = ColumnReader::initialize(Box::new(store.clone()), &xy_config(), &mut layout)
        .expect("initialize");
    (store, reader)
}

#[test]
fn test_bulk_never_exceeds_the_requested_count() {
    let (_store, mut reader) = open_xy(10, 3);
    let mut batch = RowBatch::with_schema(&reader.schema());

    assert_eq!(reader.read(&mut batch, 4).unwrap(), 4);
    assert_eq!(batch.num_rows(), 4);
    assert_eq!(reader.cursor(), 4);

    assert_eq!(reader.read(&mut batch, 0).unwrap(), 0);
    assert_eq!(batch.num_rows(), 4);

    // Only six rows remain.
    assert_eq!(reader.read(&mut batch, 100).unwrap(), 6);
    assert_eq!(batch.num_rows(), 10);
    assert_eq!(reader.read(&mut batch, 100).unwrap(), 0);

    assert_eq!(batch.column("x").unwrap().values, f64_values(10));
    assert_eq!(batch.column("y").unwrap().values, i32_values(10));
}

#[test]
fn test_bulk_then_pull_share_the_cursor_and_chunks() {
    let (store, mut reader) = open_xy(7, 4);
    let mut batch = RowBatch::with_schema(&reader.schema());
    assert_eq!(reader.read(&mut batch, 3).unwrap(), 3);
    assert_eq!(store.read_count("/data/x"), 1);

    let mut rec = RowRecord::new();
    assert!(reader.pull(&mut rec).unwrap());
    assert_eq!(rec.row(), Some(3));
    assert_eq!(rec.get(FieldId::new(0)), Some(Scalar::F64(1.5)));
    // Row 3 was already in the first chunk.
    assert_eq!(store.read_count("/data/x"), 1);

    assert_eq!(reader.read(&mut batch, 10).unwrap(), 3);
    assert!(!reader.pull(&mut rec).unwrap());
    assert_eq!(store.read_count("/data/x"), 2);
    assert_eq!(store.read_count("/data/y"), 2);
    assert_eq!(batch.num_rows(), 6);
    assert_eq!(reader.stats().rows_materialized, 7);
}

#[test]
fn test_tail_chunk_leaves_fetch_at_total_rows() {
    let (store, mut reader) = open_xy(5, 3);
    let batches = reader.read_all().unwrap();
    let rows: usize = batches.iter().map(|b| b.num_rows()).sum();
    assert_eq!(rows, 5);

    let reads = store.reads("/data/y");
    let last = reads.last().unwrap();
    assert_eq!((last.offset, last.count), (3, 2));
    assert_eq!(last.offset + last.count as u64, reader.total_rows());
    assert_eq!(reader.remaining(), 0);
}

#[test]
fn test_read_all_uses_the_configured_batch_size() {
    let store = xy_store(10, 4);
    let mut config = xy_config();
    config.batch_size = 4;
    let mut layout = RowBatch::new();
    let mut reader = ColumnReader::initialize(Box::new(store), &config, &mut layout).unwrap();

    let sizes: Vec<usize> = reader.read_all().unwrap().iter().map(|b| b.num_rows()).collect();
    assert_eq!(sizes, vec![4, 4, 2]);
}

#[test]
fn test_batches_match_a_full_pull_pass() {
    let (_store, mut reader) = open_xy(9, 2);
    let mut pulled = RowBatch::with_schema(&reader.schema());
    reader.read(&mut pulled, u64::MAX).unwrap();

    reader.ready().unwrap();
    let mut drained = RowBatch::with_schema(&reader.schema());
    for batch in reader.batches() {
        let batch = batch.unwrap();
        for r in 0..batch.num_rows() {
            for (c, v) in batch.row(r).unwrap().into_iter().enumerate() {
                let row = drained.columns[c].values.len() as u64;
                drained.set_value(c, row, v).unwrap();
            }
        }
    }
    assert_eq!(pulled.content_hash(), drained.content_hash());
}

#[test]
fn test_read_failure_propagates_without_advancing() {
    let (store, mut reader) = open_xy(6, 2);
    let mut rec = RowRecord::new();
    assert!(reader.pull(&mut rec).unwrap());
    assert!(reader.pull(&mut rec).unwrap());

    store.fail_reads("/data/y");
    let err = reader.pull(&mut rec).unwrap_err();
    assert!(matches!(err, Error::Io { ref column, .. } if column == "/data/y"), "{err}");
    assert!(!err.is_setup_error());
    assert_eq!(reader.cursor(), 2);
}

#[test]
fn test_failed_bulk_row_leaves_columns_aligned_for_retry() {
    let (store, mut reader) = open_xy(6, 2);
    let mut batch = RowBatch::with_schema(&reader.schema());
    assert_eq!(reader.read(&mut batch, 2).unwrap(), 2);

    // Row 2 refills x first, then fails on y.
    store.fail_reads("/data/y");
    let err = reader.read(&mut batch, 2).unwrap_err();
    assert!(matches!(err, Error::Io { ref column, .. } if column == "/data/y"), "{err}");
    assert_eq!(reader.cursor(), 2);
    assert_eq!(batch.column("x").unwrap().len(), 2);
    assert_eq!(batch.column("y").unwrap().len(), 2);

    store.restore_reads("/data/y");
    assert_eq!(reader.read(&mut batch, 10).unwrap(), 4);
    assert_eq!(batch.column("x").unwrap().values, f64_values(6));
    assert_eq!(batch.column("y").unwrap().values, i32_values(6));
    // x kept the chunk it loaded before the failure.
    assert_eq!(store.read_count("/data/x"), 3);
}

#[test]
fn test_bulk_appends_past_foreign_columns_in_the_layout() {
    let store = xy_store(4, 2);
    let mut layout = RowBatch::new();
    layout.register_column("id", DataType::UInt32).unwrap();
    let mut reader =
        ColumnReader::initialize(Box::new(store.clone()), &xy_config(), &mut layout).unwrap();

    assert_eq!(reader.read(&mut layout, 2).unwrap(), 2);
    assert_eq!(reader.read(&mut layout, 2).unwrap(), 2);
    assert_eq!(layout.column("x").unwrap().values, f64_values(4));
    assert_eq!(layout.column("y").unwrap().values, i32_values(4));
    assert!(layout.column("id").unwrap().values.is_empty());

    // A caller-filled column ahead of the reader's fields does not shift them.
    reader.ready().unwrap();
    let mut layout = RowBatch::new();
    let id = layout.register_column("id", DataType::UInt32).unwrap();
    for row in 0..3 {
        layout.set_value(id, row, Scalar::U32(row as u32)).unwrap();
    }
    let x = layout.register_column("x", DataType::Float64).unwrap();
    let y = layout.register_column("y", DataType::Int32).unwrap();
    assert_eq!((x, y), (1, 2));
    assert_eq!(reader.read(&mut layout, 4).unwrap(), 4);
    assert_eq!(layout.column("x").unwrap().values, f64_values(4));
    assert_eq!(layout.column("id").unwrap().len(), 3);
}

#[test]
fn test_operations_after_done_fail() {
    let (store, mut reader) = open_xy(4, 2);
    let mut batch = RowBatch::with_schema(&reader.schema());
    reader.read(&mut batch, 2).unwrap();
    reader.done().unwrap();

    assert!(store.is_closed());
    assert_eq!(reader.state(), StreamState::Closed);
    assert!(matches!(reader.read(&mut batch, 1), Err(Error::ClosedHandle)));
    assert!(matches!(reader.pull(&mut RowRecord::new()), Err(Error::ClosedHandle)));
    assert!(matches!(reader.ready(), Err(Error::ClosedHandle)));
    assert!(matches!(reader.next_batch(1), Err(Error::ClosedHandle)));
    assert!(matches!(reader.done(), Err(Error::ClosedHandle)));

    // Diagnostics stay available.
    assert_eq!(reader.total_rows(), 4);
    assert_eq!(reader.descriptors().count(), 2);
    assert_eq!(reader.stats().rows_materialized, 2);
}

#[test]
fn test_empty_columns_produce_no_rows() {
    let (store, mut reader) = open_xy(0, 8);
    let mut rec = RowRecord::new();
    assert!(!reader.pull(&mut rec).unwrap());
    assert!(reader.read_all().unwrap().is_empty());
    assert_eq!(store.read_count("/data/x"), 0);
}
