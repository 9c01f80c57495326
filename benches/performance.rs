use criterion::{criterion_group, criterion_main, Criterion};
use colstream_core::prelude::*;
use colstream_io::memory_store::{MemoryColumn, MemoryColumnStore};
use colstream_io::store::Chunking;
use colstream_reader::{ColumnReader, RowRecord};

const ROWS: usize = 100_000;

fn make_columns() -> Vec<(&'static str, MemoryColumn)> {
    let xs: Vec<Scalar> = (0..ROWS).map(|i| Scalar::F64(i as f64 * 0.01)).collect();
    let ids: Vec<Scalar> = (0..ROWS).map(|i| Scalar::U32(i as u32)).collect();
    let x = MemoryColumn::from_scalars(
        DataType::Float64,
        ByteOrder::Little,
        Chunking::Chunked(vec![4096]),
        &xs,
    )
    .unwrap();
    let id = MemoryColumn::from_scalars(DataType::UInt32, ByteOrder::Big, Chunking::Contiguous, &ids)
        .unwrap();
    vec![("/x", x), ("/id", id)]
}

// Closing a reader closes its store, so every iteration gets a fresh one.
// Column bytes are shared, not copied.
fn open(columns: &[(&'static str, MemoryColumn)]) -> ColumnReader {
    let store = MemoryColumnStore::new();
    for (id, column) in columns {
        store.insert(*id, column.clone());
    }
    let config =
        ReaderConfig::new(SchemaMapping::from_pairs([("x", "/x"), ("id", "/id")]).unwrap());
    ColumnReader::initialize(Box::new(store), &config, &mut RowBatch::new()).unwrap()
}

fn bench_pull(c: &mut Criterion) {
    let columns = make_columns();
    c.bench_function("pull_100k_rows", |b| {
        b.iter(|| {
            let mut reader = open(&columns);
            let mut rec = RowRecord::new();
            let mut n = 0u64;
            while reader.pull(&mut rec).unwrap() {
                n += 1;
            }
            n
        })
    });
}

fn bench_bulk(c: &mut Criterion) {
    let columns = make_columns();
    c.bench_function("bulk_100k_rows", |b| {
        b.iter(|| {
            let mut reader = open(&columns);
            reader
                .read_all()
                .unwrap()
                .iter()
                .map(|batch| batch.num_rows())
                .sum::<usize>()
        })
    });
}

criterion_group!(benches, bench_pull, bench_bulk);
criterion_main!(benches);
