//! Synthetic column stores shared by the integration tests.
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use colstream_core::prelude::*;
use colstream_io::dir_store::{DirColumnEntry, DirManifest, MANIFEST_FILE};
use colstream_io::memory_store::{MemoryColumn, MemoryColumnStore};
use colstream_io::store::Chunking;

/// Encode `values` as a column of `data_type`.
pub fn column(
    data_type: DataType,
    order: ByteOrder,
    chunking: Chunking,
    values: &[Scalar],
) -> MemoryColumn {
    MemoryColumn::from_scalars(data_type, order, chunking, values).expect("column values")
}

pub fn f64_values(len: usize) -> Vec<Scalar> {
    (0..len).map(|i| Scalar::F64(i as f64 * 0.5)).collect()
}

pub fn i32_values(len: usize) -> Vec<Scalar> {
    (0..len).map(|i| Scalar::I32(100 - i as i32)).collect()
}

/// `/data/x` (f64, little-endian) and `/data/y` (i32, big-endian), both
/// `len` rows and chunked by `chunk`.
pub fn xy_store(len: usize, chunk: u64) -> MemoryColumnStore {
    let store = MemoryColumnStore::new();
    store.insert(
        "/data/x",
        column(
            DataType::Float64,
            ByteOrder::Little,
            Chunking::Chunked(vec![chunk]),
            &f64_values(len),
        ),
    );
    store.insert(
        "/data/y",
        column(
            DataType::Int32,
            ByteOrder::Big,
            Chunking::Chunked(vec![chunk]),
            &i32_values(len),
        ),
    );
    store
}

pub fn xy_config() -> ReaderConfig {
    ReaderConfig::new(
        SchemaMapping::from_json_str(r#"{"x": "/data/x", "y": "/data/y"}"#).expect("mapping"),
    )
}

pub fn temp_dir(name: &str) -> PathBuf {
    let mut dir = std::env::temp_dir();
    dir.push(format!("colstream-tests-{name}-{}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

pub struct DirColumn<'a> {
    pub id: &'a str,
    pub file: &'a str,
    pub data_type: DataType,
    pub order: ByteOrder,
    pub chunks: Option<Vec<u64>>,
    pub values: Vec<Scalar>,
}

/// Write raw column files plus a manifest with blake3 digests.
pub fn write_dir_store(dir: &Path, columns: Vec<DirColumn<'_>>) {
    let mut manifest = BTreeMap::new();
    for c in columns {
        let mut bytes = Vec::new();
        for v in &c.values {
            v.write_bytes(c.order, &mut bytes);
        }
        fs::write(dir.join(c.file), &bytes).expect("write column file");
        manifest.insert(
            c.id.to_string(),
            DirColumnEntry {
                file: c.file.to_string(),
                element: ElementType::from_data_type(c.data_type, c.order),
                length: c.values.len() as u64,
                chunks: c.chunks,
                blake3: Some(blake3_hex(&bytes)),
            },
        );
    }
    let manifest = DirManifest { columns: manifest };
    fs::write(
        dir.join(MANIFEST_FILE),
        serde_json::to_vec_pretty(&manifest).expect("manifest json"),
    )
    .expect("write manifest");
}

fn blake3_hex(bytes: &[u8]) -> String {
    colstream_core::hash::hash_bytes(bytes).to_hex()
}
