//! Streaming NDJSON writer.

use std::fs::File;
use std::io::{BufWriter, Write};

use colstream_core::error::{Error, Result};
use colstream_core::types::{RowBatch, Scalar};

pub struct JsonlWriter<W: Write> {
    writer: BufWriter<W>,
    // header order to keep column ordering stable across batches
    columns: Vec<String>,
    rows_written: u64,
}

impl JsonlWriter<File> {
    pub fn to_path(path: &str, columns: Option<Vec<String>>) -> Result<Self> {
        let f = File::create(path).map_err(|e| Error::Io {
            column: path.to_string(),
            reason: format!("create: {e}"),
        })?;
        Ok(Self::to_writer(f, columns))
    }
}

impl<W: Write> JsonlWriter<W> {
    pub fn to_writer(writer: W, columns: Option<Vec<String>>) -> Self {
        Self {
            writer: BufWriter::new(writer),
            columns: columns.unwrap_or_default(),
            rows_written: 0,
        }
    }

    /// Write a batch as one JSON object per line.
    /// If `columns` was empty, infer it from the first batch.
    pub fn write_batch(&mut self, batch: &RowBatch) -> Result<()> {
        if self.columns.is_empty() {
            self.columns = batch.columns.iter().map(|c| c.name.clone()).collect();
        }
        let nrows = batch.num_rows();
        for r in 0..nrows {
            let mut obj = serde_json::Map::new();
            for name in &self.columns {
                if let Some(val) = batch.column(name).and_then(|c| c.values.get(r)) {
                    obj.insert(name.clone(), scalar_to_json(val));
                }
            }
            let line = serde_json::to_string(&obj)?;
            writeln!(self.writer, "{}", line).map_err(write_err)?;
        }
        self.rows_written += nrows as u64;
        self.writer.flush().map_err(write_err)?;
        Ok(())
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| write_err(e.into_error()))
    }
}

fn write_err(e: std::io::Error) -> Error {
    Error::Io {
        column: "<jsonl output>".into(),
        reason: e.to_string(),
    }
}

fn scalar_to_json(v: &Scalar) -> serde_json::Value {
    use Scalar::*;
    match *v {
        I8(i) => serde_json::Value::from(i),
        I16(i) => serde_json::Value::from(i),
        I32(i) => serde_json::Value::from(i),
        I64(i) => serde_json::Value::from(i),
        U8(u) => serde_json::Value::from(u),
        U16(u) => serde_json::Value::from(u),
        U32(u) => serde_json::Value::from(u),
        U64(u) => serde_json::Value::from(u),
        // NaN/inf have no JSON form and become null.
        F32(f) => serde_json::Value::from(f as f64),
        F64(f) => serde_json::Value::from(f),
    }
}
