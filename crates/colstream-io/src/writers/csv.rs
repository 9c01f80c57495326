//! Streaming CSV writer. The header row is written once, before the first batch.

use std::io::Write;

use colstream_core::error::{Error, Result};
use colstream_core::types::{RowBatch, Scalar};

pub struct CsvWriter<W: Write> {
    writer: csv::Writer<W>,
    columns: Vec<String>,
    header_written: bool,
}

impl<W: Write> CsvWriter<W> {
    pub fn to_writer(writer: W, columns: Option<Vec<String>>) -> Self {
        Self {
            writer: csv::Writer::from_writer(writer),
            columns: columns.unwrap_or_default(),
            header_written: false,
        }
    }

    pub fn write_batch(&mut self, batch: &RowBatch) -> Result<()> {
        if self.columns.is_empty() {
            self.columns = batch.columns.iter().map(|c| c.name.clone()).collect();
        }
        if !self.header_written {
            self.writer.write_record(&self.columns).map_err(csv_err)?;
            self.header_written = true;
        }

        let cols: Vec<_> = self.columns.iter().map(|n| batch.column(n)).collect();
        let mut record = Vec::with_capacity(cols.len());
        for r in 0..batch.num_rows() {
            record.clear();
            for col in &cols {
                record.push(
                    col.and_then(|c| c.values.get(r))
                        .map(scalar_to_field)
                        .unwrap_or_default(),
                );
            }
            self.writer.write_record(&record).map_err(csv_err)?;
        }
        self.writer.flush().map_err(|e| csv_err(e.into()))?;
        Ok(())
    }
}

fn csv_err(e: csv::Error) -> Error {
    Error::Io {
        column: "<csv output>".into(),
        reason: e.to_string(),
    }
}

fn scalar_to_field(v: &Scalar) -> String {
    match *v {
        Scalar::I8(i) => i.to_string(),
        Scalar::I16(i) => i.to_string(),
        Scalar::I32(i) => i.to_string(),
        Scalar::I64(i) => i.to_string(),
        Scalar::U8(u) => u.to_string(),
        Scalar::U16(u) => u.to_string(),
        Scalar::U32(u) => u.to_string(),
        Scalar::U64(u) => u.to_string(),
        Scalar::F32(f) => f.to_string(),
        Scalar::F64(f) => f.to_string(),
    }
}
