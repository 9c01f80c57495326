//! Decoded element values and a minimal columnar row batch.
//!
//! `Scalar` is what the reader hands to sinks: one decoded element, with the
//! variant carrying its data type. `RowBatch` is the default bulk container.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::hash::{Hash256, RowDigest};
use crate::schema::{ByteOrder, DataType, Field, Schema};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Scalar {
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
}

fn take<const N: usize>(bytes: &[u8]) -> Result<[u8; N]> {
    bytes
        .get(..N)
        .and_then(|b| b.try_into().ok())
        .ok_or_else(|| {
            Error::Invariant(format!(
                "need {N} bytes to decode an element, got {}",
                bytes.len()
            ))
        })
}

macro_rules! decode_as {
    ($ty:ty, $order:expr, $bytes:expr) => {{
        let raw = take::<{ std::mem::size_of::<$ty>() }>($bytes)?;
        match $order {
            ByteOrder::Little => <$ty>::from_le_bytes(raw),
            ByteOrder::Big => <$ty>::from_be_bytes(raw),
        }
    }};
}

impl Scalar {
    pub fn data_type(&self) -> DataType {
        match self {
            Scalar::I8(_) => DataType::Int8,
            Scalar::I16(_) => DataType::Int16,
            Scalar::I32(_) => DataType::Int32,
            Scalar::I64(_) => DataType::Int64,
            Scalar::U8(_) => DataType::UInt8,
            Scalar::U16(_) => DataType::UInt16,
            Scalar::U32(_) => DataType::UInt32,
            Scalar::U64(_) => DataType::UInt64,
            Scalar::F32(_) => DataType::Float32,
            Scalar::F64(_) => DataType::Float64,
        }
    }

    /// Decode one element from the front of `bytes`.
    #[inline]
    pub fn decode(data_type: DataType, order: ByteOrder, bytes: &[u8]) -> Result<Scalar> {
        Ok(match data_type {
            DataType::Int8 => Scalar::I8(decode_as!(i8, order, bytes)),
            DataType::Int16 => Scalar::I16(decode_as!(i16, order, bytes)),
            DataType::Int32 => Scalar::I32(decode_as!(i32, order, bytes)),
            DataType::Int64 => Scalar::I64(decode_as!(i64, order, bytes)),
            DataType::UInt8 => Scalar::U8(decode_as!(u8, order, bytes)),
            DataType::UInt16 => Scalar::U16(decode_as!(u16, order, bytes)),
            DataType::UInt32 => Scalar::U32(decode_as!(u32, order, bytes)),
            DataType::UInt64 => Scalar::U64(decode_as!(u64, order, bytes)),
            DataType::Float32 => Scalar::F32(decode_as!(f32, order, bytes)),
            DataType::Float64 => Scalar::F64(decode_as!(f64, order, bytes)),
        })
    }

    /// Append the value's raw bytes in the given order.
    pub fn write_bytes(&self, order: ByteOrder, out: &mut Vec<u8>) {
        macro_rules! put {
            ($v:expr) => {
                match order {
                    ByteOrder::Little => out.extend_from_slice(&$v.to_le_bytes()),
                    ByteOrder::Big => out.extend_from_slice(&$v.to_be_bytes()),
                }
            };
        }
        match self {
            Scalar::I8(v) => put!(v),
            Scalar::I16(v) => put!(v),
            Scalar::I32(v) => put!(v),
            Scalar::I64(v) => put!(v),
            Scalar::U8(v) => put!(v),
            Scalar::U16(v) => put!(v),
            Scalar::U32(v) => put!(v),
            Scalar::U64(v) => put!(v),
            Scalar::F32(v) => put!(v),
            Scalar::F64(v) => put!(v),
        }
    }

    /// Raw bytes in native order, as a downstream raw-pointer sink expects.
    pub fn to_ne_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.data_type().byte_width());
        self.write_bytes(ByteOrder::native(), &mut out);
        out
    }

    /// Lossy widening, handy for printing and aggregate checks.
    pub fn as_f64(&self) -> f64 {
        match *self {
            Scalar::I8(v) => v as f64,
            Scalar::I16(v) => v as f64,
            Scalar::I32(v) => v as f64,
            Scalar::I64(v) => v as f64,
            Scalar::U8(v) => v as f64,
            Scalar::U16(v) => v as f64,
            Scalar::U32(v) => v as f64,
            Scalar::U64(v) => v as f64,
            Scalar::F32(v) => v as f64,
            Scalar::F64(v) => v,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data_type: DataType,
    pub values: Vec<Scalar>,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            values: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Columnar batch of decoded rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RowBatch {
    pub columns: Vec<Column>,
}

impl RowBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty batch with one column per schema field.
    pub fn with_schema(schema: &Schema) -> Self {
        Self {
            columns: schema
                .fields
                .iter()
                .map(|f| Column::new(f.name.clone(), f.data_type))
                .collect(),
        }
    }

    pub fn schema(&self) -> Schema {
        Schema::new(
            self.columns
                .iter()
                .map(|c| Field::new(c.name.clone(), c.data_type))
                .collect(),
        )
    }

    pub fn num_rows(&self) -> usize {
        self.columns.first().map(|c| c.len()).unwrap_or(0)
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Index of `name`, adding an empty column when it is new.
    ///
    /// An existing column must agree on the data type.
    pub fn register_column(&mut self, name: &str, data_type: DataType) -> Result<usize> {
        if let Some(idx) = self.columns.iter().position(|c| c.name == name) {
            let existing = self.columns[idx].data_type;
            if existing != data_type {
                return Err(Error::Config(format!(
                    "field '{name}' is already registered as {existing}, not {data_type}"
                )));
            }
            return Ok(idx);
        }
        self.columns.push(Column::new(name, data_type));
        Ok(self.columns.len() - 1)
    }

    /// Write `value` at `row` of column `col`: appends at the end, overwrites
    /// below it. Leaving a gap is an error.
    pub fn set_value(&mut self, col: usize, row: u64, value: Scalar) -> Result<()> {
        let column = self
            .columns
            .get_mut(col)
            .ok_or_else(|| Error::Invariant(format!("no column at index {col}")))?;
        if value.data_type() != column.data_type {
            return Err(Error::Invariant(format!(
                "column '{}' holds {}, got a {} value",
                column.name,
                column.data_type,
                value.data_type()
            )));
        }
        let row = row as usize;
        match row.cmp(&column.values.len()) {
            std::cmp::Ordering::Less => column.values[row] = value,
            std::cmp::Ordering::Equal => column.values.push(value),
            std::cmp::Ordering::Greater => {
                return Err(Error::Invariant(format!(
                    "row {row} would leave a gap in column '{}' of length {}",
                    column.name,
                    column.values.len()
                )))
            }
        }
        Ok(())
    }

    /// Values of one row across all columns.
    pub fn row(&self, row: usize) -> Option<Vec<Scalar>> {
        self.columns
            .iter()
            .map(|c| c.values.get(row).copied())
            .collect()
    }

    /// Order-sensitive digest of every value in row-major order.
    pub fn content_hash(&self) -> Hash256 {
        let mut digest = RowDigest::new();
        for r in 0..self.num_rows() {
            for c in &self.columns {
                if let Some(v) = c.values.get(r) {
                    digest.update(v);
                }
            }
        }
        digest.finalize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_honours_byte_order() {
        let le = 0x0102_0304i32.to_le_bytes();
        let be = 0x0102_0304i32.to_be_bytes();
        assert_eq!(
            Scalar::decode(DataType::Int32, ByteOrder::Little, &le).unwrap(),
            Scalar::I32(0x0102_0304)
        );
        assert_eq!(
            Scalar::decode(DataType::Int32, ByteOrder::Big, &be).unwrap(),
            Scalar::I32(0x0102_0304)
        );
    }

    #[test]
    fn decode_signed_and_float() {
        let bytes = (-2i16).to_be_bytes();
        assert_eq!(
            Scalar::decode(DataType::Int16, ByteOrder::Big, &bytes).unwrap(),
            Scalar::I16(-2)
        );
        let bytes = 0xfffeu16.to_be_bytes();
        assert_eq!(
            Scalar::decode(DataType::UInt16, ByteOrder::Big, &bytes).unwrap(),
            Scalar::U16(0xfffe)
        );
        let bytes = 2.5f64.to_le_bytes();
        assert_eq!(
            Scalar::decode(DataType::Float64, ByteOrder::Little, &bytes).unwrap(),
            Scalar::F64(2.5)
        );
    }

    #[test]
    fn decode_short_slice_is_an_invariant_error() {
        let err = Scalar::decode(DataType::UInt64, ByteOrder::Little, &[1, 2, 3]).unwrap_err();
        assert!(matches!(err, Error::Invariant(_)));
    }

    #[test]
    fn write_bytes_matches_decode() {
        let v = Scalar::U32(0xdead_beef);
        let mut out = Vec::new();
        v.write_bytes(ByteOrder::Big, &mut out);
        assert_eq!(out, vec![0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(v.to_ne_bytes(), 0xdead_beefu32.to_ne_bytes().to_vec());
    }

    #[test]
    fn set_value_appends_overwrites_and_rejects_gaps() {
        let mut batch = RowBatch::new();
        let x = batch.register_column("x", DataType::Int64).unwrap();
        assert_eq!(batch.register_column("x", DataType::Int64).unwrap(), x);
        assert!(batch.register_column("x", DataType::Float32).is_err());

        batch.set_value(x, 0, Scalar::I64(1)).unwrap();
        batch.set_value(x, 1, Scalar::I64(2)).unwrap();
        batch.set_value(x, 0, Scalar::I64(9)).unwrap();
        assert_eq!(batch.columns[x].values, vec![Scalar::I64(9), Scalar::I64(2)]);

        assert!(batch.set_value(x, 5, Scalar::I64(0)).is_err());
        assert!(batch.set_value(x, 2, Scalar::F32(0.0)).is_err());
    }

    #[test]
    fn content_hash_is_order_sensitive() {
        let mut a = RowBatch::new();
        let c = a.register_column("v", DataType::UInt8).unwrap();
        a.set_value(c, 0, Scalar::U8(1)).unwrap();
        a.set_value(c, 1, Scalar::U8(2)).unwrap();

        let mut b = a.clone();
        b.set_value(c, 0, Scalar::U8(2)).unwrap();
        b.set_value(c, 1, Scalar::U8(1)).unwrap();

        assert_eq!(a.content_hash(), a.clone().content_hash());
        assert_ne!(a.content_hash(), b.content_hash());
    }
}
