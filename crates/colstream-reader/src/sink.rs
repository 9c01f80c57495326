//! Where decoded values go.
//!
//! A `FieldLayout` hands out a `FieldId` per logical field at setup; a
//! `RowSink` receives `(field, row, value)` writes while streaming. `RowBatch`
//! is both, and `RowRecord` is a single-row sink for pull mode.

use colstream_core::error::{Error, Result};
use colstream_core::id::FieldId;
use colstream_core::schema::DataType;
use colstream_core::types::{RowBatch, Scalar};

pub trait FieldLayout {
    /// Register (or look up) a field and return its id.
    fn register_field(&mut self, name: &str, data_type: DataType) -> Result<FieldId>;
}

pub trait RowSink {
    /// Rows the sink already holds for `fields`. Bulk reads append after
    /// them; columns outside `fields` do not count.
    fn row_count(&self, fields: &[FieldId]) -> u64;

    fn set_field(&mut self, field: FieldId, row: u64, value: Scalar) -> Result<()>;
}

impl FieldLayout for RowBatch {
    fn register_field(&mut self, name: &str, data_type: DataType) -> Result<FieldId> {
        let idx = self.register_column(name, data_type)?;
        Ok(FieldId::new(idx as u32))
    }
}

impl RowSink for RowBatch {
    fn row_count(&self, fields: &[FieldId]) -> u64 {
        fields
            .iter()
            .map(|f| self.columns.get(f.index()).map_or(0, |c| c.len()))
            .min()
            .unwrap_or(0) as u64
    }

    fn set_field(&mut self, field: FieldId, row: u64, value: Scalar) -> Result<()> {
        self.set_value(field.index(), row, value)
    }
}

/// One materialized row, indexed by `FieldId`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowRecord {
    row: Option<u64>,
    values: Vec<Option<Scalar>>,
}

impl RowRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Absolute row index of the last write.
    pub fn row(&self) -> Option<u64> {
        self.row
    }

    pub fn get(&self, field: FieldId) -> Option<Scalar> {
        self.values.get(field.index()).copied().flatten()
    }

    pub fn values(&self) -> impl Iterator<Item = Option<Scalar>> + '_ {
        self.values.iter().copied()
    }

    pub fn clear(&mut self) {
        self.row = None;
        self.values.iter_mut().for_each(|v| *v = None);
    }
}

impl RowSink for RowRecord {
    fn row_count(&self, _fields: &[FieldId]) -> u64 {
        u64::from(self.row.is_some())
    }

    fn set_field(&mut self, field: FieldId, row: u64, value: Scalar) -> Result<()> {
        let idx = field.index();
        if self.values.len() <= idx {
            self.values.resize(idx + 1, None);
        }
        self.values[idx] = Some(value);
        self.row = Some(row);
        Ok(())
    }
}

/// Routes writes into a batch whose columns follow reader field order,
/// whatever ids the caller's layout handed out.
pub(crate) struct BatchSink<'a> {
    pub batch: &'a mut RowBatch,
    pub fields: &'a [FieldId],
    /// Absolute row that lands at batch row 0.
    pub base_row: u64,
}

impl RowSink for BatchSink<'_> {
    fn row_count(&self, _fields: &[FieldId]) -> u64 {
        self.batch.num_rows() as u64
    }

    fn set_field(&mut self, field: FieldId, row: u64, value: Scalar) -> Result<()> {
        let col = self
            .fields
            .iter()
            .position(|f| *f == field)
            .ok_or_else(|| Error::Invariant(format!("{field} is not bound to this batch")))?;
        let local = row.checked_sub(self.base_row).ok_or_else(|| {
            Error::Invariant(format!("row {row} precedes batch start {}", self.base_row))
        })?;
        self.batch.set_value(col, local, value)
    }
}
