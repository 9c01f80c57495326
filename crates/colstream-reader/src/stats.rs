//! Read statistics, reported through `tracing` and available to callers.

use serde::Serialize;

use colstream_core::schema::ChunkSource;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnStats {
    pub name: String,
    pub column: String,
    pub chunk_size: u64,
    pub chunk_source: ChunkSource,
    pub refills: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReadStats {
    pub total_rows: u64,
    /// Rows handed to sinks since setup, across every pass.
    pub rows_materialized: u64,
    /// Row cursor of the current pass.
    pub cursor: u64,
    pub columns: Vec<ColumnStats>,
}

impl ReadStats {
    pub fn total_refills(&self) -> u64 {
        self.columns.iter().map(|c| c.refills).sum()
    }

    pub fn emit(&self) {
        for c in &self.columns {
            tracing::trace!(
                field = %c.name,
                column = %c.column,
                chunk_size = c.chunk_size,
                refills = c.refills,
                "column stats"
            );
        }
        tracing::debug!(
            total_rows = self.total_rows,
            rows_materialized = self.rows_materialized,
            refills = self.total_refills(),
            "read stats"
        );
    }
}
