//! Columnar batch for bulk ingestion.
//!
//! Mirrors an Arrow-style record batch at the logical-schema level:
//! named, typed columns with a shared row count. Column names are fixed
//! (`id`, `embedding`, optional `metadata`); column order is free.

use crate::core::{FloeError, Result};

pub const ID_COLUMN: &str = "id";
pub const EMBEDDING_COLUMN: &str = "embedding";
pub const METADATA_COLUMN: &str = "metadata";

/// Column value arrays.
#[derive(Debug, Clone)]
pub enum ColumnData {
    UInt64(Vec<u64>),
    /// Fixed-size list of f32; `values.len() == rows * list_size`.
    FixedSizeListF32 { values: Vec<f32>, list_size: usize },
    Utf8(Vec<String>),
}

impl ColumnData {
    pub fn num_rows(&self) -> usize {
        match self {
            ColumnData::UInt64(v) => v.len(),
            ColumnData::FixedSizeListF32 { values, list_size } => {
                if *list_size == 0 {
                    0
                } else {
                    values.len() / list_size
                }
            }
            ColumnData::Utf8(v) => v.len(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            ColumnData::UInt64(_) => "uint64",
            ColumnData::FixedSizeListF32 { .. } => "fixed_size_list<float32>",
            ColumnData::Utf8(_) => "utf8",
        }
    }
}

/// An immutable columnar batch. Built via `RecordBatchBuilder`, which
/// enforces equal row counts across columns.
#[derive(Debug, Clone)]
pub struct RecordBatch {
    columns: Vec<(String, ColumnData)>,
    num_rows: usize,
}

impl RecordBatch {
    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Look up a column by name.
    pub fn column(&self, name: &str) -> Option<&ColumnData> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, c)| c)
    }
}

/// Builder for `RecordBatch` (append whole columns, then `build`).
#[derive(Debug, Default)]
pub struct RecordBatchBuilder {
    columns: Vec<(String, ColumnData)>,
}

impl RecordBatchBuilder {
    pub fn new() -> Self {
        RecordBatchBuilder::default()
    }

    /// Add an id column (u64).
    pub fn add_id_column(mut self, name: &str, ids: Vec<u64>) -> Self {
        self.columns.push((name.to_string(), ColumnData::UInt64(ids)));
        self
    }

    /// Add an embedding column as a flat f32 array of `rows * list_size`
    /// values.
    pub fn add_embedding_column(
        mut self,
        name: &str,
        flat_values: Vec<f32>,
        list_size: usize,
    ) -> Result<Self> {
        if list_size == 0 || flat_values.len() % list_size != 0 {
            return Err(FloeError::SchemaMismatch(format!(
                "column '{}': {} values not divisible by list size {}",
                name,
                flat_values.len(),
                list_size
            )));
        }
        self.columns.push((
            name.to_string(),
            ColumnData::FixedSizeListF32 {
                values: flat_values,
                list_size,
            },
        ));
        Ok(self)
    }

    /// Add a string column.
    pub fn add_string_column(mut self, name: &str, strings: Vec<String>) -> Self {
        self.columns.push((name.to_string(), ColumnData::Utf8(strings)));
        self
    }

    /// Finish the batch, checking that all columns agree on row count.
    pub fn build(self) -> Result<RecordBatch> {
        let num_rows = self.columns.first().map_or(0, |(_, c)| c.num_rows());
        for (name, column) in &self.columns {
            if column.num_rows() != num_rows {
                return Err(FloeError::SchemaMismatch(format!(
                    "column '{}' has {} rows, expected {}",
                    name,
                    column.num_rows(),
                    num_rows
                )));
            }
        }
        Ok(RecordBatch {
            columns: self.columns,
            num_rows,
        })
    }
}
