pub mod record_batch;

pub use record_batch::{
    ColumnData, RecordBatch, RecordBatchBuilder, EMBEDDING_COLUMN, ID_COLUMN, METADATA_COLUMN,
};
