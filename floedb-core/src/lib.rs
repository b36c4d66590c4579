// ============================================================================
// CORE TYPES & UTILITIES
// ============================================================================
pub mod core;

// ============================================================================
// INDEXING & SEARCH
// ============================================================================
pub mod vector;
pub mod hnsw;

// ============================================================================
// STORAGE & COMPACTION
// ============================================================================
pub mod storage;
pub mod compaction;

// ============================================================================
// INGESTION & MAIN ENGINE
// ============================================================================
pub mod batch;
pub mod engine;

// Re-export commonly used types
pub use crate::core::{ErrorCode, FloeError, Result};
pub use vector::DistanceMetric;
pub use hnsw::{HNSWBuilder, HNSWIndex, Neighbor};
pub use storage::{SegmentStore, Snapshot, VectorRecord};
pub use batch::{RecordBatch, RecordBatchBuilder};
pub use engine::{EngineStats, FloeConfig, FloeDB, SearchResult};
