use std::path::PathBuf;

use tracing::info;

use crate::batch::{ColumnData, RecordBatch, EMBEDDING_COLUMN, ID_COLUMN, METADATA_COLUMN};
use crate::core::{FloeError, Result};
use crate::hnsw::{HNSWBuilder, HNSWIndex};
use crate::storage::{SegmentStore, Snapshot, VectorRecord};
use crate::vector::DistanceMetric;

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct FloeConfig {
    pub dim: usize,
    pub m: usize,
    pub ef_construction: usize,
    pub ef_search: usize,
    pub segment_capacity: usize,
    pub metric: DistanceMetric,
    pub seed: u64,
    pub data_dir: PathBuf,
}

impl FloeConfig {
    /// Defaults: M = 16, ef_construction = 200, ef_search = 50,
    /// segment capacity = 1000, squared-Euclidean metric.
    pub fn new(dim: usize, data_dir: impl Into<PathBuf>) -> Self {
        FloeConfig {
            dim,
            m: 16,
            ef_construction: 200,
            ef_search: 50,
            segment_capacity: 1000,
            metric: DistanceMetric::L2Squared,
            seed: 42,
            data_dir: data_dir.into(),
        }
    }

    pub fn with_m(mut self, m: usize) -> Self {
        self.m = m;
        self
    }

    pub fn with_ef_construction(mut self, ef: usize) -> Self {
        self.ef_construction = ef;
        self
    }

    pub fn with_ef_search(mut self, ef: usize) -> Self {
        self.ef_search = ef;
        self
    }

    pub fn with_segment_capacity(mut self, capacity: usize) -> Self {
        self.segment_capacity = capacity;
        self
    }

    pub fn with_metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = metric;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.dim == 0 {
            return Err(FloeError::InvalidConfig("dimension must be positive".into()));
        }
        if self.m == 0 {
            return Err(FloeError::InvalidConfig("M must be positive".into()));
        }
        if self.ef_construction == 0 || self.ef_search == 0 {
            return Err(FloeError::InvalidConfig("ef parameters must be positive".into()));
        }
        if self.segment_capacity == 0 {
            return Err(FloeError::InvalidConfig("segment capacity must be positive".into()));
        }
        Ok(())
    }
}

/// A search hit, enriched with the stored metadata.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub record_id: u64,
    pub distance: f32,
    pub metadata: String,
}

/// Engine statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineStats {
    pub total_records: u64,
    pub live_records: u64,
    pub index_size: u64,
    pub segment_count: u64,
    pub snapshot_count: u64,
    pub tombstone_count: u64,
}

/// Caller-facing identity of a graph node.
#[derive(Debug, Clone)]
struct NodeEntry {
    record_id: u64,
    metadata: String,
}

/// The embedded vector search engine: an HNSW proximity graph over a
/// columnar segment store.
///
/// The store appends records in insertion order and the index assigns
/// node ids in insertion order, so the two stay aligned through the
/// `directory`, which maps each node id to its caller-facing record.
/// Deletes only tombstone the store; the graph node stays traversable
/// and is filtered at result egress until the next rebuild.
pub struct FloeDB {
    config: FloeConfig,
    store: SegmentStore,
    index: HNSWIndex,
    directory: Vec<NodeEntry>,
}

impl FloeDB {
    /// Create an engine over a fresh data dir.
    pub fn new(config: FloeConfig) -> Result<Self> {
        config.validate()?;
        let store = SegmentStore::create(config.dim, config.segment_capacity, &config.data_dir)?;
        let index = Self::fresh_index(&config);
        Ok(FloeDB {
            config,
            store,
            index,
            directory: Vec::new(),
        })
    }

    /// Reopen an engine from an existing data dir.
    ///
    /// Sealed segments are rediscovered and the graph is reconstructed
    /// by scanning live records and re-inserting each, in segment order.
    pub fn open(config: FloeConfig) -> Result<Self> {
        config.validate()?;
        let store = SegmentStore::open(config.dim, config.segment_capacity, &config.data_dir)?;
        let live = store.scan_live()?;

        let mut index = Self::fresh_index(&config);
        let mut directory = Vec::with_capacity(live.len());
        for record in live {
            index.insert(record.embedding)?;
            directory.push(NodeEntry {
                record_id: record.record_id,
                metadata: record.metadata,
            });
        }

        info!(records = directory.len(), "rebuilt index from segments");
        Ok(FloeDB {
            config,
            store,
            index,
            directory,
        })
    }

    fn fresh_index(config: &FloeConfig) -> HNSWIndex {
        HNSWBuilder::new(config.dim)
            .with_m(config.m)
            .with_ef_construction(config.ef_construction)
            .with_ef_search(config.ef_search)
            .with_metric(config.metric)
            .with_seed(config.seed)
            .build()
    }

    pub fn dim(&self) -> usize {
        self.config.dim
    }

    /// Insert a single record.
    pub fn insert(&mut self, record_id: u64, embedding: Vec<f32>, metadata: &str) -> Result<()> {
        if embedding.len() != self.config.dim {
            return Err(FloeError::DimensionMismatch {
                expected: self.config.dim,
                got: embedding.len(),
            });
        }
        self.store
            .insert(record_id, embedding.clone(), metadata.to_string())?;
        self.index.insert(embedding)?;
        self.directory.push(NodeEntry {
            record_id,
            metadata: metadata.to_string(),
        });
        Ok(())
    }

    /// Ingest a columnar batch. Validates the whole schema before any
    /// row is touched, so a bad batch ingests zero rows.
    ///
    /// Required columns: `id` (u64), `embedding` (fixed-size list of
    /// f32 whose list size equals the engine dimension). Optional:
    /// `metadata` (utf8). Returns the number of rows inserted.
    pub fn ingest_batch(&mut self, batch: &RecordBatch) -> Result<u64> {
        let ids = match batch.column(ID_COLUMN) {
            Some(ColumnData::UInt64(ids)) => ids,
            Some(other) => {
                return Err(FloeError::SchemaMismatch(format!(
                    "column '{}' must be uint64, got {}",
                    ID_COLUMN,
                    other.type_name()
                )))
            }
            None => {
                return Err(FloeError::SchemaMismatch(format!(
                    "batch missing '{}' uint64 column",
                    ID_COLUMN
                )))
            }
        };

        let (values, list_size) = match batch.column(EMBEDDING_COLUMN) {
            Some(ColumnData::FixedSizeListF32 { values, list_size }) => (values, *list_size),
            Some(other) => {
                return Err(FloeError::SchemaMismatch(format!(
                    "column '{}' must be fixed_size_list<float32>, got {}",
                    EMBEDDING_COLUMN,
                    other.type_name()
                )))
            }
            None => {
                return Err(FloeError::SchemaMismatch(format!(
                    "batch missing '{}' fixed_size_list<float32> column",
                    EMBEDDING_COLUMN
                )))
            }
        };
        if list_size != self.config.dim {
            return Err(FloeError::DimensionMismatch {
                expected: self.config.dim,
                got: list_size,
            });
        }

        let metadata = match batch.column(METADATA_COLUMN) {
            Some(ColumnData::Utf8(strings)) => Some(strings),
            Some(other) => {
                return Err(FloeError::SchemaMismatch(format!(
                    "column '{}' must be utf8, got {}",
                    METADATA_COLUMN,
                    other.type_name()
                )))
            }
            None => None,
        };

        let rows = batch.num_rows();
        for i in 0..rows {
            let embedding = values[i * list_size..(i + 1) * list_size].to_vec();
            let meta = metadata.map_or("", |m| m[i].as_str());
            self.insert(ids[i], embedding, meta)?;
        }
        Ok(rows as u64)
    }

    /// Search for the k nearest neighbors of a query vector.
    ///
    /// The graph returns candidate node ids; each is mapped to its
    /// record through the directory, tombstoned records are dropped,
    /// and surviving distances egress through the metric (square root
    /// for Euclidean).
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        if query.len() != self.config.dim {
            return Err(FloeError::DimensionMismatch {
                expected: self.config.dim,
                got: query.len(),
            });
        }
        if k == 0 || self.index.is_empty() {
            return Ok(Vec::new());
        }

        // Over-fetch when tombstones may swallow hits.
        let mut ef = self.config.ef_search.max(k);
        if self.store.tombstone_count() > 0 {
            ef = ef.max(2 * k);
        }

        let hits = self.index.search_with_ef(query, ef)?;
        let mut results = Vec::with_capacity(k);
        for hit in hits {
            let entry = self.directory.get(hit.node_id).ok_or_else(|| {
                FloeError::CorruptIndex(format!("node {} missing from directory", hit.node_id))
            })?;
            if self.store.is_deleted(entry.record_id) {
                continue;
            }
            results.push(SearchResult {
                record_id: entry.record_id,
                distance: self.config.metric.egress(hit.distance),
                metadata: entry.metadata.clone(),
            });
            if results.len() == k {
                break;
            }
        }
        Ok(results)
    }

    /// Soft-delete a record by id. Idempotent; the graph is untouched.
    pub fn delete(&self, record_id: u64) {
        self.store.delete(record_id);
    }

    /// Soft-delete a batch of record ids.
    pub fn delete_batch(&self, record_ids: &[u64]) {
        for &id in record_ids {
            self.store.delete(id);
        }
    }

    /// Force-seal the active segment. A no-op when it is empty.
    pub fn flush(&self) -> Result<()> {
        self.store.flush()
    }

    /// Merge tombstone-heavy segments. Returns the reclaimed row count.
    pub fn compact(&self, tombstone_threshold: f32) -> Result<u64> {
        self.store.compact(tombstone_threshold)
    }

    /// Compact, then rebuild the graph from the live record set.
    ///
    /// The new index keeps the same parameters; record ids retain their
    /// caller-facing values while node ids restart at zero. The swap is
    /// atomic: the old index serves nothing once this returns.
    pub fn compact_and_rebuild(&mut self, tombstone_threshold: f32) -> Result<u64> {
        let reclaimed = self.store.compact(tombstone_threshold)?;

        let live = self.store.scan_live()?;
        let mut index = Self::fresh_index(&self.config);
        let mut directory = Vec::with_capacity(live.len());
        for record in live {
            index.insert(record.embedding)?;
            directory.push(NodeEntry {
                record_id: record.record_id,
                metadata: record.metadata,
            });
        }

        info!(
            reclaimed,
            nodes = directory.len(),
            "rebuilt index after compaction"
        );
        self.index = index;
        self.directory = directory;
        Ok(reclaimed)
    }

    /// All live records in scan order.
    pub fn scan_live(&self) -> Result<Vec<VectorRecord>> {
        self.store.scan_live()
    }

    /// Live records as of a given snapshot (tombstones as of now).
    pub fn scan_at_snapshot(&self, snapshot_id: u64) -> Result<Vec<VectorRecord>> {
        self.store.scan_at_snapshot(snapshot_id)
    }

    pub fn latest_snapshot(&self) -> Option<Snapshot> {
        self.store.latest_snapshot()
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            total_records: self.store.total_records(),
            live_records: self.store.live_records(),
            index_size: self.index.len() as u64,
            segment_count: self.store.sealed_segment_count(),
            snapshot_count: self.store.snapshot_count(),
            tombstone_count: self.store.tombstone_count(),
        }
    }
}
