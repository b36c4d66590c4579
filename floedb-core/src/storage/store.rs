use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{info, warn};

use crate::compaction;
use crate::core::{FloeError, Result};
use crate::storage::columnar::{self, parse_segment_file_name, segment_file_name};
use crate::storage::segment::{ActiveSegment, SealedSegment, VectorRecord};
use crate::storage::snapshot::{Snapshot, SnapshotLog};

/// Store coordinator over the active segment, the sealed segment list,
/// and the snapshot log.
///
/// A single mutex guards all state; operations are serialized. This is
/// the correctness floor: any interleaving of ingest, delete, flush,
/// compact, and scan from multiple threads is safe, with no internal
/// parallelism.
pub struct SegmentStore {
    dim: usize,
    segment_capacity: usize,
    data_dir: PathBuf,
    inner: Mutex<StoreInner>,
}

struct StoreInner {
    next_segment_id: u64,
    active: ActiveSegment,
    sealed: Vec<SealedSegment>,
    snapshots: SnapshotLog,
}

impl SegmentStore {
    /// Create a store over an empty data dir, committing the initial
    /// snapshot.
    pub fn create(dim: usize, segment_capacity: usize, data_dir: &Path) -> Result<Self> {
        fs::create_dir_all(data_dir).map_err(|e| FloeError::StorageCorrupt {
            message: format!("create {}: {}", data_dir.display(), e),
        })?;

        let mut snapshots = SnapshotLog::new(data_dir);
        snapshots.commit(Vec::new());

        Ok(SegmentStore {
            dim,
            segment_capacity,
            data_dir: data_dir.to_path_buf(),
            inner: Mutex::new(StoreInner {
                next_segment_id: 1,
                active: ActiveSegment::new(0),
                sealed: Vec::new(),
                snapshots,
            }),
        })
    }

    /// Reopen a store from an existing data dir.
    ///
    /// Sealed segments are discovered from their files and registered
    /// with empty tombstone sets; the previous snapshot history is not
    /// restored. This is the documented restart semantics: reading from
    /// the earliest state, with no tombstones.
    pub fn open(dim: usize, segment_capacity: usize, data_dir: &Path) -> Result<Self> {
        fs::create_dir_all(data_dir).map_err(|e| FloeError::StorageCorrupt {
            message: format!("create {}: {}", data_dir.display(), e),
        })?;

        let mut sealed: Vec<SealedSegment> = Vec::new();
        let entries = fs::read_dir(data_dir).map_err(|e| FloeError::StorageCorrupt {
            message: format!("read {}: {}", data_dir.display(), e),
        })?;
        for entry in entries {
            let entry = entry.map_err(|e| FloeError::StorageCorrupt {
                message: format!("read {}: {}", data_dir.display(), e),
            })?;
            let name = entry.file_name();
            let Some(segment_id) = name.to_str().and_then(parse_segment_file_name) else {
                continue;
            };
            let path = entry.path();
            let (_, records) = columnar::read_segment(&path, dim)?;
            sealed.push(SealedSegment {
                segment_id,
                path,
                ids: records.iter().map(|r| r.record_id).collect(),
                tombstones: Default::default(),
            });
        }
        sealed.sort_by_key(|s| s.segment_id);

        let next_segment_id = sealed.last().map_or(0, |s| s.segment_id + 1);
        let mut snapshots = SnapshotLog::new(data_dir);
        snapshots.commit(sealed.iter().map(|s| s.segment_id).collect());

        info!(segments = sealed.len(), "reopened segment store");

        Ok(SegmentStore {
            dim,
            segment_capacity,
            data_dir: data_dir.to_path_buf(),
            inner: Mutex::new(StoreInner {
                next_segment_id: next_segment_id + 1,
                active: ActiveSegment::new(next_segment_id),
                sealed,
                snapshots,
            }),
        })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Append a record to the active segment, sealing it when full.
    pub fn insert(&self, record_id: u64, embedding: Vec<f32>, metadata: String) -> Result<()> {
        if embedding.len() != self.dim {
            return Err(FloeError::DimensionMismatch {
                expected: self.dim,
                got: embedding.len(),
            });
        }

        let mut inner = self.inner.lock();
        inner.active.records.push(VectorRecord {
            record_id,
            embedding,
            metadata,
        });
        if inner.active.len() >= self.segment_capacity {
            self.seal_locked(&mut inner)?;
        }
        Ok(())
    }

    /// Seal the active segment into an immutable columnar file and
    /// commit a snapshot. A no-op when the active segment is empty.
    fn seal_locked(&self, inner: &mut StoreInner) -> Result<()> {
        if inner.active.is_empty() {
            return Ok(());
        }

        let segment_id = inner.active.segment_id;
        let path = self.data_dir.join(segment_file_name(segment_id));
        columnar::write_segment(&path, segment_id, self.dim, &inner.active.records)?;

        let ids: Vec<u64> = inner.active.records.iter().map(|r| r.record_id).collect();
        let rows = ids.len();
        let tombstones = std::mem::take(&mut inner.active.tombstones);
        inner.sealed.push(SealedSegment {
            segment_id,
            path,
            ids,
            tombstones,
        });

        let next = inner.next_segment_id;
        inner.next_segment_id += 1;
        inner.active = ActiveSegment::new(next);

        let list: Vec<u64> = inner.sealed.iter().map(|s| s.segment_id).collect();
        inner.snapshots.commit(list);

        info!(segment_id, rows, "sealed active segment");
        Ok(())
    }

    /// Force-seal the active segment.
    pub fn flush(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        self.seal_locked(&mut inner)
    }

    /// Tombstone a record id. Idempotent.
    ///
    /// If the id is buffered in the active segment it is tombstoned
    /// there; otherwise, with no reverse id-to-segment map, it is
    /// tombstoned in every sealed segment. Compaction reclaims the
    /// phantom entries in segments that never held the id.
    pub fn delete(&self, record_id: u64) {
        let mut inner = self.inner.lock();
        if inner.active.contains(record_id) {
            inner.active.tombstones.insert(record_id);
            return;
        }
        for seg in &mut inner.sealed {
            seg.tombstones.insert(record_id);
        }
    }

    /// All live records: sealed segments oldest-first, then the active
    /// segment, skipping tombstoned rows.
    pub fn scan_live(&self) -> Result<Vec<VectorRecord>> {
        let inner = self.inner.lock();
        let mut out = Vec::new();
        for seg in &inner.sealed {
            let (_, records) = columnar::read_segment(&seg.path, self.dim)?;
            out.extend(
                records
                    .into_iter()
                    .filter(|r| !seg.tombstones.contains(&r.record_id)),
            );
        }
        out.extend(
            inner
                .active
                .records
                .iter()
                .filter(|r| !inner.active.tombstones.contains(&r.record_id))
                .cloned(),
        );
        Ok(out)
    }

    /// Scan at a given snapshot: only the sealed segments it names, plus
    /// the active segment when the snapshot is the current one.
    /// Tombstones are read as of now.
    pub fn scan_at_snapshot(&self, snapshot_id: u64) -> Result<Vec<VectorRecord>> {
        let inner = self.inner.lock();
        let snapshot = inner
            .snapshots
            .get(snapshot_id)
            .ok_or_else(|| FloeError::NotFound(format!("snapshot {}", snapshot_id)))?
            .clone();
        let is_latest = snapshot_id + 1 == inner.snapshots.len() as u64;

        let mut out = Vec::new();
        for seg_id in &snapshot.sealed_segment_ids {
            let seg = inner
                .sealed
                .iter()
                .find(|s| s.segment_id == *seg_id)
                .ok_or_else(|| {
                    FloeError::NotFound(format!("segment {} expired by compaction", seg_id))
                })?;
            let (_, records) = columnar::read_segment(&seg.path, self.dim)?;
            out.extend(
                records
                    .into_iter()
                    .filter(|r| !seg.tombstones.contains(&r.record_id)),
            );
        }
        if is_latest {
            out.extend(
                inner
                    .active
                    .records
                    .iter()
                    .filter(|r| !inner.active.tombstones.contains(&r.record_id))
                    .cloned(),
            );
        }
        Ok(out)
    }

    /// Merge sealed segments whose raw tombstone ratio meets the
    /// threshold into a fresh segment. Returns the number of reclaimed
    /// rows. With no dirty segments this is a no-op and the snapshot log
    /// does not advance.
    ///
    /// All fallible work happens before any state mutation, so a failure
    /// leaves the pre-compaction sealed list and snapshot log intact.
    pub fn compact(&self, threshold: f32) -> Result<u64> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(FloeError::InvalidConfig(format!(
                "tombstone threshold {} outside [0, 1]",
                threshold
            )));
        }

        let mut inner = self.inner.lock();
        let plan = compaction::plan(&inner.sealed, threshold);
        if plan.dirty.is_empty() {
            return Ok(0);
        }

        let outcome = compaction::collect_live(&inner.sealed, &plan.dirty, self.dim)?;

        let merged = if outcome.live.is_empty() {
            None
        } else {
            let segment_id = inner.next_segment_id;
            let path = self.data_dir.join(segment_file_name(segment_id));
            columnar::write_segment(&path, segment_id, self.dim, &outcome.live)?;
            Some(SealedSegment {
                segment_id,
                path,
                ids: outcome.live.iter().map(|r| r.record_id).collect(),
                tombstones: Default::default(),
            })
        };

        // Point of no return: restructure the sealed list.
        let old = std::mem::take(&mut inner.sealed);
        let mut dropped = Vec::new();
        for (i, seg) in old.into_iter().enumerate() {
            if plan.dirty.contains(&i) {
                dropped.push(seg);
            } else {
                inner.sealed.push(seg);
            }
        }
        if let Some(seg) = merged {
            inner.next_segment_id += 1;
            inner.sealed.push(seg);
        }

        for seg in &dropped {
            if let Err(e) = fs::remove_file(&seg.path) {
                warn!(segment_id = seg.segment_id, "could not remove compacted segment file: {}", e);
            }
        }

        let list: Vec<u64> = inner.sealed.iter().map(|s| s.segment_id).collect();
        inner.snapshots.commit(list);

        info!(
            reclaimed = outcome.reclaimed,
            merged = dropped.len(),
            "compacted sealed segments"
        );
        Ok(outcome.reclaimed)
    }

    // ─── Stats / queries ────────────────────────────────────────────

    pub fn total_records(&self) -> u64 {
        let inner = self.inner.lock();
        let sealed: usize = inner.sealed.iter().map(|s| s.num_records()).sum();
        (inner.active.len() + sealed) as u64
    }

    pub fn live_records(&self) -> u64 {
        let inner = self.inner.lock();
        let sealed: usize = inner.sealed.iter().map(|s| s.live_count()).sum();
        (inner.active.live_count() + sealed) as u64
    }

    pub fn sealed_segment_count(&self) -> u64 {
        self.inner.lock().sealed.len() as u64
    }

    pub fn snapshot_count(&self) -> u64 {
        self.inner.lock().snapshots.len() as u64
    }

    /// Raw tombstone tally across all segments, phantom entries
    /// included. Nonzero means searches should over-fetch.
    pub fn tombstone_count(&self) -> u64 {
        let inner = self.inner.lock();
        let sealed: usize = inner.sealed.iter().map(|s| s.tombstones.len()).sum();
        (inner.active.tombstones.len() + sealed) as u64
    }

    pub fn is_deleted(&self, record_id: u64) -> bool {
        let inner = self.inner.lock();
        inner.active.tombstones.contains(&record_id)
            || inner
                .sealed
                .iter()
                .any(|s| s.tombstones.contains(&record_id))
    }

    pub fn latest_snapshot(&self) -> Option<Snapshot> {
        self.inner.lock().snapshots.latest().cloned()
    }
}
