//! Compaction planning and merge for the segment store.
//!
//! Sealed segments whose raw tombstone ratio meets a threshold are
//! merged into a fresh segment; reclaimed rows are the difference
//! between the dirty segments' row counts and the live rows that
//! survive the merge. `SegmentStore::compact` drives both steps under
//! the store mutex; the engine layers the index rebuild on top.

use tracing::debug;

use crate::core::Result;
use crate::storage::columnar;
use crate::storage::segment::{SealedSegment, VectorRecord};

/// Partition of the sealed segment list, by index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompactionPlan {
    pub dirty: Vec<usize>,
    pub clean: Vec<usize>,
}

/// Split sealed segments into dirty (raw tombstone ratio >= threshold)
/// and clean.
pub fn plan(segments: &[SealedSegment], threshold: f32) -> CompactionPlan {
    let mut dirty = Vec::new();
    let mut clean = Vec::new();
    for (i, seg) in segments.iter().enumerate() {
        if seg.tombstone_ratio() >= threshold {
            dirty.push(i);
        } else {
            clean.push(i);
        }
    }
    debug!(
        dirty = dirty.len(),
        clean = clean.len(),
        threshold,
        "compaction plan"
    );
    CompactionPlan { dirty, clean }
}

/// Live rows gathered from the dirty segments, with the reclaimed count.
#[derive(Debug)]
pub struct MergeOutcome {
    pub live: Vec<VectorRecord>,
    pub reclaimed: u64,
}

/// Read the live rows out of the dirty segments, in segment order.
///
/// Reclaimed counts every dropped row, so phantom tombstones (ids a
/// segment never held) contribute nothing.
pub fn collect_live(
    segments: &[SealedSegment],
    dirty: &[usize],
    dim: usize,
) -> Result<MergeOutcome> {
    let mut live = Vec::new();
    let mut reclaimed: u64 = 0;

    for &i in dirty {
        let seg = &segments[i];
        let (_, records) = columnar::read_segment(&seg.path, dim)?;
        let before = records.len();
        let survivors: Vec<VectorRecord> = records
            .into_iter()
            .filter(|r| !seg.tombstones.contains(&r.record_id))
            .collect();
        reclaimed += (before - survivors.len()) as u64;
        live.extend(survivors);
    }

    Ok(MergeOutcome { live, reclaimed })
}
