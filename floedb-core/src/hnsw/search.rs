use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashSet};

use crate::core::{FloeError, Result};
use crate::hnsw::HNSWIndex;

/// A scored node returned by layer search, distance in the index metric
/// (squared for Euclidean).
#[derive(Debug, Clone, Copy)]
pub struct Neighbor {
    pub node_id: usize,
    pub distance: f32,
}

/// Heap wrapper ordering by distance ascending, ties broken by node id.
///
/// Pushed as-is into the result heap (max-heap, farthest on top for
/// bounding) and wrapped in `Reverse` for the candidate frontier
/// (nearest on top).
#[derive(Debug, Clone, Copy)]
struct HeapEntry {
    distance: f32,
    node_id: usize,
}

impl Eq for HeapEntry {}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.node_id == other.node_id
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .partial_cmp(&other.distance)
            .unwrap_or(Ordering::Equal)
            .then_with(|| self.node_id.cmp(&other.node_id))
    }
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl HNSWIndex {
    /// Beam search within a single layer.
    ///
    /// Returns up to `ef` nearest elements sorted ascending by distance.
    /// The visited set is per-call.
    pub(crate) fn search_layer(
        &self,
        query: &[f32],
        entry: usize,
        ef: usize,
        level: usize,
    ) -> Result<Vec<Neighbor>> {
        let entry_vec = self
            .vectors
            .get(entry)
            .ok_or_else(|| FloeError::CorruptIndex(format!("entry point {} out of range", entry)))?;
        let dist = self.metric.distance(query, entry_vec);

        let mut visited: HashSet<usize> = HashSet::new();
        visited.insert(entry);

        // Max-heap of the current top-ef (farthest first, for bounding)
        let mut results: BinaryHeap<HeapEntry> = BinaryHeap::new();
        // Min-heap frontier to expand (nearest first)
        let mut candidates: BinaryHeap<Reverse<HeapEntry>> = BinaryHeap::new();

        results.push(HeapEntry {
            distance: dist,
            node_id: entry,
        });
        candidates.push(Reverse(HeapEntry {
            distance: dist,
            node_id: entry,
        }));

        while let Some(Reverse(current)) = candidates.pop() {
            let bound = results.peek().map(|e| e.distance).unwrap_or(f32::MAX);
            if current.distance > bound {
                break;
            }

            let Some(neighbors) = self
                .layers
                .get(level)
                .and_then(|l| l.neighbors(current.node_id))
            else {
                continue;
            };

            for &nb in neighbors {
                if !visited.insert(nb) {
                    continue;
                }
                let nb_vec = self.vectors.get(nb).ok_or_else(|| {
                    FloeError::CorruptIndex(format!(
                        "layer {} adjacency references node {} beyond arena",
                        level, nb
                    ))
                })?;
                let nb_dist = self.metric.distance(query, nb_vec);
                let bound = results.peek().map(|e| e.distance).unwrap_or(f32::MAX);

                if nb_dist < bound || results.len() < ef {
                    candidates.push(Reverse(HeapEntry {
                        distance: nb_dist,
                        node_id: nb,
                    }));
                    results.push(HeapEntry {
                        distance: nb_dist,
                        node_id: nb,
                    });
                    if results.len() > ef {
                        results.pop();
                    }
                }
            }
        }

        // Drain the max-heap and reverse for ascending order.
        let mut out: Vec<Neighbor> = Vec::with_capacity(results.len());
        while let Some(entry) = results.pop() {
            out.push(Neighbor {
                node_id: entry.node_id,
                distance: entry.distance,
            });
        }
        out.reverse();
        Ok(out)
    }

    /// Layer descent followed by a beam search at layer 0 with the given
    /// beam width. Returns up to `ef` candidates sorted ascending, in the
    /// index metric (no square root applied).
    pub fn search_with_ef(&self, query: &[f32], ef: usize) -> Result<Vec<Neighbor>> {
        if query.len() != self.dim {
            return Err(FloeError::DimensionMismatch {
                expected: self.dim,
                got: query.len(),
            });
        }
        let Some(entry) = self.entry_point else {
            return Ok(Vec::new());
        };

        let mut current = entry;
        for level in (1..=self.max_level).rev() {
            let nearest = self.search_layer(query, current, 1, level)?;
            if let Some(best) = nearest.first() {
                current = best.node_id;
            }
        }

        self.search_layer(query, current, ef.max(1), 0)
    }

    /// Search for the k approximate nearest neighbors.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        if k == 0 {
            // Still validate the query so a bad dimension is not masked.
            if query.len() != self.dim {
                return Err(FloeError::DimensionMismatch {
                    expected: self.dim,
                    got: query.len(),
                });
            }
            return Ok(Vec::new());
        }
        let mut results = self.search_with_ef(query, self.ef_search.max(k))?;
        results.truncate(k);
        Ok(results)
    }
}
