use rand::Rng;

use crate::core::{FloeError, Result};
use crate::hnsw::search::Neighbor;
use crate::hnsw::HNSWIndex;

impl HNSWIndex {
    /// Insert a vector into the index, returning its node id.
    ///
    /// Node ids are dense and assigned in insertion order. The insert is
    /// atomic end to end: a partial graph is never observable.
    pub fn insert(&mut self, vector: Vec<f32>) -> Result<usize> {
        if vector.len() != self.dim {
            return Err(FloeError::DimensionMismatch {
                expected: self.dim,
                got: vector.len(),
            });
        }

        let node_id = self.vectors.len();
        let level = self.random_level();

        self.vectors.push(vector);
        self.node_levels.push(level);

        // Grow the layer table and the node's adjacency slots up to its level.
        while self.layers.len() <= level {
            self.layers.push(crate::hnsw::Layer::new());
        }
        for l in 0..=level {
            self.layers[l].ensure_node(node_id);
        }

        let Some(mut current) = self.entry_point else {
            self.entry_point = Some(node_id);
            self.max_level = level;
            return Ok(node_id);
        };

        let query = self.vectors[node_id].clone();

        // Phase 1: greedy descent from the top layer down to level + 1.
        for l in ((level + 1)..=self.max_level).rev() {
            let nearest = self.search_layer(&query, current, 1, l)?;
            if let Some(best) = nearest.first() {
                current = best.node_id;
            }
        }

        // Phase 2: link at layers [min(level, max_level) .. 0].
        for l in (0..=level.min(self.max_level)).rev() {
            let candidates = self.search_layer(&query, current, self.ef_construction, l)?;
            let m_max = self.m_max(l);
            let selected = select_neighbors(&candidates, m_max);

            for nb in &selected {
                self.layers[l].add_edge(node_id, nb.node_id);
                self.layers[l].add_edge(nb.node_id, node_id);

                let degree = self.layers[l]
                    .neighbors(nb.node_id)
                    .map_or(0, |n| n.len());
                if degree > m_max {
                    self.prune(nb.node_id, l, m_max);
                }
            }

            if let Some(best) = candidates.first() {
                current = best.node_id;
            }
        }

        if level > self.max_level {
            self.entry_point = Some(node_id);
            self.max_level = level;
        }

        Ok(node_id)
    }

    /// Sample a level from the geometric distribution: floor(-ln(U) * mL).
    fn random_level(&mut self) -> usize {
        // gen() yields [0, 1); clamp away exact zero before the log.
        let u: f64 = self.rng.gen::<f64>().max(f64::MIN_POSITIVE);
        (-u.ln() * self.m_l) as usize
    }

    /// Retain the `m_max` closest neighbors of `node` at `level`.
    ///
    /// Pruning is unilateral: the dropped end-point keeps its reverse
    /// edge until its own next prune or a rebuild.
    fn prune(&mut self, node: usize, level: usize, m_max: usize) {
        let Some(neighbors) = self.layers[level].neighbors(node) else {
            return;
        };
        let base = &self.vectors[node];
        let mut scored: Vec<Neighbor> = neighbors
            .iter()
            .map(|&nb| Neighbor {
                node_id: nb,
                distance: self.metric.distance(base, &self.vectors[nb]),
            })
            .collect();
        scored.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(m_max);

        let kept: Vec<usize> = scored.iter().map(|n| n.node_id).collect();
        self.layers[level].set_neighbors(node, kept);
    }
}

/// Baseline neighbor selection: the M closest candidates.
///
/// `candidates` arrives sorted ascending from the layer search.
fn select_neighbors(candidates: &[Neighbor], m: usize) -> Vec<Neighbor> {
    candidates.iter().take(m).copied().collect()
}
