mod builder;
mod graph;
mod insert;
mod search;


pub use builder::HNSWBuilder;
pub use graph::Layer;
pub use search::Neighbor;

use rand::rngs::StdRng;

use crate::vector::DistanceMetric;

/// HNSW index structure.
///
/// A multi-layer navigable small-world graph over a dense arena of vector
/// payloads. Node ids are assigned in insertion order; layer 0 holds every
/// node and higher layers are exponentially sparser.
#[derive(Debug)]
pub struct HNSWIndex {
    pub(crate) dim: usize,
    pub(crate) m: usize,
    pub(crate) ef_construction: usize,
    pub(crate) ef_search: usize,
    pub(crate) metric: DistanceMetric,
    pub(crate) m_l: f64,
    pub(crate) rng: StdRng,

    /// Anchor for every descent; the most recent node whose sampled
    /// level reached `max_level`.
    pub(crate) entry_point: Option<usize>,
    pub(crate) max_level: usize,

    /// Vector payload arena, indexed by node id.
    pub(crate) vectors: Vec<Vec<f32>>,
    /// Sampled level per node.
    pub(crate) node_levels: Vec<usize>,
    /// Per-layer adjacency.
    pub(crate) layers: Vec<Layer>,
}

impl HNSWIndex {
    /// Number of nodes in the index.
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn ef_search(&self) -> usize {
        self.ef_search
    }

    /// Top layer of the graph.
    pub fn max_level(&self) -> usize {
        self.max_level
    }

    pub fn entry_point(&self) -> Option<usize> {
        self.entry_point
    }

    /// Sampled level of a node, if it exists.
    pub fn level_of(&self, node: usize) -> Option<usize> {
        self.node_levels.get(node).copied()
    }

    /// Neighbor list of a node at a layer.
    pub fn neighbors(&self, node: usize, level: usize) -> Option<&[usize]> {
        self.layers.get(level).and_then(|l| l.neighbors(node))
    }

    /// Edge budget at a layer: layer 0 is allowed 2M, higher layers M.
    pub(crate) fn m_max(&self, level: usize) -> usize {
        if level == 0 {
            self.m * 2
        } else {
            self.m
        }
    }
}
