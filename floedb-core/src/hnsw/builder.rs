use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::hnsw::HNSWIndex;
use crate::vector::DistanceMetric;

/// Configuration builder for the HNSW index.
#[derive(Debug, Clone)]
pub struct HNSWBuilder {
    pub dim: usize,               // Vector dimension
    pub m: usize,                 // Max neighbors per node above layer 0
    pub ef_construction: usize,   // Beam width during build
    pub ef_search: usize,         // Beam width during queries
    pub metric: DistanceMetric,   // Distance dispatch
    pub seed: u64,                // Seed for the level-sampling stream
}

impl HNSWBuilder {
    /// Create a builder with default parameters.
    pub fn new(dim: usize) -> Self {
        HNSWBuilder {
            dim,
            m: 16,
            ef_construction: 200,
            ef_search: 50,
            metric: DistanceMetric::L2Squared,
            seed: 42,
        }
    }

    /// Set M parameter.
    pub fn with_m(mut self, m: usize) -> Self {
        self.m = m;
        self
    }

    /// Set ef_construction.
    pub fn with_ef_construction(mut self, ef: usize) -> Self {
        self.ef_construction = ef;
        self
    }

    /// Set ef_search.
    pub fn with_ef_search(mut self, ef: usize) -> Self {
        self.ef_search = ef;
        self
    }

    /// Set the distance metric.
    pub fn with_metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = metric;
        self
    }

    /// Set the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Build an empty index.
    pub fn build(self) -> HNSWIndex {
        // mL = 1/ln(M); undefined at M = 1, where every node lands on
        // layer 0 and the graph degenerates toward a path.
        let m_l = if self.m > 1 {
            1.0 / (self.m as f64).ln()
        } else {
            0.0
        };
        HNSWIndex {
            dim: self.dim,
            m: self.m,
            ef_construction: self.ef_construction,
            ef_search: self.ef_search,
            metric: self.metric,
            m_l,
            rng: StdRng::seed_from_u64(self.seed),
            entry_point: None,
            max_level: 0,
            vectors: Vec::new(),
            node_levels: Vec::new(),
            layers: Vec::new(),
        }
    }
}
