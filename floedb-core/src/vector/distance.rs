/// Compute squared L2 (Euclidean) distance between two vectors.
///
/// The graph only consumes relative ordering, so the square root is
/// deferred to result egress.
pub fn l2_squared(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "Vectors must have the same dimension");
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
}

/// Compute cosine distance (1 - cosine_similarity) between two vectors.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "Vectors must have the same dimension");
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    let denom = norm_a * norm_b;
    if denom == 0.0 {
        // A zero vector has no direction; treat it as orthogonal.
        return 1.0;
    }
    1.0 - dot / denom
}

/// Compute inner product between two vectors.
pub fn inner_product(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "Vectors must have the same dimension");
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceMetric {
    /// Squared Euclidean; the canonical metric.
    L2Squared,
    Cosine,
    InnerProduct,
}

impl DistanceMetric {
    /// Compute distance using the specified metric.
    pub fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            DistanceMetric::L2Squared => l2_squared(a, b),
            DistanceMetric::Cosine => cosine_distance(a, b),
            DistanceMetric::InnerProduct => -inner_product(a, b), // Negate for consistency
        }
    }

    /// Convert an internal distance into the user-visible one.
    ///
    /// Squared Euclidean egresses as Euclidean; the square root is applied
    /// at most once, here.
    pub fn egress(&self, distance: f32) -> f32 {
        match self {
            DistanceMetric::L2Squared => distance.sqrt(),
            DistanceMetric::Cosine | DistanceMetric::InnerProduct => distance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_l2_squared_known_value() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        assert!((l2_squared(&a, &b) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_l2_squared_identity_and_symmetry() {
        let a = vec![0.3, -1.2, 4.5];
        let b = vec![2.0, 0.5, -0.7];
        assert_eq!(l2_squared(&a, &a), 0.0);
        assert!((l2_squared(&a, &b) - l2_squared(&b, &a)).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_distance_parallel_and_orthogonal() {
        let a = vec![1.0, 0.0];
        let b = vec![2.0, 0.0];
        let c = vec![0.0, 3.0];
        assert!(cosine_distance(&a, &b).abs() < 1e-6);
        assert!((cosine_distance(&a, &c) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_distance_zero_vector() {
        let a = vec![0.0, 0.0];
        let b = vec![1.0, 1.0];
        assert_eq!(cosine_distance(&a, &b), 1.0);
    }

    #[test]
    fn test_inner_product_negated_for_ordering() {
        let a = vec![1.0, 2.0];
        let near = vec![1.0, 2.0];
        let far = vec![-1.0, -2.0];
        let metric = DistanceMetric::InnerProduct;
        assert!(metric.distance(&a, &near) < metric.distance(&a, &far));
    }

    #[test]
    fn test_egress_applies_sqrt_only_for_l2() {
        assert!((DistanceMetric::L2Squared.egress(4.0) - 2.0).abs() < 1e-6);
        assert_eq!(DistanceMetric::Cosine.egress(0.25), 0.25);
        assert_eq!(DistanceMetric::InnerProduct.egress(-3.0), -3.0);
    }
}
