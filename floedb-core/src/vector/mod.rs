pub mod distance;

pub use distance::{cosine_distance, inner_product, l2_squared, DistanceMetric};
