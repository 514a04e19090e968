use serde::Serialize;

/// A materialized product-to-benchmark match.
///
/// `similarity` is the inner product of two unit-normalized embeddings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Association {
    pub product_id: i32,
    pub benchmark_id: i32,
    pub similarity: f32,
}
