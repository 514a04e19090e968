//! Inner-product nearest-neighbor index over unit-normalized embeddings.
//!
//! With unit vectors the inner product equals cosine similarity, so scores
//! are directly comparable with the configured acceptance threshold.

use thiserror::Error;
use usearch::{Index, IndexOptions, MetricKind, ScalarKind};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IndexError {
    #[error("expected {expected} dimensions, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("index dimensionality must be positive")]
    ZeroDimensions,
    #[error("vector index failure: {0}")]
    Backend(String),
}

fn backend(error: impl std::fmt::Display) -> IndexError {
    IndexError::Backend(error.to_string())
}

pub struct SimilarityIndex {
    dimensions: usize,
    index: Index,
}

impl SimilarityIndex {
    pub fn new(dimensions: usize) -> Result<Self, IndexError> {
        Self::with_capacity(dimensions, 0)
    }

    pub fn with_capacity(dimensions: usize, capacity: usize) -> Result<Self, IndexError> {
        if dimensions == 0 {
            return Err(IndexError::ZeroDimensions);
        }
        let index = Index::new(&IndexOptions {
            dimensions,
            metric: MetricKind::IP,
            quantization: ScalarKind::F32,
            ..Default::default()
        })
        .map_err(backend)?;
        index.reserve(capacity.max(1)).map_err(backend)?;
        Ok(Self { dimensions, index })
    }

    pub(crate) fn len(&self) -> usize {
        self.index.size()
    }

    fn check(&self, vector: &[f32]) -> Result<(), IndexError> {
        if vector.len() != self.dimensions {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimensions,
                actual: vector.len(),
            });
        }
        Ok(())
    }

    /// Keys must be non-negative row ids.
    pub fn add(&mut self, key: i32, vector: &[f32]) -> Result<(), IndexError> {
        self.check(vector)?;
        let key = u64::try_from(key).map_err(backend)?;
        if self.index.size() >= self.index.capacity() {
            self.index
                .reserve((self.index.capacity() * 2).max(1))
                .map_err(backend)?;
        }
        self.index.add(key, vector).map_err(backend)
    }

    /// Return up to `k` `(key, similarity)` pairs ordered by descending
    /// similarity. Non-finite scores are never returned.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(i32, f32)>, IndexError> {
        self.check(query)?;
        let k = k.min(self.len());
        if k == 0 {
            return Ok(Vec::new());
        }

        let matches = self.index.search(query, k).map_err(backend)?;

        // The IP metric reports `1 - dot` as its distance
        Ok(matches
            .keys
            .iter()
            .zip(&matches.distances)
            .filter_map(|(&key, &distance)| {
                let similarity = 1.0 - distance;
                let key = i32::try_from(key).ok()?;
                similarity.is_finite().then_some((key, similarity))
            })
            .collect())
    }
}
