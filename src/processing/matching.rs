//! Rebuilds the product/benchmark association table from embeddings.

use std::sync::Arc;

use thiserror::Error;

use crate::domain::association::Association;
use crate::domain::scope::{InvalidScopeError, MatchScope};
use crate::processing::MatchRepository;
use crate::processing::embedding::{
    Embedder, EmbeddingError, PromptEmbedding, load_or_generate_embedding,
};
use crate::processing::index::{IndexError, SimilarityIndex};
use crate::repository::{BenchmarkScope, ProductScope, RepositoryError};

#[derive(Debug, Error)]
pub enum MatchError {
    #[error(transparent)]
    InvalidScope(#[from] InvalidScopeError),
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),
    #[error("index error: {0}")]
    Index(#[from] IndexError),
    #[error("matching task failed: {0}")]
    Task(String),
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MatchStats {
    pub products_loaded: usize,
    pub benchmarks_loaded: usize,
    pub product_embeddings_generated: usize,
    pub benchmark_embeddings_generated: usize,
    pub associations_written: usize,
    pub skipped_below_threshold: usize,
}

/// Threshold-filtered top-K semantic join between products and benchmarks.
#[derive(Debug, Clone, Copy)]
pub struct MatchingEngine {
    threshold: f32,
    top_k: usize,
}

impl MatchingEngine {
    pub fn new(threshold: f32, top_k: usize) -> Self {
        Self { threshold, top_k }
    }

    /// Validate caller arguments, then recompute.
    ///
    /// Exactly one of `crawler_selector` and `benchmark_id` must be given;
    /// otherwise nothing is read or written.
    pub fn recompute_parts<R, E>(
        &self,
        crawler_selector: Option<&str>,
        benchmark_id: Option<i32>,
        repo: &R,
        embedder: &E,
    ) -> Result<MatchStats, MatchError>
    where
        R: MatchRepository,
        E: Embedder + ?Sized,
    {
        let scope = MatchScope::from_parts(crawler_selector, benchmark_id)?;
        self.recompute(&scope, repo, embedder)
    }

    /// Replace every association in `scope` with a freshly computed set.
    ///
    /// Candidates outside the scope are read (all benchmarks for a crawler
    /// scope, all products for a benchmark scope) but only rows inside the
    /// scope are deleted or written, in a single transaction.
    pub fn recompute<R, E>(
        &self,
        scope: &MatchScope,
        repo: &R,
        embedder: &E,
    ) -> Result<MatchStats, MatchError>
    where
        R: MatchRepository,
        E: Embedder + ?Sized,
    {
        let mut stats = MatchStats::default();

        let products = repo.list_products(&ProductScope::from(scope))?;
        let benchmarks = repo.list_benchmarks(BenchmarkScope::from(scope))?;
        stats.products_loaded = products.len();
        stats.benchmarks_loaded = benchmarks.len();

        if products.is_empty() || benchmarks.is_empty() {
            log::info!(
                "Nothing to match for {scope}: products={}, benchmarks={}",
                stats.products_loaded,
                stats.benchmarks_loaded
            );
            return Ok(stats);
        }

        let mut product_embeddings: Vec<(i32, Vec<f32>)> = Vec::with_capacity(products.len());
        for product in &products {
            let (embedding, generated) = load_or_generate_embedding(
                product.embedding.as_deref(),
                product.prompt(),
                embedder,
                |value| {
                    repo.set_product_embedding(product.id, value)
                        .map(|_| ())
                        .map_err(|error| {
                            format!(
                                "Failed to persist product embedding for {}: {error}",
                                product.id
                            )
                        })
                },
            )?;
            if generated {
                stats.product_embeddings_generated += 1;
            }
            product_embeddings.push((product.id, embedding));
        }

        let mut benchmark_embeddings: Vec<(i32, Vec<f32>)> = Vec::with_capacity(benchmarks.len());
        for benchmark in &benchmarks {
            let (embedding, generated) = load_or_generate_embedding(
                benchmark.embedding.as_deref(),
                benchmark.prompt(),
                embedder,
                |value| {
                    repo.set_benchmark_embedding(benchmark.id, value)
                        .map(|_| ())
                        .map_err(|error| {
                            format!(
                                "Failed to persist benchmark embedding for {}: {error}",
                                benchmark.id
                            )
                        })
                },
            )?;
            if generated {
                stats.benchmark_embeddings_generated += 1;
            }
            benchmark_embeddings.push((benchmark.id, embedding));
        }

        let dimensions = product_embeddings[0].1.len();
        let mut index = SimilarityIndex::with_capacity(dimensions, product_embeddings.len())?;
        for (product_id, embedding) in &product_embeddings {
            index.add(*product_id, embedding)?;
        }

        let k = self.top_k.min(index.len());
        let mut associations = Vec::new();
        for (benchmark_id, embedding) in &benchmark_embeddings {
            for (product_id, similarity) in index.search(embedding, k)? {
                if similarity < self.threshold {
                    stats.skipped_below_threshold += 1;
                    continue;
                }
                associations.push(Association {
                    product_id,
                    benchmark_id: *benchmark_id,
                    similarity,
                });
            }
        }

        stats.associations_written = repo.replace_associations(scope, &associations)?;

        log::info!(
            "Finished matching for {scope}: products_loaded={}, benchmarks_loaded={}, product_embeddings_generated={}, benchmark_embeddings_generated={}, associations_written={}, skipped_below_threshold={}",
            stats.products_loaded,
            stats.benchmarks_loaded,
            stats.product_embeddings_generated,
            stats.benchmark_embeddings_generated,
            stats.associations_written,
            stats.skipped_below_threshold
        );

        Ok(stats)
    }

    /// Run [`MatchingEngine::recompute`] on the blocking pool.
    pub async fn recompute_blocking<R, E>(
        self,
        scope: MatchScope,
        repo: R,
        embedder: Arc<E>,
    ) -> Result<MatchStats, MatchError>
    where
        R: MatchRepository + Send + 'static,
        E: Embedder + ?Sized + 'static,
    {
        tokio::task::spawn_blocking(move || self.recompute(&scope, &repo, embedder.as_ref()))
            .await
            .map_err(|error| MatchError::Task(error.to_string()))?
    }
}
