use crate::db::{DbConnection, DbPool};
use crate::domain::association::Association;
use crate::domain::benchmark::Benchmark;
use crate::domain::crawler::Crawler;
use crate::domain::product::{NewProduct, Product};
use crate::domain::scope::MatchScope;

pub mod association;
pub mod benchmark;
pub mod crawler;
pub mod errors;
pub mod product;

pub use errors::{RepositoryError, RepositoryResult};

/// Which products a read covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProductScope {
    All,
    Crawler(String),
}

/// Which benchmarks a read covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BenchmarkScope {
    All,
    Id(i32),
}

impl From<&MatchScope> for ProductScope {
    fn from(scope: &MatchScope) -> Self {
        match scope {
            MatchScope::Crawler(selector) => Self::Crawler(selector.clone()),
            MatchScope::Benchmark(_) => Self::All,
        }
    }
}

impl From<&MatchScope> for BenchmarkScope {
    fn from(scope: &MatchScope) -> Self {
        match scope {
            MatchScope::Crawler(_) => Self::All,
            MatchScope::Benchmark(id) => Self::Id(*id),
        }
    }
}

pub trait CrawlerReader {
    fn get_crawler(&self, selector: &str) -> RepositoryResult<Crawler>;
}

pub trait CrawlerWriter {
    fn set_crawler_processing(&self, crawler_id: i32, processing: bool) -> RepositoryResult<usize>;
    /// Update the processing flag and touch `updated_at`; `num_products` is
    /// left unchanged when `None`.
    fn set_crawler_status(
        &self,
        crawler_id: i32,
        processing: bool,
        num_products: Option<i32>,
    ) -> RepositoryResult<usize>;
}

pub trait ProductReader {
    fn list_products(&self, scope: &ProductScope) -> RepositoryResult<Vec<Product>>;
}

pub trait ProductWriter {
    /// Atomically replace every product of a crawler, dropping the
    /// associations of the old rows.
    fn replace_products(&self, crawler_id: i32, products: &[NewProduct])
    -> RepositoryResult<usize>;
    fn set_product_embedding(&self, product_id: i32, embedding: &[f32]) -> RepositoryResult<usize>;
}

pub trait BenchmarkReader {
    fn list_benchmarks(&self, scope: BenchmarkScope) -> RepositoryResult<Vec<Benchmark>>;
}

pub trait BenchmarkWriter {
    fn set_benchmark_embedding(
        &self,
        benchmark_id: i32,
        embedding: &[f32],
    ) -> RepositoryResult<usize>;
    fn set_benchmark_processing(&self, benchmark_id: i32, processing: bool)
    -> RepositoryResult<usize>;
}

pub trait AssociationReader {
    fn list_associations(&self, scope: &MatchScope) -> RepositoryResult<Vec<Association>>;
}

pub trait AssociationWriter {
    fn delete_associations(&self, scope: &MatchScope) -> RepositoryResult<usize>;
    fn insert_associations(&self, associations: &[Association]) -> RepositoryResult<usize>;
    /// Delete everything in `scope` and insert `associations` in one transaction.
    fn replace_associations(
        &self,
        scope: &MatchScope,
        associations: &[Association],
    ) -> RepositoryResult<usize>;
}

/// Diesel-backed repository over the shared SQLite database.
#[derive(Clone)]
pub struct DieselRepository {
    pool: DbPool,
}

impl DieselRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> RepositoryResult<DbConnection> {
        Ok(self.pool.get()?)
    }
}
