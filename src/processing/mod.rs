use std::sync::Arc;

use thiserror::Error;

use crate::crawlers::{CrawlerError, CrawlerRegistry};
use crate::repository::{
    AssociationWriter, BenchmarkReader, BenchmarkWriter, CrawlerReader, CrawlerWriter,
    ProductReader, ProductWriter, RepositoryError,
};

pub mod benchmark;
pub mod crawler;
pub mod dispatcher;
pub mod embedding;
pub mod index;
pub mod listener;
pub mod matching;

use embedding::Embedder;
use matching::{MatchError, MatchingEngine};

/// Failures a single job can end with. None of them stop the dispatch loop.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("unknown job key: {0}")]
    UnknownJobKey(String),
    #[error("job already running: {0}")]
    DuplicateJobKey(String),
    #[error("scrape failed: {0}")]
    Scrape(#[from] CrawlerError),
    #[error("persistence failed: {0}")]
    Persistence(#[from] RepositoryError),
    #[error("matching failed: {0}")]
    Matching(#[from] MatchError),
    #[error("job panicked: {0}")]
    Panicked(String),
}

/// Repository surface needed by the matching engine.
pub trait MatchRepository:
    ProductReader + ProductWriter + BenchmarkReader + BenchmarkWriter + AssociationWriter
{
}

impl<T> MatchRepository for T where
    T: ProductReader + ProductWriter + BenchmarkReader + BenchmarkWriter + AssociationWriter
{
}

/// Repository surface needed by crawl and recompute jobs.
pub trait JobRepository:
    MatchRepository + CrawlerReader + CrawlerWriter + Clone + Send + Sync + 'static
{
}

impl<T> JobRepository for T where
    T: MatchRepository + CrawlerReader + CrawlerWriter + Clone + Send + Sync + 'static
{
}

/// Run synchronous repository work off the async workers.
pub(crate) async fn run_blocking<T, F>(work: F) -> Result<T, JobError>
where
    F: FnOnce() -> Result<T, JobError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|error| JobError::Panicked(error.to_string()))?
}

/// Everything a job needs besides its key.
#[derive(Clone)]
pub struct JobContext<R> {
    pub repo: R,
    pub registry: Arc<dyn CrawlerRegistry>,
    pub embedder: Arc<dyn Embedder>,
    pub engine: MatchingEngine,
}
