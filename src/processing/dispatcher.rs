//! Turns inbound job keys into at most one running job per key.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::crawlers::CrawlerRegistry;
use crate::processing::benchmark::process_benchmark_job;
use crate::processing::crawler::process_crawler_job;
use crate::processing::{JobContext, JobError, JobRepository};

/// A unit of work selected by a job key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Job {
    Crawl(String),
    BenchmarkRecompute(i32),
}

impl Job {
    /// Canonical key used for in-flight deduplication.
    pub fn key(&self) -> String {
        match self {
            Job::Crawl(selector) => selector.clone(),
            Job::BenchmarkRecompute(id) => id.to_string(),
        }
    }
}

/// Decides what a key means.
///
/// A decimal key is a benchmark id; anything else must be a registered
/// crawler selector.
pub fn classify(key: &str, registry: &dyn CrawlerRegistry) -> Result<Job, JobError> {
    if !key.is_empty() && key.bytes().all(|b| b.is_ascii_digit()) {
        return key
            .parse()
            .map(Job::BenchmarkRecompute)
            .map_err(|_| JobError::UnknownJobKey(key.to_string()));
    }
    if registry.contains(key) {
        return Ok(Job::Crawl(key.to_string()));
    }
    Err(JobError::UnknownJobKey(key.to_string()))
}

#[derive(Clone, Default)]
struct InFlightRegistry {
    keys: Arc<Mutex<HashSet<String>>>,
}

impl InFlightRegistry {
    fn lock(keys: &Mutex<HashSet<String>>) -> MutexGuard<'_, HashSet<String>> {
        keys.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn try_admit(&self, key: String) -> Option<InFlightSlot> {
        if !Self::lock(&self.keys).insert(key.clone()) {
            return None;
        }
        Some(InFlightSlot {
            key,
            keys: self.keys.clone(),
        })
    }

    #[cfg(test)]
    fn contains(&self, key: &str) -> bool {
        Self::lock(&self.keys).contains(key)
    }
}

/// Holds a key in the in-flight set until dropped.
struct InFlightSlot {
    key: String,
    keys: Arc<Mutex<HashSet<String>>>,
}

impl Drop for InFlightSlot {
    fn drop(&mut self) {
        InFlightRegistry::lock(&self.keys).remove(&self.key);
    }
}

pub struct Dispatcher<R> {
    ctx: JobContext<R>,
    in_flight: InFlightRegistry,
}

impl<R> Dispatcher<R>
where
    R: JobRepository,
{
    pub fn new(ctx: JobContext<R>) -> Self {
        Self {
            ctx,
            in_flight: InFlightRegistry::default(),
        }
    }

    /// Classifies `key` and starts its job unless one with the same key is
    /// already running. Never waits for the job itself.
    pub fn dispatch(&self, key: &str) -> Result<JoinHandle<()>, JobError> {
        let job = classify(key, self.ctx.registry.as_ref())?;
        let key = job.key();
        let slot = self
            .in_flight
            .try_admit(key.clone())
            .ok_or_else(|| JobError::DuplicateJobKey(key.clone()))?;
        let ctx = self.ctx.clone();

        Ok(tokio::spawn(async move {
            let _slot = slot;
            match tokio::spawn(run_job(job, ctx)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => log::error!("Job {key} failed: {e}"),
                Err(e) => log::error!("Job {key} panicked: {e}"),
            }
        }))
    }

    /// Dispatches keys until every sender is dropped.
    pub async fn run(self, mut receiver: mpsc::Receiver<String>) {
        while let Some(key) = receiver.recv().await {
            match self.dispatch(&key) {
                Ok(_) => {}
                Err(JobError::DuplicateJobKey(key)) => {
                    log::warn!("Job {key} is already running, skipping")
                }
                Err(e) => log::error!("Dropping message {key:?}: {e}"),
            }
        }
        log::info!("Job channel closed, dispatcher stopping");
    }
}

async fn run_job<R>(job: Job, ctx: JobContext<R>) -> Result<(), JobError>
where
    R: JobRepository,
{
    match job {
        Job::Crawl(selector) => process_crawler_job(selector, ctx).await.map(|_| ()),
        Job::BenchmarkRecompute(id) => process_benchmark_job(id, ctx).await.map(|_| ()),
    }
}
