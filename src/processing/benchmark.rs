use crate::domain::scope::MatchScope;
use crate::processing::matching::MatchStats;
use crate::processing::{JobContext, JobError, JobRepository, run_blocking};

/// Rematches one benchmark against every product.
///
/// The benchmark's `processing` flag is set for the duration of the run and
/// cleared afterwards whatever the outcome.
pub async fn process_benchmark_job<R>(
    benchmark_id: i32,
    ctx: JobContext<R>,
) -> Result<MatchStats, JobError>
where
    R: JobRepository,
{
    log::info!("Received benchmark: {benchmark_id}");

    let repo = ctx.repo.clone();
    match run_blocking(move || Ok(repo.set_benchmark_processing(benchmark_id, true)?)).await {
        Ok(0) => log::warn!("Benchmark {benchmark_id} not found"),
        Ok(_) => {}
        Err(e) => log::error!("Failed to set benchmark processing: {e}"),
    }

    let outcome = ctx
        .engine
        .recompute_blocking(
            MatchScope::Benchmark(benchmark_id),
            ctx.repo.clone(),
            ctx.embedder.clone(),
        )
        .await
        .map_err(JobError::from);

    let repo = ctx.repo.clone();
    if let Err(e) =
        run_blocking(move || Ok(repo.set_benchmark_processing(benchmark_id, false)?)).await
    {
        log::error!("Failed to reset benchmark {benchmark_id} processing: {e}");
    }

    if let Ok(stats) = &outcome {
        log::info!(
            "Finished processing benchmark: {benchmark_id}, associations={}",
            stats.associations_written
        );
    }
    outcome
}
