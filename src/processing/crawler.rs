use std::collections::HashSet;

use crate::domain::product::NewProduct;
use crate::domain::scope::MatchScope;
use crate::processing::{JobContext, JobError, JobRepository, run_blocking};

/// Keeps the first product seen for every URL.
pub fn dedup_by_url(mut products: Vec<NewProduct>) -> Vec<NewProduct> {
    let mut seen_urls = HashSet::new();
    products.retain(|p| seen_urls.insert(p.url.clone()));
    products
}

/// Scrapes a crawler's store, replaces its products and rematches them.
///
/// Once the crawler row is resolved its `processing` flag is cleared on
/// every exit path. `num_products` is only updated when the new product
/// set was stored; a failed rematch afterwards does not undo that.
pub async fn process_crawler_job<R>(selector: String, ctx: JobContext<R>) -> Result<usize, JobError>
where
    R: JobRepository,
{
    log::info!("Received crawler: {selector}");

    let repo = ctx.repo.clone();
    let lookup = selector.clone();
    let crawler = run_blocking(move || Ok(repo.get_crawler(&lookup)?)).await?;
    let crawler_id = crawler.id;

    if crawler.processing {
        log::warn!("Crawler {selector} was left marked as processing, taking it over");
    }

    let repo = ctx.repo.clone();
    if let Err(e) = run_blocking(move || Ok(repo.set_crawler_processing(crawler_id, true)?)).await
    {
        log::error!("Failed to set crawler processing: {e}");
    }

    let outcome = match tokio::spawn(crawl(selector.clone(), crawler_id, ctx.clone())).await {
        Ok(outcome) => outcome,
        Err(e) => Err(JobError::Panicked(e.to_string())),
    };

    let num_products = outcome
        .as_ref()
        .ok()
        .and_then(|&count| i32::try_from(count).ok());
    let repo = ctx.repo.clone();
    if let Err(e) = run_blocking(move || {
        Ok(repo.set_crawler_status(crawler_id, false, num_products)?)
    })
    .await
    {
        log::error!("Failed to reset crawler {selector} status: {e}");
    }

    if let Ok(count) = &outcome {
        log::info!("Finished processing crawler: {selector}, products={count}");
    }
    outcome
}

async fn crawl<R>(selector: String, crawler_id: i32, ctx: JobContext<R>) -> Result<usize, JobError>
where
    R: JobRepository,
{
    let scraper = ctx.registry.build(&selector, crawler_id)?;
    let products = dedup_by_url(scraper.get_products().await);
    log::info!("Scraped {} products for crawler {selector}", products.len());

    let repo = ctx.repo.clone();
    let stored = run_blocking(move || Ok(repo.replace_products(crawler_id, &products)?)).await?;

    if stored > 0
        && let Err(e) = ctx
            .engine
            .recompute_blocking(
                MatchScope::Crawler(selector.clone()),
                ctx.repo.clone(),
                ctx.embedder.clone(),
            )
            .await
    {
        log::error!("Failed to match products of crawler {selector}: {e}");
    }

    Ok(stored)
}
