use std::collections::HashMap;
use std::sync::{Arc, LazyLock, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::StatusCode;
use scraper::Selector;
use thiserror::Error;
use tokio::sync::Semaphore;
use url::Url;

use crate::domain::product::NewProduct;

pub mod rusteaco;
pub mod tea101;

use rusteaco::WebstoreCrawlerRusteaco;
use tea101::WebstoreCrawler101Tea;

#[derive(Debug, Error)]
pub enum CrawlerError {
    #[error("failed to build crawler: {0}")]
    Build(String),
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {status} for {url}")]
    Status { url: String, status: StatusCode },
    #[error("failed to parse {url}: {reason}")]
    Parse { url: String, reason: String },
}

pub type CrawlerResult<T> = Result<T, CrawlerError>;

/// A top-level catalog section of a web store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub url: String,
}

/// An abstraction over web store crawlers that produce [`NewProduct`]s.
///
/// Implementations swallow per-page failures: a category or page that cannot
/// be fetched or parsed only shrinks the result.
#[async_trait]
pub trait WebstoreCrawler: Send + Sync {
    /// Retrieves every category linked from the store's landing page.
    async fn list_categories(&self) -> Vec<Category>;

    /// Returns the listing pages of a category. The first element is always
    /// `category_url`, even when the category page cannot be fetched.
    async fn list_pages(&self, category_url: &str) -> Vec<String>;

    /// Returns the products found on a single listing page.
    async fn list_products(&self, page_url: &str) -> Vec<NewProduct>;

    /// Crawls the entire web store.
    ///
    /// Pages of all categories and products of all pages are fetched
    /// concurrently with `join_all`; the HTTP layer bounds how many requests
    /// are in flight.
    async fn get_products(&self) -> Vec<NewProduct> {
        let categories = self.list_categories().await;

        let tasks = categories.iter().map(|category| async move {
            log::info!("Processing category: {}", category.name);
            self.list_pages(&category.url).await
        });
        let pages = futures::future::join_all(tasks).await;

        let tasks = pages.iter().flatten().map(|page| self.list_products(page));
        let products = futures::future::join_all(tasks).await;

        products.into_iter().flatten().collect()
    }
}

/// Shared HTTP client with a per-request timeout and a bound on the number
/// of simultaneous requests.
pub struct HttpFetcher {
    client: reqwest::Client,
    semaphore: Arc<Semaphore>,
    kept: Mutex<HashMap<String, String>>,
}

impl HttpFetcher {
    pub fn new(concurrency: usize, timeout: Duration) -> CrawlerResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CrawlerError::Build(e.to_string()))?;
        Ok(Self {
            client,
            semaphore: Arc::new(Semaphore::new(concurrency)),
            kept: Mutex::new(HashMap::new()),
        })
    }

    fn kept(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.kept.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Like [`HttpFetcher::fetch`], but the body is also kept for the next
    /// `fetch` of the same URL, which then skips the request.
    pub async fn fetch_and_keep(&self, url: &str) -> CrawlerResult<String> {
        let body = self.fetch(url).await?;
        self.kept().insert(url.to_string(), body.clone());
        Ok(body)
    }

    /// Fetches a URL and returns its body.
    ///
    /// A permit is held for the whole request, so at most `concurrency`
    /// requests are in flight at once.
    pub async fn fetch(&self, url: &str) -> CrawlerResult<String> {
        if let Some(body) = self.kept().remove(url) {
            return Ok(body);
        }
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|e| CrawlerError::Build(e.to_string()))?;
        let res = self.client.get(url).send().await?;
        let status = res.status();
        if !status.is_success() {
            return Err(CrawlerError::Status {
                url: url.to_string(),
                status,
            });
        }
        Ok(res.text().await?)
    }
}

/// Stores this service knows how to crawl, keyed by selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlerKind {
    Tea101,
    Rusteaco,
}

impl CrawlerKind {
    pub const ALL: [CrawlerKind; 2] = [CrawlerKind::Tea101, CrawlerKind::Rusteaco];

    pub fn selector(self) -> &'static str {
        match self {
            CrawlerKind::Tea101 => "101tea",
            CrawlerKind::Rusteaco => "rusteaco",
        }
    }

    pub fn from_selector(selector: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.selector() == selector)
    }
}

/// Lookup of crawlers by selector.
pub trait CrawlerRegistry: Send + Sync {
    fn contains(&self, selector: &str) -> bool;

    /// Instantiates the crawler for `selector`; every product it yields
    /// carries `crawler_id`.
    fn build(&self, selector: &str, crawler_id: i32) -> CrawlerResult<Box<dyn WebstoreCrawler>>;
}

/// Registry over the compiled-in [`CrawlerKind`]s.
#[derive(Debug, Clone)]
pub struct StaticCrawlerRegistry {
    concurrency: usize,
    timeout: Duration,
}

impl StaticCrawlerRegistry {
    pub fn new(concurrency: usize, timeout: Duration) -> Self {
        Self {
            concurrency,
            timeout,
        }
    }
}

impl CrawlerRegistry for StaticCrawlerRegistry {
    fn contains(&self, selector: &str) -> bool {
        CrawlerKind::from_selector(selector).is_some()
    }

    fn build(&self, selector: &str, crawler_id: i32) -> CrawlerResult<Box<dyn WebstoreCrawler>> {
        let kind = CrawlerKind::from_selector(selector)
            .ok_or_else(|| CrawlerError::Build(format!("unknown crawler: {selector}")))?;
        let http = HttpFetcher::new(self.concurrency, self.timeout)?;
        Ok(match kind {
            CrawlerKind::Tea101 => Box::new(WebstoreCrawler101Tea::new(http, crawler_id)?),
            CrawlerKind::Rusteaco => Box::new(WebstoreCrawlerRusteaco::new(http, crawler_id)?),
        })
    }
}

static DECIMAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:[.,]\d+)?").expect("valid decimal regex"));

/// Parses a price-like string such as `"1 250,50 ₽"`.
pub fn parse_decimal(text: &str) -> Option<f64> {
    let compact: String = text
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{a0}')
        .collect();
    DECIMAL
        .find(&compact)
        .and_then(|m| m.as_str().replace(',', ".").parse().ok())
}

/// Collapses whitespace and maps empty strings to `None`.
pub fn non_empty(text: &str) -> Option<String> {
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.is_empty() { None } else { Some(text) }
}

pub(crate) fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("valid CSS selector")
}

/// Builds page URLs `2..=last_page` of a paginated listing by rewriting the
/// `param` query pair of `url`.
pub(crate) fn page_urls(url: &Url, param: &str, last_page: usize) -> Vec<String> {
    (2..=last_page)
        .map(|page| {
            let mut page_url = url.clone();
            let pairs: Vec<(String, String)> = page_url
                .query_pairs()
                .filter(|(k, _)| k != param)
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .chain(std::iter::once((param.to_string(), page.to_string())))
                .collect();
            page_url.set_query(None);
            page_url
                .query_pairs_mut()
                .extend_pairs(pairs.iter().map(|(k, v)| (&**k, &**v)));
            page_url.to_string()
        })
        .collect()
}

/// Category id derived from the last non-empty path segment of its URL.
pub(crate) fn category_id(url: &Url) -> String {
    url.path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .unwrap_or_default()
        .to_string()
}
