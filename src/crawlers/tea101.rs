use std::collections::HashSet;
use std::sync::LazyLock;

use async_trait::async_trait;
use scraper::{Html, Selector};
use url::Url;

use crate::crawlers::{
    Category, CrawlerError, CrawlerResult, HttpFetcher, WebstoreCrawler, category_id, non_empty,
    page_urls, parse_decimal, selector,
};
use crate::domain::product::NewProduct;

static CATEGORY_LINK: LazyLock<Selector> = LazyLock::new(|| selector("a.catalog-nav__link"));
static PAGINATION: LazyLock<Selector> = LazyLock::new(|| selector("div.pagination"));
static PAGINATION_LINK: LazyLock<Selector> = LazyLock::new(|| selector("a.pagination-links"));
static PRODUCT_LINK: LazyLock<Selector> =
    LazyLock::new(|| selector("div.product-card__info-bottom > a"));
static NAME: LazyLock<Selector> = LazyLock::new(|| selector("h1"));
static DESCRIPTION: LazyLock<Selector> =
    LazyLock::new(|| selector("div.catalog-table_content-item_about_product"));
static BREADCRUMB: LazyLock<Selector> = LazyLock::new(|| selector("a.breadcrumbs__list-link"));
static PRICE: LazyLock<Selector> = LazyLock::new(|| selector("span.js-price-val"));
static SKU: LazyLock<Selector> = LazyLock::new(|| selector("div.product_art span:nth-child(2)"));
static UNITS: LazyLock<Selector> =
    LazyLock::new(|| selector("span.product-card__calculus-unit"));
static AMOUNT: LazyLock<Selector> = LazyLock::new(|| selector("span.js-product-calc-value"));

const PAGE_PARAM: &str = "PAGEN_1";

/// Crawler for `101tea.ru`.
pub struct WebstoreCrawler101Tea {
    crawler_id: i32,
    base_url: Url,
    http: HttpFetcher,
}

impl WebstoreCrawler101Tea {
    /// The `crawler_id` is attached to each produced product.
    pub fn new(http: HttpFetcher, crawler_id: i32) -> CrawlerResult<Self> {
        Ok(Self {
            crawler_id,
            base_url: Url::parse("https://101tea.ru/")
                .map_err(|e| CrawlerError::Build(e.to_string()))?,
            http,
        })
    }

    async fn get_product(&self, url: &str) -> CrawlerResult<NewProduct> {
        let body = self.http.fetch(url).await?;
        parse_product(&body, self.crawler_id, url)
    }
}

fn text_of(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .next()
        .and_then(|el| non_empty(&el.text().collect::<String>()))
}

fn parse_categories(body: &str, base_url: &Url) -> Vec<Category> {
    let document = Html::parse_document(body);
    document
        .select(&CATEGORY_LINK)
        .filter_map(|link| {
            let url = base_url.join(link.value().attr("href")?).ok()?;
            Some(Category {
                id: category_id(&url),
                name: non_empty(&link.text().collect::<String>()).unwrap_or_default(),
                url: url.to_string(),
            })
        })
        .collect()
}

fn parse_last_page(body: &str) -> Option<usize> {
    let document = Html::parse_document(body);
    let pagination = document.select(&PAGINATION).next()?;
    pagination
        .select(&PAGINATION_LINK)
        .last()
        .and_then(|link| link.text().collect::<String>().trim().parse().ok())
}

fn parse_product_links(body: &str, base_url: &Url) -> Vec<String> {
    let document = Html::parse_document(body);
    let mut seen = HashSet::new();
    document
        .select(&PRODUCT_LINK)
        .filter_map(|link| Some(base_url.join(link.value().attr("href")?).ok()?.to_string()))
        .filter(|link| seen.insert(link.clone()))
        .collect()
}

fn parse_product(body: &str, crawler_id: i32, url: &str) -> CrawlerResult<NewProduct> {
    let document = Html::parse_document(body);

    let name = text_of(&document, &NAME).ok_or_else(|| CrawlerError::Parse {
        url: url.to_string(),
        reason: "missing product name".to_string(),
    })?;

    let category = document
        .select(&BREADCRUMB)
        .filter_map(|el| non_empty(&el.text().collect::<String>()))
        .collect::<Vec<_>>()
        .join(" / ");

    Ok(NewProduct {
        crawler_id,
        name,
        sku: text_of(&document, &SKU).unwrap_or_default(),
        category: non_empty(&category),
        units: text_of(&document, &UNITS),
        price: text_of(&document, &PRICE)
            .and_then(|price| parse_decimal(&price))
            .unwrap_or_default(),
        amount: text_of(&document, &AMOUNT).and_then(|amount| parse_decimal(&amount)),
        description: text_of(&document, &DESCRIPTION),
        url: url.to_string(),
    })
}

#[async_trait]
impl WebstoreCrawler for WebstoreCrawler101Tea {
    async fn list_categories(&self) -> Vec<Category> {
        match self.http.fetch(self.base_url.as_str()).await {
            Ok(body) => parse_categories(&body, &self.base_url),
            Err(e) => {
                log::error!("Failed to fetch categories of {}: {e}", self.base_url);
                vec![]
            }
        }
    }

    async fn list_pages(&self, category_url: &str) -> Vec<String> {
        let mut result = vec![category_url.to_string()];
        let body = match self.http.fetch_and_keep(category_url).await {
            Ok(body) => body,
            Err(e) => {
                log::warn!("Failed to fetch pagination of {category_url}: {e}");
                return result;
            }
        };

        if let Some(last_page) = parse_last_page(&body)
            && let Ok(url) = self.base_url.join(category_url)
        {
            result.extend(page_urls(&url, PAGE_PARAM, last_page));
        }
        result
    }

    async fn list_products(&self, page_url: &str) -> Vec<NewProduct> {
        let links = match self.http.fetch(page_url).await {
            Ok(body) => parse_product_links(&body, &self.base_url),
            Err(e) => {
                log::warn!("Failed to fetch listing {page_url}: {e}");
                return vec![];
            }
        };

        let tasks = links.iter().map(|link| self.get_product(link));
        futures::future::join_all(tasks)
            .await
            .into_iter()
            .filter_map(|product| {
                product
                    .inspect_err(|e| log::warn!("Failed to parse product: {e}"))
                    .ok()
            })
            .collect()
    }
}
