use std::collections::HashSet;
use std::sync::LazyLock;

use async_trait::async_trait;
use html_escape::decode_html_entities;
use scraper::{Html, Selector};
use serde::Deserialize;
use url::Url;

use crate::crawlers::{
    Category, CrawlerError, CrawlerResult, HttpFetcher, WebstoreCrawler, category_id, non_empty,
    page_urls, parse_decimal, selector,
};
use crate::domain::product::NewProduct;

static CATEGORY_LINK: LazyLock<Selector> =
    LazyLock::new(|| selector("a.header__collections-link"));
static PAGINATION: LazyLock<Selector> = LazyLock::new(|| selector("div.pagination-items"));
static PAGINATION_LINK: LazyLock<Selector> = LazyLock::new(|| selector("a.pagination-link"));
static PRODUCT_LINK: LazyLock<Selector> =
    LazyLock::new(|| selector("div.product-preview__title > a"));
static NAME: LazyLock<Selector> = LazyLock::new(|| selector("h1.product__title"));
static DESCRIPTION: LazyLock<Selector> =
    LazyLock::new(|| selector("div.product__short-description"));
static BREADCRUMB: LazyLock<Selector> = LazyLock::new(|| selector("ul.breadcrumb li a"));
static PRODUCT_FORM: LazyLock<Selector> = LazyLock::new(|| selector("form.product"));
static SKU: LazyLock<Selector> = LazyLock::new(|| selector("span.sku-value"));

const PAGE_PARAM: &str = "page";

#[derive(Debug, Deserialize, Clone)]
struct Variant {
    id: Option<u64>,
    sku: String,
    price: String,
    weight: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProductJson {
    variants: Vec<Variant>,
}

/// Fields shared by every variant on a product page.
struct ProductPage<'a> {
    crawler_id: i32,
    name: &'a str,
    category: Option<&'a str>,
    description: Option<&'a str>,
    url: &'a str,
}

impl ProductPage<'_> {
    /// Page URL with a `variant` query pair, so every variant is stored
    /// under its own URL. Falls back to the SKU when the id is missing.
    fn variant_url(&self, v: &Variant) -> String {
        let key = v
            .id
            .map(|id| id.to_string())
            .or_else(|| non_empty(&v.sku));
        match (key, Url::parse(self.url)) {
            (Some(key), Ok(mut url)) => {
                url.query_pairs_mut().append_pair("variant", &key);
                url.to_string()
            }
            _ => self.url.to_string(),
        }
    }

    fn variant_to_product(&self, v: Variant) -> NewProduct {
        let url = self.variant_url(&v);
        let (units, amount) = match v.weight.as_deref().and_then(parse_decimal) {
            Some(weight) => ("кг", weight),
            None => ("шт", 1.0),
        };

        NewProduct {
            crawler_id: self.crawler_id,
            name: self.name.to_string(),
            sku: v.sku,
            category: self.category.map(str::to_string),
            units: Some(units.to_string()),
            price: parse_decimal(&v.price).unwrap_or_default(),
            amount: Some(amount),
            description: self.description.map(str::to_string),
            url,
        }
    }
}

/// Crawler for `shop.rusteaco.ru`. Product pages carry their variants as
/// JSON; each variant becomes its own product.
pub struct WebstoreCrawlerRusteaco {
    crawler_id: i32,
    base_url: Url,
    http: HttpFetcher,
}

impl WebstoreCrawlerRusteaco {
    pub fn new(http: HttpFetcher, crawler_id: i32) -> CrawlerResult<Self> {
        Ok(Self {
            crawler_id,
            base_url: Url::parse("https://shop.rusteaco.ru/")
                .map_err(|e| CrawlerError::Build(e.to_string()))?,
            http,
        })
    }

    async fn get_product(&self, url: &str) -> CrawlerResult<Vec<NewProduct>> {
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
    let mut seen = HashSet::new();
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
        .filter(|category| seen.insert(category.url.clone()))
        .collect()
}

fn parse_last_page(body: &str) -> Option<usize> {
    let document = Html::parse_document(body);
    let pagination = document.select(&PAGINATION).next()?;
    pagination
        .select(&PAGINATION_LINK)
        .filter_map(|link| link.text().collect::<String>().trim().parse().ok())
        .max()
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

fn parse_product(body: &str, crawler_id: i32, url: &str) -> CrawlerResult<Vec<NewProduct>> {
    let parse_error = |reason: String| CrawlerError::Parse {
        url: url.to_string(),
        reason,
    };
    let document = Html::parse_document(body);

    let name = text_of(&document, &NAME).ok_or_else(|| parse_error("missing title".into()))?;
    let description = text_of(&document, &DESCRIPTION);
    let category = non_empty(
        &document
            .select(&BREADCRUMB)
            .filter_map(|el| non_empty(&el.text().collect::<String>()))
            .collect::<Vec<_>>()
            .join(" / "),
    );
    let page = ProductPage {
        crawler_id,
        name: &name,
        category: category.as_deref(),
        description: description.as_deref(),
        url,
    };

    let form = document
        .select(&PRODUCT_FORM)
        .next()
        .ok_or_else(|| parse_error("missing form.product".into()))?;

    match form.value().attr("data-product-json") {
        Some(json_raw) => {
            let json_str = decode_html_entities(json_raw);
            let parsed: ProductJson =
                serde_json::from_str(&json_str).map_err(|e| parse_error(e.to_string()))?;
            Ok(parsed
                .variants
                .into_iter()
                .map(|v| page.variant_to_product(v))
                .collect())
        }
        None => Ok(vec![NewProduct {
            crawler_id,
            name: name.clone(),
            sku: text_of(&document, &SKU).unwrap_or_default(),
            category: category.clone(),
            units: Some("шт".to_string()),
            price: 0.0,
            amount: Some(1.0),
            description: description.clone(),
            url: url.to_string(),
        }]),
    }
}

#[async_trait]
impl WebstoreCrawler for WebstoreCrawlerRusteaco {
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
            .filter_map(|products| {
                products
                    .inspect_err(|e| log::warn!("Failed to parse product: {e}"))
                    .ok()
            })
            .flatten()
            .collect()
    }
}
