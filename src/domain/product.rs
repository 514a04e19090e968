use chrono::NaiveDateTime;
use serde::Serialize;

/// A persisted product scraped by a crawler.
#[derive(Debug, Clone, Serialize)]
pub struct Product {
    pub id: i32,
    pub crawler_id: i32,
    pub name: String,
    pub sku: String,
    pub category: Option<String>,
    pub units: Option<String>,
    pub price: f64,
    pub amount: Option<f64>,
    pub description: Option<String>,
    pub url: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    #[serde(skip)]
    pub embedding: Option<Vec<f32>>,
}

/// A product as produced by a crawler, before it is stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewProduct {
    pub crawler_id: i32,
    pub name: String,
    pub sku: String,
    pub category: Option<String>,
    pub units: Option<String>,
    pub price: f64,
    pub amount: Option<f64>,
    pub description: Option<String>,
    pub url: String,
}
