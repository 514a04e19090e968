use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::domain::product::{NewProduct as DomainNewProduct, Product as DomainProduct};
use crate::processing::embedding::decode_embedding;

#[derive(Debug, Clone, Identifiable, Queryable)]
#[diesel(table_name = crate::schema::products)]
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
    pub embedding: Option<Vec<u8>>,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::products)]
pub struct NewProduct<'a> {
    pub crawler_id: i32,
    pub name: &'a str,
    pub sku: &'a str,
    pub category: Option<&'a str>,
    pub units: Option<&'a str>,
    pub price: f64,
    pub amount: Option<f64>,
    pub description: Option<&'a str>,
    pub url: &'a str,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<Product> for DomainProduct {
    fn from(product: Product) -> Self {
        let embedding = product.embedding.as_deref().and_then(|blob| {
            let decoded = decode_embedding(blob);
            if decoded.is_none() {
                log::warn!(
                    "Ignoring malformed embedding blob for product {} ({} bytes)",
                    product.id,
                    blob.len()
                );
            }
            decoded
        });

        Self {
            id: product.id,
            crawler_id: product.crawler_id,
            name: product.name,
            sku: product.sku,
            category: product.category,
            units: product.units,
            price: product.price,
            amount: product.amount,
            description: product.description,
            url: product.url,
            created_at: product.created_at,
            updated_at: product.updated_at,
            embedding,
        }
    }
}

impl<'a> NewProduct<'a> {
    /// Borrow a domain product for insertion, stamping both timestamps with `now`.
    pub fn from_domain(product: &'a DomainNewProduct, now: NaiveDateTime) -> Self {
        Self {
            crawler_id: product.crawler_id,
            name: product.name.as_str(),
            sku: product.sku.as_str(),
            category: product.category.as_deref(),
            units: product.units.as_deref(),
            price: product.price,
            amount: product.amount,
            description: product.description.as_deref(),
            url: product.url.as_str(),
            created_at: now,
            updated_at: now,
        }
    }
}
