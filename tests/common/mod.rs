//! Helpers for integration tests.
#![allow(dead_code)]

use diesel::prelude::*;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use pushkind_matcher::db::{DbPool, establish_connection_pool};
use pushkind_matcher::domain::product::NewProduct;
use pushkind_matcher::processing::embedding::encode_embedding;
use pushkind_matcher::schema::{benchmarks, crawlers};
use tempfile::NamedTempFile;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

/// Temporary migrated database used in integration tests.
pub struct TestDb {
    _tempfile: NamedTempFile,
    pool: DbPool,
}

impl TestDb {
    pub fn new() -> Self {
        let tempfile = NamedTempFile::new().expect("Failed to create temp file");
        let path = tempfile.path().to_str().expect("utf-8 temp path");
        let pool = establish_connection_pool(path).expect("Failed to establish SQLite connection.");
        let mut conn = pool
            .get()
            .expect("Failed to get SQLite connection from pool.");
        conn.run_pending_migrations(MIGRATIONS)
            .expect("Migrations failed");
        TestDb {
            _tempfile: tempfile,
            pool,
        }
    }

    pub fn pool(&self) -> DbPool {
        self.pool.clone()
    }

    pub fn insert_crawler(&self, selector: &str) -> i32 {
        let mut conn = self.pool.get().expect("connection");
        diesel::insert_into(crawlers::table)
            .values((
                crawlers::hub_id.eq(1),
                crawlers::name.eq(selector),
                crawlers::url.eq(format!("https://{selector}.example")),
                crawlers::selector.eq(selector),
            ))
            .returning(crawlers::id)
            .get_result(&mut conn)
            .expect("should insert crawler")
    }

    pub fn insert_benchmark(&self, name: &str, embedding: Option<&[f32]>) -> i32 {
        let mut conn = self.pool.get().expect("connection");
        diesel::insert_into(benchmarks::table)
            .values((
                benchmarks::hub_id.eq(1),
                benchmarks::name.eq(name),
                benchmarks::sku.eq(format!("B-{name}")),
                benchmarks::category.eq("tea"),
                benchmarks::units.eq("kg"),
                benchmarks::price.eq(1.0),
                benchmarks::amount.eq(1.0),
                benchmarks::description.eq(""),
                benchmarks::embedding.eq(embedding.map(encode_embedding)),
            ))
            .returning(benchmarks::id)
            .get_result(&mut conn)
            .expect("should insert benchmark")
    }
}

pub fn new_product(crawler_id: i32, name: &str, url: &str) -> NewProduct {
    NewProduct {
        crawler_id,
        name: name.to_string(),
        sku: name.to_uppercase(),
        category: Some("tea".to_string()),
        units: None,
        price: 10.0,
        amount: None,
        description: None,
        url: url.to_string(),
    }
}
