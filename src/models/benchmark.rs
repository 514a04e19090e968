use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::domain::benchmark::Benchmark as DomainBenchmark;
use crate::processing::embedding::decode_embedding;

#[derive(Debug, Clone, Identifiable, Queryable)]
#[diesel(table_name = crate::schema::benchmarks)]
pub struct Benchmark {
    pub id: i32,
    pub hub_id: i32,
    pub name: String,
    pub sku: String,
    pub category: String,
    pub units: String,
    pub price: f64,
    pub amount: f64,
    pub description: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub embedding: Option<Vec<u8>>,
    pub processing: bool,
}

impl From<Benchmark> for DomainBenchmark {
    fn from(benchmark: Benchmark) -> Self {
        let embedding = benchmark.embedding.as_deref().and_then(|blob| {
            let decoded = decode_embedding(blob);
            if decoded.is_none() {
                log::warn!(
                    "Ignoring malformed embedding blob for benchmark {} ({} bytes)",
                    benchmark.id,
                    blob.len()
                );
            }
            decoded
        });

        Self {
            id: benchmark.id,
            hub_id: benchmark.hub_id,
            name: benchmark.name,
            sku: benchmark.sku,
            category: benchmark.category,
            units: benchmark.units,
            price: benchmark.price,
            amount: benchmark.amount,
            description: benchmark.description,
            created_at: benchmark.created_at,
            updated_at: benchmark.updated_at,
            embedding,
            processing: benchmark.processing,
        }
    }
}
