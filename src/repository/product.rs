use chrono::Utc;
use diesel::prelude::*;

use crate::domain::product::{NewProduct, Product};
use crate::models::product::{NewProduct as DbNewProduct, Product as DbProduct};
use crate::processing::embedding::encode_embedding;
use crate::repository::{
    DieselRepository, ProductReader, ProductScope, ProductWriter, RepositoryError,
    RepositoryResult,
};

/// Rows per INSERT statement, keeping bind parameters well under SQLite's limit.
const INSERT_CHUNK_SIZE: usize = 500;

impl ProductReader for DieselRepository {
    fn list_products(&self, scope: &ProductScope) -> RepositoryResult<Vec<Product>> {
        use crate::schema::{crawlers, products};

        let mut conn = self.conn()?;

        let products = match scope {
            ProductScope::All => products::table
                .order(products::id.asc())
                .load::<DbProduct>(&mut conn)?,
            ProductScope::Crawler(selector) => {
                let crawler_id = crawlers::table
                    .filter(crawlers::selector.eq(selector))
                    .select(crawlers::id)
                    .first::<i32>(&mut conn)
                    .optional()?;
                let Some(crawler_id) = crawler_id else {
                    return Ok(Vec::new());
                };
                products::table
                    .filter(products::crawler_id.eq(crawler_id))
                    .order(products::id.asc())
                    .load::<DbProduct>(&mut conn)?
            }
        };

        Ok(products.into_iter().map(Into::into).collect())
    }
}

impl ProductWriter for DieselRepository {
    fn replace_products(
        &self,
        crawler_id: i32,
        products: &[NewProduct],
    ) -> RepositoryResult<usize> {
        use crate::schema::{product_benchmark, products};

        if let Some(foreign) = products.iter().find(|p| p.crawler_id != crawler_id) {
            return Err(RepositoryError::ValidationError(format!(
                "product {} belongs to crawler {}, not {crawler_id}",
                foreign.url, foreign.crawler_id
            )));
        }

        let mut conn = self.conn()?;
        let now = Utc::now().naive_utc();

        let inserted = conn.transaction(|conn| {
            // Associations of the old rows go first so no match outlives its product
            let ids: Vec<i32> = products::table
                .filter(products::crawler_id.eq(crawler_id))
                .select(products::id)
                .load(conn)?;

            if !ids.is_empty() {
                diesel::delete(
                    product_benchmark::table.filter(product_benchmark::product_id.eq_any(&ids)),
                )
                .execute(conn)?;
            }

            diesel::delete(products::table.filter(products::crawler_id.eq(crawler_id)))
                .execute(conn)?;

            let rows = products
                .iter()
                .map(|product| DbNewProduct::from_domain(product, now))
                .collect::<Vec<_>>();

            let mut inserted_rows = 0;
            for chunk in rows.chunks(INSERT_CHUNK_SIZE) {
                inserted_rows += diesel::insert_into(products::table)
                    .values(chunk)
                    .execute(conn)?;
            }
            Ok::<usize, RepositoryError>(inserted_rows)
        })?;

        Ok(inserted)
    }

    fn set_product_embedding(&self, product_id: i32, embedding: &[f32]) -> RepositoryResult<usize> {
        use crate::schema::products;

        let mut conn = self.conn()?;

        let blob = encode_embedding(embedding);

        let affected = diesel::update(products::table.filter(products::id.eq(product_id)))
            .set(products::embedding.eq(blob))
            .execute(&mut conn)?;

        Ok(affected)
    }
}
