use std::collections::HashSet;

use diesel::prelude::*;

use crate::db::DbConnection;
use crate::domain::association::Association;
use crate::domain::scope::MatchScope;
use crate::repository::{
    AssociationReader, AssociationWriter, DieselRepository, RepositoryError, RepositoryResult,
};
use crate::schema::product_benchmark;

const INSERT_CHUNK_SIZE: usize = 1000;

#[derive(Insertable)]
#[diesel(table_name = product_benchmark)]
struct NewAssociation {
    product_id: i32,
    benchmark_id: i32,
    distance: f32,
}

impl From<&Association> for NewAssociation {
    fn from(association: &Association) -> Self {
        Self {
            product_id: association.product_id,
            benchmark_id: association.benchmark_id,
            distance: association.similarity,
        }
    }
}

/// Ids of the products owned by the crawler with `selector`.
fn crawler_product_ids(conn: &mut DbConnection, selector: &str) -> QueryResult<Vec<i32>> {
    use crate::schema::{crawlers, products};

    products::table
        .inner_join(crawlers::table)
        .filter(crawlers::selector.eq(selector))
        .select(products::id)
        .load(conn)
}

fn delete_in_scope(conn: &mut DbConnection, scope: &MatchScope) -> QueryResult<usize> {
    match scope {
        MatchScope::Crawler(selector) => {
            let ids = crawler_product_ids(conn, selector)?;
            if ids.is_empty() {
                return Ok(0);
            }
            diesel::delete(product_benchmark::table.filter(product_benchmark::product_id.eq_any(&ids)))
                .execute(conn)
        }
        MatchScope::Benchmark(benchmark_id) => diesel::delete(
            product_benchmark::table.filter(product_benchmark::benchmark_id.eq(*benchmark_id)),
        )
        .execute(conn),
    }
}

/// Keeps the associations whose product and benchmark rows still exist.
///
/// A concurrent crawl may replace products after they were loaded for
/// matching; rows pointing at them are dropped instead of failing the
/// foreign key check.
fn live_associations<'a>(
    conn: &mut DbConnection,
    associations: &'a [Association],
) -> QueryResult<Vec<&'a Association>> {
    use crate::schema::{benchmarks, products};

    let product_ids: Vec<i32> = associations
        .iter()
        .map(|a| a.product_id)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    let benchmark_ids: Vec<i32> = associations
        .iter()
        .map(|a| a.benchmark_id)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();

    let mut live_products = HashSet::new();
    for chunk in product_ids.chunks(INSERT_CHUNK_SIZE) {
        live_products.extend(
            products::table
                .filter(products::id.eq_any(chunk))
                .select(products::id)
                .load::<i32>(conn)?,
        );
    }
    let mut live_benchmarks = HashSet::new();
    for chunk in benchmark_ids.chunks(INSERT_CHUNK_SIZE) {
        live_benchmarks.extend(
            benchmarks::table
                .filter(benchmarks::id.eq_any(chunk))
                .select(benchmarks::id)
                .load::<i32>(conn)?,
        );
    }

    Ok(associations
        .iter()
        .filter(|a| {
            live_products.contains(&a.product_id) && live_benchmarks.contains(&a.benchmark_id)
        })
        .collect())
}

fn insert_rows<'a>(
    conn: &mut DbConnection,
    associations: impl IntoIterator<Item = &'a Association>,
) -> QueryResult<usize> {
    let rows = associations
        .into_iter()
        .map(NewAssociation::from)
        .collect::<Vec<_>>();

    let mut inserted = 0;
    for chunk in rows.chunks(INSERT_CHUNK_SIZE) {
        inserted += diesel::insert_into(product_benchmark::table)
            .values(chunk)
            .execute(conn)?;
    }
    Ok(inserted)
}

impl AssociationReader for DieselRepository {
    fn list_associations(&self, scope: &MatchScope) -> RepositoryResult<Vec<Association>> {
        let mut conn = self.conn()?;

        let rows: Vec<(i32, i32, f32)> = match scope {
            MatchScope::Crawler(selector) => {
                let ids = crawler_product_ids(&mut conn, selector)?;
                product_benchmark::table
                    .filter(product_benchmark::product_id.eq_any(&ids))
                    .order((product_benchmark::benchmark_id, product_benchmark::product_id))
                    .load(&mut conn)?
            }
            MatchScope::Benchmark(benchmark_id) => product_benchmark::table
                .filter(product_benchmark::benchmark_id.eq(*benchmark_id))
                .order((product_benchmark::benchmark_id, product_benchmark::product_id))
                .load(&mut conn)?,
        };

        Ok(rows
            .into_iter()
            .map(|(product_id, benchmark_id, similarity)| Association {
                product_id,
                benchmark_id,
                similarity,
            })
            .collect())
    }
}

impl AssociationWriter for DieselRepository {
    fn delete_associations(&self, scope: &MatchScope) -> RepositoryResult<usize> {
        let mut conn = self.conn()?;

        let deleted = conn.transaction(|conn| delete_in_scope(conn, scope))?;

        Ok(deleted)
    }

    fn insert_associations(&self, associations: &[Association]) -> RepositoryResult<usize> {
        if associations.is_empty() {
            return Ok(0);
        }

        let mut conn = self.conn()?;

        let inserted = conn.transaction(|conn| insert_rows(conn, associations))?;

        Ok(inserted)
    }

    fn replace_associations(
        &self,
        scope: &MatchScope,
        associations: &[Association],
    ) -> RepositoryResult<usize> {
        let mut conn = self.conn()?;

        let inserted = conn.transaction(|conn| {
            let deleted = delete_in_scope(conn, scope)?;
            let live = live_associations(conn, associations)?;
            if live.len() < associations.len() {
                log::warn!(
                    "Skipping {} associations for {scope} whose rows were removed meanwhile",
                    associations.len() - live.len()
                );
            }
            let inserted = insert_rows(conn, live)?;
            log::debug!("Replaced associations for {scope}: deleted={deleted}, inserted={inserted}");
            Ok::<usize, RepositoryError>(inserted)
        })?;

        Ok(inserted)
    }
}
