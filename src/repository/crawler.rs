use diesel::prelude::*;

use crate::domain::crawler::Crawler;
use crate::models::crawler::Crawler as DbCrawler;
use crate::repository::{CrawlerReader, CrawlerWriter, DieselRepository, RepositoryResult};

impl CrawlerReader for DieselRepository {
    fn get_crawler(&self, selector: &str) -> RepositoryResult<Crawler> {
        use crate::schema::crawlers;

        let mut conn = self.conn()?;

        // Query the crawler by its unique selector
        let result = crawlers::table
            .filter(crawlers::selector.eq(selector))
            .first::<DbCrawler>(&mut conn)?;

        Ok(result.into())
    }
}

impl CrawlerWriter for DieselRepository {
    fn set_crawler_processing(&self, crawler_id: i32, processing: bool) -> RepositoryResult<usize> {
        use crate::schema::crawlers;

        let mut conn = self.conn()?;

        let affected = diesel::update(crawlers::table.filter(crawlers::id.eq(crawler_id)))
            .set(crawlers::processing.eq(processing))
            .execute(&mut conn)?;

        Ok(affected)
    }

    fn set_crawler_status(
        &self,
        crawler_id: i32,
        processing: bool,
        num_products: Option<i32>,
    ) -> RepositoryResult<usize> {
        use crate::schema::crawlers;

        let mut conn = self.conn()?;
        let target = crawlers::table.filter(crawlers::id.eq(crawler_id));

        let affected = match num_products {
            Some(count) => diesel::update(target)
                .set((
                    crawlers::updated_at.eq(diesel::dsl::now),
                    crawlers::processing.eq(processing),
                    crawlers::num_products.eq(count),
                ))
                .execute(&mut conn)?,
            None => diesel::update(target)
                .set((
                    crawlers::updated_at.eq(diesel::dsl::now),
                    crawlers::processing.eq(processing),
                ))
                .execute(&mut conn)?,
        };

        Ok(affected)
    }
}
