use diesel::prelude::*;

use crate::domain::benchmark::Benchmark;
use crate::models::benchmark::Benchmark as DbBenchmark;
use crate::processing::embedding::encode_embedding;
use crate::repository::{
    BenchmarkReader, BenchmarkScope, BenchmarkWriter, DieselRepository, RepositoryResult,
};

impl BenchmarkReader for DieselRepository {
    fn list_benchmarks(&self, scope: BenchmarkScope) -> RepositoryResult<Vec<Benchmark>> {
        use crate::schema::benchmarks;

        let mut conn = self.conn()?;

        let mut query = benchmarks::table.into_boxed();
        if let BenchmarkScope::Id(benchmark_id) = scope {
            query = query.filter(benchmarks::id.eq(benchmark_id));
        }

        let benchmarks = query
            .order(benchmarks::id.asc())
            .load::<DbBenchmark>(&mut conn)?;

        Ok(benchmarks.into_iter().map(Into::into).collect())
    }
}

impl BenchmarkWriter for DieselRepository {
    fn set_benchmark_embedding(
        &self,
        benchmark_id: i32,
        embedding: &[f32],
    ) -> RepositoryResult<usize> {
        use crate::schema::benchmarks;

        let mut conn = self.conn()?;

        let blob = encode_embedding(embedding);

        let affected = diesel::update(benchmarks::table.filter(benchmarks::id.eq(benchmark_id)))
            .set(benchmarks::embedding.eq(blob))
            .execute(&mut conn)?;

        Ok(affected)
    }

    fn set_benchmark_processing(
        &self,
        benchmark_id: i32,
        processing: bool,
    ) -> RepositoryResult<usize> {
        use crate::schema::benchmarks;

        let mut conn = self.conn()?;

        let affected = diesel::update(benchmarks::table.filter(benchmarks::id.eq(benchmark_id)))
            .set(benchmarks::processing.eq(processing))
            .execute(&mut conn)?;

        Ok(affected)
    }
}
