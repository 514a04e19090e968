use pushkind_matcher::domain::association::Association;
use pushkind_matcher::domain::scope::MatchScope;
use pushkind_matcher::repository::{
    AssociationReader, AssociationWriter, BenchmarkReader, BenchmarkScope, BenchmarkWriter,
    CrawlerReader, CrawlerWriter, DieselRepository, ProductReader, ProductScope, ProductWriter,
    RepositoryError,
};

mod common;

use common::new_product;

fn association(product_id: i32, benchmark_id: i32, similarity: f32) -> Association {
    Association {
        product_id,
        benchmark_id,
        similarity,
    }
}

#[test]
fn replace_products_swaps_whole_set_and_drops_old_associations() {
    let test_db = common::TestDb::new();
    let repo = DieselRepository::new(test_db.pool());
    let crawler_id = test_db.insert_crawler("acme");
    let benchmark_id = test_db.insert_benchmark("sencha", None);

    let inserted = repo
        .replace_products(
            crawler_id,
            &[
                new_product(crawler_id, "a", "https://acme.example/a"),
                new_product(crawler_id, "b", "https://acme.example/b"),
            ],
        )
        .expect("should insert products");
    assert_eq!(inserted, 2);

    let scope = ProductScope::Crawler("acme".to_string());
    let old = repo.list_products(&scope).expect("should list products");
    repo.insert_associations(&[association(old[0].id, benchmark_id, 0.9)])
        .expect("should insert association");

    let inserted = repo
        .replace_products(
            crawler_id,
            &[new_product(crawler_id, "c", "https://acme.example/c")],
        )
        .expect("should replace products");
    assert_eq!(inserted, 1);

    let current = repo.list_products(&scope).expect("should list products");
    assert_eq!(current.len(), 1);
    assert_eq!(current[0].name, "c");
    assert_eq!(current[0].category.as_deref(), Some("tea"));
    assert!(current[0].embedding.is_none());
    assert!(
        repo.list_associations(&MatchScope::Benchmark(benchmark_id))
            .expect("should list associations")
            .is_empty()
    );
}

#[test]
fn replace_products_rejects_rows_of_another_crawler() {
    let test_db = common::TestDb::new();
    let repo = DieselRepository::new(test_db.pool());
    let crawler_id = test_db.insert_crawler("acme");
    repo.replace_products(
        crawler_id,
        &[new_product(crawler_id, "a", "https://acme.example/a")],
    )
    .expect("should insert products");

    let result = repo.replace_products(
        crawler_id,
        &[new_product(crawler_id + 1, "x", "https://acme.example/x")],
    );

    assert!(matches!(result, Err(RepositoryError::ValidationError(_))));
    let products = repo
        .list_products(&ProductScope::Crawler("acme".to_string()))
        .expect("should list products");
    assert_eq!(products.len(), 1);
}

#[test]
fn replace_products_rolls_back_on_duplicate_urls() {
    let test_db = common::TestDb::new();
    let repo = DieselRepository::new(test_db.pool());
    let crawler_id = test_db.insert_crawler("acme");
    repo.replace_products(
        crawler_id,
        &[new_product(crawler_id, "a", "https://acme.example/a")],
    )
    .expect("should insert products");

    let result = repo.replace_products(
        crawler_id,
        &[
            new_product(crawler_id, "b", "https://acme.example/dup"),
            new_product(crawler_id, "c", "https://acme.example/dup"),
        ],
    );

    assert!(result.is_err());
    let products = repo
        .list_products(&ProductScope::Crawler("acme".to_string()))
        .expect("should list products");
    assert_eq!(products.len(), 1);
    assert_eq!(products[0].name, "a");
}

#[test]
fn replace_associations_only_touches_its_scope() {
    let test_db = common::TestDb::new();
    let repo = DieselRepository::new(test_db.pool());
    let acme = test_db.insert_crawler("acme");
    let other = test_db.insert_crawler("other");
    let first = test_db.insert_benchmark("first", None);
    let second = test_db.insert_benchmark("second", None);
    repo.replace_products(acme, &[new_product(acme, "a", "https://acme.example/a")])
        .expect("should insert products");
    repo.replace_products(other, &[new_product(other, "o", "https://other.example/o")])
        .expect("should insert products");
    let a = repo
        .list_products(&ProductScope::Crawler("acme".to_string()))
        .expect("should list products")[0]
        .id;
    let o = repo
        .list_products(&ProductScope::Crawler("other".to_string()))
        .expect("should list products")[0]
        .id;
    repo.insert_associations(&[
        association(a, first, 0.81),
        association(o, first, 0.82),
        association(o, second, 0.83),
    ])
    .expect("should insert associations");

    repo.replace_associations(
        &MatchScope::Crawler("acme".to_string()),
        &[association(a, second, 0.9)],
    )
    .expect("should replace crawler scope");

    assert_eq!(
        repo.list_associations(&MatchScope::Crawler("acme".to_string()))
            .expect("should list"),
        vec![association(a, second, 0.9)]
    );
    assert_eq!(
        repo.list_associations(&MatchScope::Crawler("other".to_string()))
            .expect("should list"),
        vec![association(o, first, 0.82), association(o, second, 0.83)]
    );

    repo.replace_associations(&MatchScope::Benchmark(second), &[])
        .expect("should clear benchmark scope");

    assert!(
        repo.list_associations(&MatchScope::Benchmark(second))
            .expect("should list")
            .is_empty()
    );
    assert_eq!(
        repo.list_associations(&MatchScope::Benchmark(first))
            .expect("should list"),
        vec![association(o, first, 0.82)]
    );
}

#[test]
fn delete_associations_clears_only_its_scope() {
    let test_db = common::TestDb::new();
    let repo = DieselRepository::new(test_db.pool());
    let acme = test_db.insert_crawler("acme");
    let other = test_db.insert_crawler("other");
    let benchmark_id = test_db.insert_benchmark("sencha", None);
    repo.replace_products(acme, &[new_product(acme, "a", "https://acme.example/a")])
        .expect("should insert products");
    repo.replace_products(other, &[new_product(other, "o", "https://other.example/o")])
        .expect("should insert products");
    let a = repo
        .list_products(&ProductScope::Crawler("acme".to_string()))
        .expect("should list products")[0]
        .id;
    let o = repo
        .list_products(&ProductScope::Crawler("other".to_string()))
        .expect("should list products")[0]
        .id;
    repo.insert_associations(&[
        association(a, benchmark_id, 0.81),
        association(o, benchmark_id, 0.82),
    ])
    .expect("should insert associations");

    let deleted = repo
        .delete_associations(&MatchScope::Crawler("acme".to_string()))
        .expect("should delete crawler scope");

    assert_eq!(deleted, 1);
    assert_eq!(
        repo.list_associations(&MatchScope::Benchmark(benchmark_id))
            .expect("should list"),
        vec![association(o, benchmark_id, 0.82)]
    );
    assert_eq!(
        repo.delete_associations(&MatchScope::Crawler("missing".to_string()))
            .expect("unknown crawler deletes nothing"),
        0
    );
}

#[test]
fn replace_associations_skips_rows_of_removed_products() {
    let test_db = common::TestDb::new();
    let repo = DieselRepository::new(test_db.pool());
    let acme = test_db.insert_crawler("acme");
    let benchmark_id = test_db.insert_benchmark("sencha", None);
    repo.replace_products(acme, &[new_product(acme, "a", "https://acme.example/a")])
        .expect("should insert products");
    let stale = repo
        .list_products(&ProductScope::Crawler("acme".to_string()))
        .expect("should list products")[0]
        .id;
    repo.replace_products(acme, &[new_product(acme, "b", "https://acme.example/b")])
        .expect("should replace products");
    let fresh = repo
        .list_products(&ProductScope::Crawler("acme".to_string()))
        .expect("should list products")[0]
        .id;

    let inserted = repo
        .replace_associations(
            &MatchScope::Benchmark(benchmark_id),
            &[
                association(stale, benchmark_id, 0.9),
                association(fresh, benchmark_id, 0.85),
            ],
        )
        .expect("stale rows should not fail the transaction");

    assert_eq!(inserted, 1);
    assert_eq!(
        repo.list_associations(&MatchScope::Benchmark(benchmark_id))
            .expect("should list"),
        vec![association(fresh, benchmark_id, 0.85)]
    );
}

#[test]
fn crawler_status_keeps_count_when_absent() {
    let test_db = common::TestDb::new();
    let repo = DieselRepository::new(test_db.pool());
    let crawler_id = test_db.insert_crawler("acme");

    repo.set_crawler_processing(crawler_id, true)
        .expect("should mark processing");
    assert!(repo.get_crawler("acme").expect("crawler").processing);

    repo.set_crawler_status(crawler_id, false, Some(12))
        .expect("should update status");
    let crawler = repo.get_crawler("acme").expect("crawler");
    assert!(!crawler.processing);
    assert_eq!(crawler.num_products, 12);

    repo.set_crawler_processing(crawler_id, true)
        .expect("should mark processing");
    repo.set_crawler_status(crawler_id, false, None)
        .expect("should update status");
    let crawler = repo.get_crawler("acme").expect("crawler");
    assert!(!crawler.processing);
    assert_eq!(crawler.num_products, 12);
}

#[test]
fn missing_crawler_is_not_found() {
    let test_db = common::TestDb::new();
    let repo = DieselRepository::new(test_db.pool());

    assert!(matches!(
        repo.get_crawler("ghost"),
        Err(RepositoryError::NotFound)
    ));
}

#[test]
fn embeddings_survive_a_round_trip() {
    let test_db = common::TestDb::new();
    let repo = DieselRepository::new(test_db.pool());
    let crawler_id = test_db.insert_crawler("acme");
    let benchmark_id = test_db.insert_benchmark("sencha", None);
    repo.replace_products(
        crawler_id,
        &[new_product(crawler_id, "a", "https://acme.example/a")],
    )
    .expect("should insert products");
    let product_id = repo.list_products(&ProductScope::All).expect("list")[0].id;

    repo.set_product_embedding(product_id, &[0.6, 0.8])
        .expect("should store product embedding");
    repo.set_benchmark_embedding(benchmark_id, &[1.0, 0.0, 0.0])
        .expect("should store benchmark embedding");
    repo.set_benchmark_processing(benchmark_id, true)
        .expect("should mark benchmark");

    let products = repo.list_products(&ProductScope::All).expect("list");
    assert_eq!(products[0].embedding.as_deref(), Some(&[0.6_f32, 0.8][..]));
    let benchmarks = repo
        .list_benchmarks(BenchmarkScope::Id(benchmark_id))
        .expect("list");
    assert_eq!(
        benchmarks[0].embedding.as_deref(),
        Some(&[1.0_f32, 0.0, 0.0][..])
    );
    assert!(benchmarks[0].processing);
}
