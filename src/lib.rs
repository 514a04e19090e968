pub mod crawlers;
pub mod db;
pub mod domain;
pub mod models;
pub mod processing;
pub mod repository;
pub mod schema;

/// Cosine-similarity threshold used when the configuration does not set one.
pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.8;

/// Upper bound on matched products per benchmark.
pub const DEFAULT_MATCH_TOP_K: usize = 10;
