use std::sync::Arc;

use tokio::sync::mpsc;

use pushkind_matcher::crawlers::StaticCrawlerRegistry;
use pushkind_matcher::db::establish_connection_pool;
use pushkind_matcher::models::config::ServerConfig;
use pushkind_matcher::processing::JobContext;
use pushkind_matcher::processing::dispatcher::Dispatcher;
use pushkind_matcher::processing::embedding::FastEmbedder;
use pushkind_matcher::processing::listener::spawn_zmq_listener;
use pushkind_matcher::processing::matching::MatchingEngine;
use pushkind_matcher::repository::DieselRepository;

const JOB_QUEUE_CAPACITY: usize = 1024;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = match ServerConfig::load() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };
    let model = match config.embedding_model() {
        Ok(model) => model,
        Err(e) => {
            log::error!("{e}");
            std::process::exit(1);
        }
    };

    let pool = match establish_connection_pool(&config.database_url) {
        Ok(pool) => pool,
        Err(e) => {
            log::error!("Failed to establish database connection: {e}");
            std::process::exit(1);
        }
    };

    let ctx = JobContext {
        repo: DieselRepository::new(pool),
        registry: Arc::new(StaticCrawlerRegistry::new(
            config.crawler_concurrency,
            config.http_timeout(),
        )),
        embedder: Arc::new(FastEmbedder::new(model)),
        engine: MatchingEngine::new(config.similarity_threshold, config.match_top_k),
    };

    let (sender, receiver) = mpsc::channel(JOB_QUEUE_CAPACITY);
    if let Err(e) = spawn_zmq_listener(&config.zmq_address, sender) {
        log::error!("Cannot bind to {}: {e}", config.zmq_address);
        std::process::exit(1);
    }

    log::info!(
        "Matcher started: threshold={}, top_k={}",
        config.similarity_threshold,
        config.match_top_k
    );

    tokio::select! {
        _ = Dispatcher::new(ctx).run(receiver) => {}
        _ = tokio::signal::ctrl_c() => log::info!("Shutting down"),
    }
}
