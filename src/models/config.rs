//! Configuration model loaded from external sources.

use std::time::Duration;

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use fastembed::EmbeddingModel;
use serde::Deserialize;
use thiserror::Error;

use crate::{DEFAULT_MATCH_TOP_K, DEFAULT_SIMILARITY_THRESHOLD};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Clone, Debug, Deserialize)]
/// Settings for the matcher service.
///
/// Sources are layered: built-in defaults, `config/default.yaml`, the file
/// named by `APP_CONFIG`, then environment variables (`DATABASE_URL`,
/// `ZMQ_ADDRESS`, `SIMILARITY_THRESHOLD`, ...).
pub struct ServerConfig {
    pub database_url: String,
    pub zmq_address: String,
    pub similarity_threshold: f32,
    pub embedding_model: String,
    pub crawler_concurrency: usize,
    pub http_timeout_secs: u64,
    pub match_top_k: usize,
}

impl ServerConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder =
            Self::defaults()?.add_source(File::with_name("config/default").required(false));
        if let Ok(path) = std::env::var("APP_CONFIG") {
            builder = builder.add_source(File::with_name(&path));
        }
        let builder = builder.add_source(Environment::default().try_parsing(true));
        Self::from_builder(builder)
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Ok(Config::builder()
            .set_default("database_url", "app.db")?
            .set_default("zmq_address", "tcp://127.0.0.1:5555")?
            .set_default("similarity_threshold", f64::from(DEFAULT_SIMILARITY_THRESHOLD))?
            .set_default("embedding_model", "MultilingualE5Large")?
            .set_default("crawler_concurrency", 5_i64)?
            .set_default("http_timeout_secs", 15_i64)?
            .set_default("match_top_k", DEFAULT_MATCH_TOP_K as i64)?)
    }

    fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(-1.0..=1.0).contains(&self.similarity_threshold) {
            return Err(ConfigError::Invalid(format!(
                "similarity_threshold must be within [-1, 1], got {}",
                self.similarity_threshold
            )));
        }
        if self.crawler_concurrency == 0 {
            return Err(ConfigError::Invalid(
                "crawler_concurrency must be positive".to_string(),
            ));
        }
        if self.http_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "http_timeout_secs must be positive".to_string(),
            ));
        }
        if self.match_top_k == 0 {
            return Err(ConfigError::Invalid(
                "match_top_k must be positive".to_string(),
            ));
        }
        self.embedding_model()?;
        Ok(())
    }

    pub fn embedding_model(&self) -> Result<EmbeddingModel, ConfigError> {
        self.embedding_model
            .parse::<EmbeddingModel>()
            .map_err(ConfigError::Invalid)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}
