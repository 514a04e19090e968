use std::sync::{Mutex, OnceLock};

use fastembed::{EmbeddingModel, TextEmbedding, TextInitOptions};
use thiserror::Error;

use crate::domain::benchmark::Benchmark;
use crate::domain::product::Product;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("failed to initialize embedding model: {0}")]
    Init(String),
    #[error("failed to generate embedding: {0}")]
    Generate(String),
    #[error("embedding model returned no vector")]
    Empty,
    #[error("failed to persist embedding: {0}")]
    Persist(String),
}

/// Text-to-vector provider.
///
/// Implementations return unit-normalized vectors of a fixed dimension.
pub trait Embedder: Send + Sync {
    fn embed(&self, prompt: &str) -> Result<Vec<f32>, EmbeddingError>;
}

/// Rows that can be turned into an embedding prompt.
pub trait PromptEmbedding {
    fn prompt(&self) -> String;
}

/// Build a textual prompt describing a benchmark or product for embedding.
///
/// The prompt includes the following fields in order: name, SKU, category,
/// units, price, amount and description. Absent fields render as empty
/// strings so cached embeddings stay comparable between runs.
pub fn product_embedding_prompt(
    name: &str,
    sku: &str,
    category: Option<&str>,
    units: Option<&str>,
    price: f64,
    amount: Option<f64>,
    description: Option<&str>,
) -> String {
    let category = category.unwrap_or("");
    let units = units.unwrap_or("");
    let amount = amount.map(|value| value.to_string()).unwrap_or_default();
    let description = description.unwrap_or("");
    format!(
        "Name: {name}\nSKU: {sku}\nCategory: {category}\nUnits: {units}\nPrice: {price}\nAmount: {amount}\nDescription: {description}",
    )
}

impl PromptEmbedding for Product {
    fn prompt(&self) -> String {
        product_embedding_prompt(
            &self.name,
            &self.sku,
            self.category.as_deref(),
            self.units.as_deref(),
            self.price,
            self.amount,
            self.description.as_deref(),
        )
    }
}

impl PromptEmbedding for Benchmark {
    fn prompt(&self) -> String {
        product_embedding_prompt(
            &self.name,
            &self.sku,
            Some(&self.category),
            Some(&self.units),
            self.price,
            Some(self.amount),
            Some(&self.description),
        )
    }
}

/// Normalize a vector to unit length.
///
/// Returns the original vector when the norm is zero.
pub fn normalize_embedding(vec: &[f32]) -> Vec<f32> {
    let norm = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm == 0.0 {
        vec.to_vec()
    } else {
        vec.iter().map(|x| x / norm).collect()
    }
}

/// Serialize an embedding into the blob stored alongside its row.
pub fn encode_embedding(embedding: &[f32]) -> Vec<u8> {
    bytemuck::cast_slice(embedding).to_vec()
}

/// Decode a stored blob, returning `None` for empty or truncated data.
pub fn decode_embedding(blob: &[u8]) -> Option<Vec<f32>> {
    if blob.is_empty() || blob.len() % size_of::<f32>() != 0 {
        return None;
    }
    Some(bytemuck::pod_collect_to_vec::<u8, f32>(blob))
}

/// Load an embedding from cache when present, otherwise generate and persist it.
///
/// Returns the embedding and a flag indicating whether a new embedding was
/// generated.
pub fn load_or_generate_embedding<E, F>(
    existing: Option<&[f32]>,
    prompt: String,
    embedder: &E,
    persist: F,
) -> Result<(Vec<f32>, bool), EmbeddingError>
where
    E: Embedder + ?Sized,
    F: FnOnce(&[f32]) -> Result<(), String>,
{
    if let Some(embedding) = existing {
        return Ok((embedding.to_vec(), false));
    }

    let generated = normalize_embedding(&embedder.embed(&prompt)?);

    persist(&generated).map_err(EmbeddingError::Persist)?;

    Ok((generated, true))
}

/// [`Embedder`] backed by a local fastembed model.
///
/// The model is loaded on first use and shared by every caller afterwards;
/// inference calls are serialized.
pub struct FastEmbedder {
    model: EmbeddingModel,
    instance: OnceLock<Mutex<TextEmbedding>>,
    init: Mutex<()>,
}

impl FastEmbedder {
    pub fn new(model: EmbeddingModel) -> Self {
        Self {
            model,
            instance: OnceLock::new(),
            init: Mutex::new(()),
        }
    }

    fn instance(&self) -> Result<&Mutex<TextEmbedding>, EmbeddingError> {
        if let Some(instance) = self.instance.get() {
            return Ok(instance);
        }

        let _guard = self
            .init
            .lock()
            .map_err(|_| EmbeddingError::Init("initialization lock poisoned".to_string()))?;
        if let Some(instance) = self.instance.get() {
            return Ok(instance);
        }

        log::info!("Loading embedding model {}", self.model);
        let embedder = TextEmbedding::try_new(TextInitOptions::new(self.model.clone()))
            .map_err(|error| EmbeddingError::Init(format!("{error:?}")))?;

        Ok(self.instance.get_or_init(|| Mutex::new(embedder)))
    }
}

impl Embedder for FastEmbedder {
    fn embed(&self, prompt: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut embedder = self
            .instance()?
            .lock()
            .map_err(|_| EmbeddingError::Generate("embedding model lock poisoned".to_string()))?;

        let embedding = embedder
            .embed(vec![prompt], None)
            .map_err(|error| EmbeddingError::Generate(format!("{error:?}")))?
            .into_iter()
            .next()
            .ok_or(EmbeddingError::Empty)?;

        Ok(normalize_embedding(&embedding))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::repository::test::{sample_benchmark, sample_product};

    struct CountingEmbedder {
        calls: AtomicUsize,
    }

    impl Embedder for CountingEmbedder {
        fn embed(&self, _prompt: &str) -> Result<Vec<f32>, EmbeddingError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![3.0, 4.0])
        }
    }

    #[test]
    fn prompt_uses_fixed_field_order_and_empty_placeholders() {
        let prompt = product_embedding_prompt("Sencha", "S-1", None, Some("kg"), 12.5, None, None);

        assert_eq!(
            prompt,
            "Name: Sencha\nSKU: S-1\nCategory: \nUnits: kg\nPrice: 12.5\nAmount: \nDescription: "
        );
    }

    #[test]
    fn product_and_benchmark_share_prompt_layout() {
        let mut product = sample_product(1, 1, None);
        product.name = "Puer".to_string();
        product.sku = "P-1".to_string();
        product.category = Some("tea".to_string());
        product.units = Some("kg".to_string());
        product.amount = Some(1.0);
        product.description = Some(String::new());

        let mut benchmark = sample_benchmark(1, None);
        benchmark.name = "Puer".to_string();
        benchmark.sku = "P-1".to_string();

        assert_eq!(product.prompt(), benchmark.prompt());
    }

    #[test]
    fn normalize_produces_unit_vector() {
        let normalized = normalize_embedding(&[3.0, 4.0]);

        assert!((normalized[0] - 0.6).abs() < 1e-6);
        assert!((normalized[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn normalize_keeps_zero_vector() {
        assert_eq!(normalize_embedding(&[0.0, 0.0]), vec![0.0, 0.0]);
    }

    #[test]
    fn decode_rejects_truncated_blob() {
        let mut blob = encode_embedding(&[0.25, -1.5]);
        assert_eq!(decode_embedding(&blob), Some(vec![0.25, -1.5]));

        blob.pop();
        assert_eq!(decode_embedding(&blob), None);
        assert_eq!(decode_embedding(&[]), None);
    }

    #[test]
    fn cached_embedding_is_reused_without_calling_model() {
        let embedder = CountingEmbedder {
            calls: AtomicUsize::new(0),
        };
        let cached = [1.0_f32, 0.0];

        let (embedding, generated) =
            load_or_generate_embedding(Some(&cached[..]), "ignored".to_string(), &embedder, |_| {
                panic!("cached embeddings must not be persisted again")
            })
            .expect("cached embedding should load");

        assert_eq!(embedding, vec![1.0, 0.0]);
        assert!(!generated);
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn missing_embedding_is_generated_normalized_and_persisted() {
        let embedder = CountingEmbedder {
            calls: AtomicUsize::new(0),
        };
        let mut persisted = Vec::new();

        let (embedding, generated) =
            load_or_generate_embedding(None, "prompt".to_string(), &embedder, |value| {
                persisted = value.to_vec();
                Ok(())
            })
            .expect("embedding should be generated");

        assert!(generated);
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 1);
        assert_eq!(embedding, persisted);
        assert!((embedding[0] - 0.6).abs() < 1e-6);
    }

    #[test]
    fn persist_failure_is_reported() {
        let embedder = CountingEmbedder {
            calls: AtomicUsize::new(0),
        };

        let result = load_or_generate_embedding(None, "prompt".to_string(), &embedder, |_| {
            Err("disk full".to_string())
        });

        assert!(matches!(result, Err(EmbeddingError::Persist(reason)) if reason == "disk full"));
    }
}
