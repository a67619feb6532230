//! Text-to-vector embedding pipeline.
//!
//! Provides the [`EmbeddingProvider`] trait with two implementations: the
//! OpenAI-compatible HTTP provider used in production, and a deterministic
//! hashed provider for offline use and tests. Providers are created via
//! [`create_provider`] from configuration.

pub mod hashed;
pub mod openai;

use anyhow::Result;
use async_trait::async_trait;

/// Trait for embedding text into vectors.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text string into a vector.
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut batch = self.embed_batch(&[text.to_string()]).await?;
        batch
            .pop()
            .ok_or_else(|| anyhow::anyhow!("embedding provider returned no vector"))
    }

    /// Embed a batch of texts. Output order matches input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Identifier of the model producing the vectors.
    fn model_name(&self) -> &str;
}

/// Create an embedding provider from config.
///
/// `"openai"` calls the completion API's `/embeddings` endpoint; `"hashed"`
/// needs no network and no credentials.
pub fn create_provider(config: &crate::config::LiamConfig) -> Result<Box<dyn EmbeddingProvider>> {
    match config.embedding.provider.as_str() {
        "openai" => {
            let provider = openai::OpenAiEmbeddings::new(&config.completion, &config.embedding)?;
            Ok(Box::new(provider))
        }
        "hashed" => Ok(Box::new(hashed::HashedEmbeddings::new(
            config.embedding.dimensions,
        ))),
        other => anyhow::bail!("unknown embedding provider: {other}. Supported: openai, hashed"),
    }
}
