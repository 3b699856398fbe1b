//! Text-to-vector embedding for memory search.
//!
//! Provides the [`EmbeddingProvider`] trait, an OpenAI-compatible HTTP
//! implementation and a disabled provider. The provider is created via
//! [`create_provider`] from configuration. Embedding failures never break a
//! caller: [`embed_or_empty`] degrades to an empty vector and search falls
//! back to text matching.

pub mod openai;

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use crate::config::KoibitoConfig;

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text string into a vector.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Model identifier recorded in `schema_meta`.
    fn model_name(&self) -> &str;
}

/// Provider used when embeddings are switched off: always returns an empty
/// vector.
pub struct DisabledEmbeddings;

#[async_trait]
impl EmbeddingProvider for DisabledEmbeddings {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Ok(Vec::new())
    }

    fn model_name(&self) -> &str {
        "none"
    }
}

/// Create an embedding provider from config.
///
/// `"openai"` needs an OpenAI API key; without one embeddings are disabled
/// with a warning rather than failing startup.
pub fn create_provider(config: &KoibitoConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    match config.embedding.provider.as_str() {
        "openai" => match config.chat.openai_api_key.as_deref() {
            Some(key) if !key.is_empty() => Ok(Arc::new(openai::OpenAiEmbeddings::new(
                &config.chat.openai_base_url,
                key,
                &config.embedding.model,
                config.embedding.timeout_secs,
            )?)),
            _ => {
                tracing::warn!("no OpenAI API key configured; memory search uses text matching only");
                Ok(Arc::new(DisabledEmbeddings))
            }
        },
        "none" => Ok(Arc::new(DisabledEmbeddings)),
        other => anyhow::bail!("unknown embedding provider: {other}. Supported: openai, none"),
    }
}

/// Embed `text`, logging and returning an empty vector on failure.
pub async fn embed_or_empty(provider: &dyn EmbeddingProvider, text: &str) -> Vec<f32> {
    match provider.embed(text).await {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(error = %e, "embedding failed, continuing without vector");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_provider_returns_empty() {
        let v = embed_or_empty(&DisabledEmbeddings, "こんにちは").await;
        assert!(v.is_empty());
    }

    #[test]
    fn missing_key_disables_embeddings() {
        let mut config = KoibitoConfig::default();
        config.chat.openai_api_key = None;
        let provider = create_provider(&config).unwrap();
        assert_eq!(provider.model_name(), "none");
    }

    #[test]
    fn unknown_provider_is_an_error() {
        let mut config = KoibitoConfig::default();
        config.embedding.provider = "local".into();
        assert!(create_provider(&config).is_err());
    }
}
