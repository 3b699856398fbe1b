//! OpenAI-compatible `/embeddings` client.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use super::EmbeddingProvider;
use crate::http;

pub struct OpenAiEmbeddings {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

impl OpenAiEmbeddings {
    pub fn new(base_url: &str, api_key: &str, model: &str, timeout_secs: u64) -> Result<Self> {
        Ok(Self {
            client: http::build_client(timeout_secs)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddings {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({"model": self.model, "input": text}));
        let response = http::send("openai", request).await?;
        let parsed: EmbeddingResponse = response
            .json()
            .await
            .context("invalid embeddings response")?;
        parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .context("embeddings response contained no data")
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
