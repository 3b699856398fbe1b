//! Leonardo image generation: submit a job, then poll until it finishes.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;

use crate::config::ImageConfig;
use crate::error::CompanionError;
use crate::http;

pub const MAX_PROMPT_CHARS: usize = 2000;
pub const MAX_IMAGES_PER_REQUEST: u32 = 4;
pub const MIN_DIMENSION: u32 = 256;
pub const MAX_DIMENSION: u32 = 2048;

#[derive(Debug, Clone, Serialize)]
pub struct GenerationParams {
    pub prompt: String,
    pub model_id: String,
    pub width: u32,
    pub height: u32,
    pub num_images: u32,
    pub guidance_scale: f64,
}

impl GenerationParams {
    /// Parameters from config defaults for a single image.
    pub fn from_config(config: &ImageConfig, prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model_id: config.model_id.clone(),
            width: config.width,
            height: config.height,
            num_images: 1,
            guidance_scale: config.guidance_scale,
        }
    }

    pub fn validate(&self) -> Result<(), CompanionError> {
        let chars = self.prompt.chars().count();
        if self.prompt.trim().is_empty() || chars > MAX_PROMPT_CHARS {
            return Err(CompanionError::validation(format!(
                "プロンプトが無効です（1〜{MAX_PROMPT_CHARS}文字）"
            )));
        }
        if !(1..=MAX_IMAGES_PER_REQUEST).contains(&self.num_images) {
            return Err(CompanionError::validation(format!(
                "生成枚数は1〜{MAX_IMAGES_PER_REQUEST}枚で指定してください"
            )));
        }
        let dims = MIN_DIMENSION..=MAX_DIMENSION;
        if !dims.contains(&self.width) || !dims.contains(&self.height) {
            return Err(CompanionError::validation("画像サイズが無効です"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerationResult {
    pub image_url: String,
    pub thumbnail_url: Option<String>,
    pub generation_id: String,
    pub params: GenerationParams,
}

#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate(&self, params: &GenerationParams) -> Result<GenerationResult>;
}

pub struct LeonardoClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    poll_attempts: u32,
    poll_interval: Duration,
}

impl LeonardoClient {
    pub fn new(config: &ImageConfig, api_key: &str) -> Result<Self> {
        Ok(Self {
            client: http::build_client(config.request_timeout_secs)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            poll_attempts: config.poll_attempts.max(1),
            poll_interval: Duration::from_secs(config.poll_interval_secs),
        })
    }

    async fn submit(&self, params: &GenerationParams) -> Result<String> {
        let body = json!({
            "prompt": params.prompt,
            "modelId": params.model_id,
            "width": params.width,
            "height": params.height,
            "num_images": params.num_images,
            "guidance_scale": params.guidance_scale.round() as i64,
        });
        let request = self
            .client
            .post(format!("{}/generations", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body);
        let response: Value = http::send("leonardo", request)
            .await?
            .json()
            .await
            .context("invalid generation response")?;
        generation_id(&response).context("Generation IDがレスポンスに含まれていません")
    }

    async fn poll(&self, generation_id: &str) -> Result<String> {
        for attempt in 1..=self.poll_attempts {
            let request = self
                .client
                .get(format!("{}/generations/{generation_id}", self.base_url))
                .bearer_auth(&self.api_key);
            match self.poll_once(request).await {
                Ok(PollStatus::Complete(url)) => {
                    tracing::info!(generation_id, attempt, "image generation complete");
                    return Ok(url);
                }
                Ok(PollStatus::Failed(reason)) => {
                    anyhow::bail!("画像生成が失敗しました: {reason}");
                }
                Ok(PollStatus::Pending(status)) => {
                    tracing::debug!(generation_id, attempt, status = %status, "image still generating");
                }
                Err(e) => {
                    tracing::warn!(generation_id, attempt, error = %e, "poll request failed");
                }
            }
            if attempt < self.poll_attempts {
                tokio::time::sleep(self.poll_interval).await;
            }
        }

        let waited_secs = u64::from(self.poll_attempts) * self.poll_interval.as_secs();
        Err(CompanionError::Timeout(format!(
            "画像生成がタイムアウトしました（{}分経過）",
            waited_secs / 60
        ))
        .into())
    }

    async fn poll_once(&self, request: reqwest::RequestBuilder) -> Result<PollStatus> {
        let response: Value = http::send("leonardo", request)
            .await?
            .json()
            .await
            .context("invalid generation status response")?;
        Ok(parse_poll(&response))
    }
}

#[async_trait]
impl ImageGenerator for LeonardoClient {
    async fn generate(&self, params: &GenerationParams) -> Result<GenerationResult> {
        params.validate()?;
        tracing::info!(model = %params.model_id, width = params.width, height = params.height, "submitting image generation");
        let generation_id = self.submit(params).await?;
        let image_url = self.poll(&generation_id).await?;
        Ok(GenerationResult {
            thumbnail_url: Some(image_url.clone()),
            image_url,
            generation_id,
            params: params.clone(),
        })
    }
}

#[derive(Debug, PartialEq)]
enum PollStatus {
    Complete(String),
    Failed(String),
    Pending(String),
}

fn first_str<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|k| value.get(*k).and_then(Value::as_str))
}

/// Id from `sdGenerationJob.generationId`, `generationId` or `id`.
fn generation_id(response: &Value) -> Option<String> {
    response
        .pointer("/sdGenerationJob/generationId")
        .and_then(Value::as_str)
        .or_else(|| first_str(response, &["generationId", "id"]))
        .map(str::to_string)
}

fn parse_poll(response: &Value) -> PollStatus {
    let generation = response.get("generations_by_pk").unwrap_or(response);
    let status = first_str(generation, &["status", "generationStatus", "state"])
        .unwrap_or_default()
        .to_string();

    match status.as_str() {
        "COMPLETE" | "completed" | "FINISHED" => {
            let url = ["generated_images", "images", "outputs"]
                .iter()
                .find_map(|k| generation.get(*k).and_then(Value::as_array))
                .and_then(|images| images.first())
                .and_then(|image| first_str(image, &["url", "imageUrl", "image_url"]));
            match url {
                Some(url) => PollStatus::Complete(url.to_string()),
                // Finished without a usable URL; keep polling.
                None => PollStatus::Pending(status),
            }
        }
        "FAILED" | "failed" | "ERROR" => PollStatus::Failed(
            first_str(generation, &["error", "errorMessage"])
                .map(str::to_string)
                .unwrap_or_else(|| format!("生成が失敗しました (Status: {status})")),
        ),
        _ => PollStatus::Pending(status),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_id_lookup_order() {
        assert_eq!(
            generation_id(&json!({"sdGenerationJob": {"generationId": "a"}, "id": "b"})).as_deref(),
            Some("a")
        );
        assert_eq!(generation_id(&json!({"id": "b"})).as_deref(), Some("b"));
        assert_eq!(generation_id(&json!({})), None);
    }

    #[test]
    fn poll_statuses() {
        let done = json!({"generations_by_pk": {"status": "COMPLETE", "generated_images": [{"url": "https://img/1.png"}]}});
        assert_eq!(parse_poll(&done), PollStatus::Complete("https://img/1.png".into()));

        let failed = json!({"status": "FAILED"});
        assert!(matches!(parse_poll(&failed), PollStatus::Failed(m) if m.contains("FAILED")));

        let pending = json!({"generations_by_pk": {"status": "PENDING"}});
        assert_eq!(parse_poll(&pending), PollStatus::Pending("PENDING".into()));

        let empty = json!({"state": "FINISHED", "images": []});
        assert!(matches!(parse_poll(&empty), PollStatus::Pending(_)));
    }

    #[test]
    fn params_validation() {
        let config = ImageConfig::default();
        let mut params = GenerationParams::from_config(&config, "anime style young woman");
        assert!(params.validate().is_ok());

        params.num_images = 5;
        assert!(params.validate().is_err());

        params.num_images = 1;
        params.prompt = "x".repeat(MAX_PROMPT_CHARS + 1);
        assert!(params.validate().is_err());
    }
}
