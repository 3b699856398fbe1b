//! Chat-model clients.
//!
//! Every model call in koibito is a forced tool call: the model must answer by
//! invoking one named function, and the caller gets that function's JSON
//! arguments back. [`ChatModel`] abstracts the provider; [`ModelRouter`] picks
//! one by the user's [`AiProvider`] setting.

pub mod anthropic;
pub mod openai;
pub mod retry;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use crate::config::ChatConfig;
use crate::user::AiProvider;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// A function the model is forced to call. `parameters` is a JSON schema.
#[derive(Debug, Clone)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[derive(Debug, Clone)]
pub struct ToolRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub tool: ToolSpec,
    pub temperature: f64,
    pub max_tokens: u32,
    /// Only sent to providers that support it.
    pub frequency_penalty: Option<f64>,
    pub presence_penalty: Option<f64>,
}

#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Provider name used in logs and errors.
    fn provider(&self) -> &str;

    /// Run the request and return the forced tool call's arguments.
    async fn call_tool(&self, request: &ToolRequest) -> Result<Value>;
}

/// Holds one client per configured provider.
#[derive(Clone, Default)]
pub struct ModelRouter {
    openai: Option<Arc<dyn ChatModel>>,
    anthropic: Option<Arc<dyn ChatModel>>,
}

impl ModelRouter {
    pub fn from_config(config: &ChatConfig) -> Result<Self> {
        let openai = match config.openai_api_key.as_deref() {
            Some(key) if !key.is_empty() => {
                let client = openai::OpenAiChat::new(
                    &config.openai_base_url,
                    key,
                    config.request_timeout_secs,
                )?;
                Some(Arc::new(retry::Retrying::new(client, config)) as Arc<dyn ChatModel>)
            }
            _ => None,
        };
        let anthropic = match config.anthropic_api_key.as_deref() {
            Some(key) if !key.is_empty() => {
                let client = anthropic::AnthropicChat::new(
                    &config.anthropic_base_url,
                    key,
                    &config.anthropic_version,
                    config.request_timeout_secs,
                )?;
                Some(Arc::new(retry::Retrying::new(client, config)) as Arc<dyn ChatModel>)
            }
            _ => None,
        };
        if openai.is_none() && anthropic.is_none() {
            tracing::warn!("no chat model API key configured; replies will use fallback text");
        }
        Ok(Self { openai, anthropic })
    }

    /// Route every provider to the same model. Used by tests and offline runs.
    pub fn single(model: Arc<dyn ChatModel>) -> Self {
        Self {
            openai: Some(Arc::clone(&model)),
            anthropic: Some(model),
        }
    }

    pub fn with_openai(mut self, model: Arc<dyn ChatModel>) -> Self {
        self.openai = Some(model);
        self
    }

    pub fn with_anthropic(mut self, model: Arc<dyn ChatModel>) -> Self {
        self.anthropic = Some(model);
        self
    }

    pub fn for_provider(&self, provider: AiProvider) -> Result<Arc<dyn ChatModel>> {
        let model = match provider {
            AiProvider::OpenAi => self.openai.as_ref(),
            AiProvider::Anthropic => self.anthropic.as_ref(),
        };
        model
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no API key configured for {provider}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str);

    #[async_trait]
    impl ChatModel for Named {
        fn provider(&self) -> &str {
            self.0
        }

        async fn call_tool(&self, _request: &ToolRequest) -> Result<Value> {
            Ok(Value::Null)
        }
    }

    #[test]
    fn router_picks_by_provider() {
        let router = ModelRouter::default()
            .with_openai(Arc::new(Named("openai")))
            .with_anthropic(Arc::new(Named("anthropic")));
        assert_eq!(router.for_provider(AiProvider::OpenAi).unwrap().provider(), "openai");
        assert_eq!(
            router.for_provider(AiProvider::Anthropic).unwrap().provider(),
            "anthropic"
        );
    }

    #[test]
    fn missing_provider_is_an_error() {
        let router = ModelRouter::default().with_openai(Arc::new(Named("openai")));
        assert!(router.for_provider(AiProvider::Anthropic).is_err());
    }

    #[test]
    fn roles_serialize_lowercase() {
        let json = serde_json::to_value(ChatMessage::assistant("hi")).unwrap();
        assert_eq!(json["role"], "assistant");
    }
}
