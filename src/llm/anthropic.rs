//! Anthropic `/messages` client. The system prompt travels outside the message
//! list and the forced tool is selected with `tool_choice: {type: "tool"}`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};

use super::{ChatModel, ChatRole, ToolRequest};
use crate::http;

pub struct AnthropicChat {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    version: String,
}

impl AnthropicChat {
    pub fn new(base_url: &str, api_key: &str, version: &str, timeout_secs: u64) -> Result<Self> {
        Ok(Self {
            client: http::build_client(timeout_secs)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            version: version.to_string(),
        })
    }
}

pub(crate) fn request_body(request: &ToolRequest) -> Value {
    let system = request
        .messages
        .iter()
        .find(|m| m.role == ChatRole::System)
        .map(|m| m.content.as_str())
        .unwrap_or_default();
    let messages: Vec<&super::ChatMessage> = request
        .messages
        .iter()
        .filter(|m| m.role != ChatRole::System)
        .collect();

    json!({
        "model": request.model,
        "max_tokens": request.max_tokens,
        "temperature": request.temperature,
        "system": system,
        "messages": messages,
        "tools": [{
            "name": request.tool.name,
            "description": request.tool.description,
            "input_schema": request.tool.parameters,
        }],
        "tool_choice": {"type": "tool", "name": request.tool.name},
    })
}

/// Input of the first `tool_use` content block.
pub(crate) fn parse_tool_input(response: &Value) -> Result<Value> {
    response
        .get("content")
        .and_then(Value::as_array)
        .and_then(|blocks| {
            blocks
                .iter()
                .find(|b| b.get("type").and_then(Value::as_str) == Some("tool_use"))
        })
        .and_then(|b| b.get("input"))
        .cloned()
        .context("response contained no tool_use block")
}

#[async_trait]
impl ChatModel for AnthropicChat {
    fn provider(&self) -> &str {
        "anthropic"
    }

    async fn call_tool(&self, request: &ToolRequest) -> Result<Value> {
        let http_request = self
            .client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", &self.version)
            .json(&request_body(request));
        let response: Value = http::send("anthropic", http_request)
            .await?
            .json()
            .await
            .context("invalid messages response")?;
        tracing::debug!(model = %request.model, tool = %request.tool.name, "anthropic tool call complete");
        parse_tool_input(&response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{ChatMessage, ToolSpec};

    #[test]
    fn system_prompt_is_separated() {
        let request = ToolRequest {
            model: "claude-3-5-haiku-latest".into(),
            messages: vec![
                ChatMessage::system("persona"),
                ChatMessage::user("こんにちは"),
                ChatMessage::assistant("やあ"),
            ],
            tool: ToolSpec {
                name: "analyze_response".into(),
                description: "d".into(),
                parameters: json!({"type": "object"}),
            },
            temperature: 0.8,
            max_tokens: 500,
            frequency_penalty: Some(0.7),
            presence_penalty: Some(0.5),
        };
        let body = request_body(&request);
        assert_eq!(body["system"], "persona");
        assert_eq!(body["messages"].as_array().unwrap().len(), 2);
        assert_eq!(body["tool_choice"]["type"], "tool");
        assert!(body.get("frequency_penalty").is_none());
    }

    #[test]
    fn finds_tool_use_block() {
        let response = json!({"content": [
            {"type": "text", "text": "thinking"},
            {"type": "tool_use", "name": "analyze_response", "input": {"emotion": "calm"}}
        ]});
        assert_eq!(parse_tool_input(&response).unwrap()["emotion"], "calm");
    }
}
