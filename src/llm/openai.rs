//! OpenAI-compatible `/chat/completions` client with a forced function call.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};

use super::{ChatModel, ToolRequest};
use crate::http;

pub struct OpenAiChat {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl OpenAiChat {
    pub fn new(base_url: &str, api_key: &str, timeout_secs: u64) -> Result<Self> {
        Ok(Self {
            client: http::build_client(timeout_secs)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }
}

/// Request body for a forced tool call.
pub(crate) fn request_body(request: &ToolRequest) -> Value {
    let mut body = json!({
        "model": request.model,
        "messages": request.messages,
        "temperature": request.temperature,
        "max_tokens": request.max_tokens,
        "tools": [{
            "type": "function",
            "function": {
                "name": request.tool.name,
                "description": request.tool.description,
                "parameters": request.tool.parameters,
            }
        }],
        "tool_choice": {"type": "function", "function": {"name": request.tool.name}},
    });
    if let Some(p) = request.frequency_penalty {
        body["frequency_penalty"] = json!(p);
    }
    if let Some(p) = request.presence_penalty {
        body["presence_penalty"] = json!(p);
    }
    body
}

/// Arguments of the first tool call, parsed from their JSON string form.
pub(crate) fn parse_tool_arguments(response: &Value) -> Result<Value> {
    let arguments = response
        .pointer("/choices/0/message/tool_calls/0/function/arguments")
        .and_then(Value::as_str)
        .context("response contained no tool call")?;
    serde_json::from_str(arguments).context("tool call arguments are not valid JSON")
}

#[async_trait]
impl ChatModel for OpenAiChat {
    fn provider(&self) -> &str {
        "openai"
    }

    async fn call_tool(&self, request: &ToolRequest) -> Result<Value> {
        let started = std::time::Instant::now();
        let http_request = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request_body(request));
        let response: Value = http::send("openai", http_request)
            .await?
            .json()
            .await
            .context("invalid chat completion response")?;
        tracing::debug!(
            model = %request.model,
            tool = %request.tool.name,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "openai tool call complete"
        );
        parse_tool_arguments(&response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{ChatMessage, ToolSpec};

    fn request() -> ToolRequest {
        ToolRequest {
            model: "gpt-4o-mini".into(),
            messages: vec![ChatMessage::system("sys"), ChatMessage::user("hi")],
            tool: ToolSpec {
                name: "analyze_response".into(),
                description: "d".into(),
                parameters: json!({"type": "object"}),
            },
            temperature: 0.8,
            max_tokens: 2000,
            frequency_penalty: Some(0.7),
            presence_penalty: None,
        }
    }

    #[test]
    fn body_forces_the_tool() {
        let body = request_body(&request());
        assert_eq!(body["tool_choice"]["function"]["name"], "analyze_response");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["frequency_penalty"], 0.7);
        assert!(body.get("presence_penalty").is_none());
    }

    #[test]
    fn parses_arguments_string() {
        let response = json!({
            "choices": [{"message": {"tool_calls": [{
                "function": {"name": "analyze_response", "arguments": "{\"emotion\":\"happy\"}"}
            }]}}]
        });
        assert_eq!(parse_tool_arguments(&response).unwrap()["emotion"], "happy");
    }

    #[test]
    fn missing_tool_call_is_an_error() {
        let response = json!({"choices": [{"message": {"content": "plain"}}]});
        assert!(parse_tool_arguments(&response).is_err());
    }
}
