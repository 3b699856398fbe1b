use std::time::Duration;

use httpmock::Method::POST;
use httpmock::MockServer;
use serde_json::json;

use koibito::error::{is_rate_limited, CompanionError};
use koibito::llm::anthropic::AnthropicChat;
use koibito::llm::openai::OpenAiChat;
use koibito::llm::retry::Retrying;
use koibito::llm::{ChatMessage, ChatModel, ToolRequest, ToolSpec};

fn request() -> ToolRequest {
    ToolRequest {
        model: "test-model".into(),
        messages: vec![ChatMessage::system("あなたは蓮です。"), ChatMessage::user("おはよう")],
        tool: ToolSpec {
            name: "analyze_response".into(),
            description: "返答と感情を返す".into(),
            parameters: json!({"type": "object"}),
        },
        temperature: 0.8,
        max_tokens: 500,
        frequency_penalty: Some(0.7),
        presence_penalty: Some(0.5),
    }
}

#[tokio::test]
async fn openai_returns_parsed_tool_arguments() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/chat/completions")
                .header("authorization", "Bearer sk-test")
                .json_body_partial(
                    r#"{"tool_choice": {"type": "function", "function": {"name": "analyze_response"}}, "frequency_penalty": 0.7}"#,
                );
            then.status(200).json_body(json!({
                "choices": [{
                    "message": {
                        "role": "assistant",
                        "content": null,
                        "tool_calls": [{
                            "type": "function",
                            "id": "call_1",
                            "function": {
                                "name": "analyze_response",
                                "arguments": "{\"response\":\"おはよう！\",\"emotion\":\"happy\",\"intimacyChange\":1}"
                            }
                        }]
                    },
                    "finish_reason": "tool_calls"
                }]
            }));
        })
        .await;

    let client = OpenAiChat::new(&server.base_url(), "sk-test", 5).unwrap();
    let args = client.call_tool(&request()).await.unwrap();

    assert_eq!(args["response"], "おはよう！");
    assert_eq!(args["intimacyChange"], 1);
    mock.assert_async().await;
}

#[tokio::test]
async fn openai_server_error_is_upstream() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(500).body("internal");
        })
        .await;

    let client = OpenAiChat::new(&server.base_url(), "sk-test", 5).unwrap();
    let err = client.call_tool(&request()).await.unwrap_err();

    match err.downcast_ref::<CompanionError>() {
        Some(CompanionError::Upstream { provider, status, body }) => {
            assert_eq!(provider, "openai");
            assert_eq!(*status, 500);
            assert_eq!(body, "internal");
        }
        other => panic!("expected upstream error, got {other:?}"),
    }
}

#[tokio::test]
async fn anthropic_returns_tool_use_input() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/messages")
                .header("x-api-key", "ak-test")
                .header("anthropic-version", "2023-06-01")
                .json_body_partial(r#"{"system": "あなたは蓮です。", "tool_choice": {"type": "tool", "name": "analyze_response"}}"#);
            then.status(200).json_body(json!({
                "content": [
                    {"type": "text", "text": "考え中"},
                    {"type": "tool_use", "id": "tu_1", "name": "analyze_response",
                     "input": {"response": "おはよう", "emotion": "calm", "intimacyChange": 0}}
                ]
            }));
        })
        .await;

    let client = AnthropicChat::new(&server.base_url(), "ak-test", "2023-06-01", 5).unwrap();
    let args = client.call_tool(&request()).await.unwrap();

    assert_eq!(args["emotion"], "calm");
    mock.assert_async().await;
}

#[tokio::test]
async fn anthropic_without_tool_use_is_an_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/messages");
            then.status(200)
                .json_body(json!({"content": [{"type": "text", "text": "ただの文章"}]}));
        })
        .await;

    let client = AnthropicChat::new(&server.base_url(), "ak-test", "2023-06-01", 5).unwrap();
    assert!(client.call_tool(&request()).await.is_err());
}

#[tokio::test]
async fn rate_limits_are_retried_then_surface() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(429).body("too many requests");
        })
        .await;

    let client = OpenAiChat::new(&server.base_url(), "sk-test", 5).unwrap();
    let model = Retrying::with_policy(client, 3, Duration::from_millis(1));
    let err = model.call_tool(&request()).await.unwrap_err();

    assert!(is_rate_limited(&err));
    assert_eq!(model.provider(), "openai");
    mock.assert_hits_async(3).await;
}
